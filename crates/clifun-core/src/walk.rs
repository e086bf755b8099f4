// Depth-first walking over nested serde_json values.
// - `walk_items` yields every node (or only leaves) with depth, key, ancestors and path.
// - `objwalk` is the leaf-only shorthand returning (path, value) pairs.
// - `to_pointer` renders a walk path as an RFC 6901 JSON Pointer.
use serde_json::Value;
use std::fmt;

/// Key of a value inside its parent: a mapping key or a sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathKey<'a> {
    Key(&'a str),
    Index(usize),
}

impl PathKey<'_> {
    pub fn to_value(self) -> Value {
        match self {
            PathKey::Key(k) => Value::String(k.to_string()),
            PathKey::Index(i) => Value::from(i),
        }
    }
}

impl fmt::Display for PathKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Key(k) => f.write_str(k),
            PathKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// One entry of a walk's ancestor chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ancestor<'a> {
    Value(&'a Value),
    Key(PathKey<'a>),
}

#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Skip mappings and sequences themselves; their contents are still walked.
    pub values_only: bool,
    /// Collect the ancestor chain for each item.
    pub ancestors: bool,
    /// Count keys/indexes as ancestors (they are interleaved with the values).
    pub keys_as_ancestors: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            values_only: false,
            ancestors: true,
            keys_as_ancestors: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalkItem<'a> {
    pub depth: usize,
    pub key: Option<PathKey<'a>>,
    pub value: &'a Value,
    /// Root first, direct parent (or its key) last. Empty when ancestors are disabled.
    pub ancestors: Vec<Ancestor<'a>>,
    /// Keys from the root down to this value.
    pub path: Vec<PathKey<'a>>,
}

impl WalkItem<'_> {
    pub fn pointer(&self) -> String {
        to_pointer(&self.path)
    }
}

/// Iterator returned by [`walk_items`].
pub struct WalkItems<'a> {
    stack: Vec<WalkItem<'a>>,
    opts: WalkOptions,
}

/// Walks `value` depth-first (pre-order), visiting every node exactly once.
pub fn walk_items(value: &Value, opts: WalkOptions) -> WalkItems<'_> {
    WalkItems {
        stack: vec![WalkItem {
            depth: 0,
            key: None,
            value,
            ancestors: Vec::new(),
            path: Vec::new(),
        }],
        opts,
    }
}

impl<'a> WalkItems<'a> {
    fn push_child(&mut self, parent: &WalkItem<'a>, key: PathKey<'a>, value: &'a Value) {
        let step = if self.opts.keys_as_ancestors { 2 } else { 1 };
        let mut ancestors = Vec::new();
        if self.opts.ancestors {
            ancestors.reserve(parent.ancestors.len() + 2);
            ancestors.extend_from_slice(&parent.ancestors);
            ancestors.push(Ancestor::Value(parent.value));
            if self.opts.keys_as_ancestors {
                ancestors.push(Ancestor::Key(key));
            }
        }
        let mut path = Vec::with_capacity(parent.path.len() + 1);
        path.extend_from_slice(&parent.path);
        path.push(key);
        self.stack.push(WalkItem {
            depth: parent.depth + step,
            key: Some(key),
            value,
            ancestors,
            path,
        });
    }
}

impl<'a> Iterator for WalkItems<'a> {
    type Item = WalkItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = self.stack.pop()?;
            // children are pushed in reverse so the first one is popped next
            match item.value {
                Value::Object(map) => {
                    for (k, v) in map.iter().rev() {
                        self.push_child(&item, PathKey::Key(k.as_str()), v);
                    }
                }
                Value::Array(arr) => {
                    for (i, v) in arr.iter().enumerate().rev() {
                        self.push_child(&item, PathKey::Index(i), v);
                    }
                }
                _ => return Some(item),
            }
            if !self.opts.values_only {
                return Some(item);
            }
        }
    }
}

/// Every non-collection value with the path leading to it.
pub fn objwalk(value: &Value) -> impl Iterator<Item = (Vec<PathKey<'_>>, &Value)> {
    let opts = WalkOptions {
        values_only: true,
        ancestors: false,
        keys_as_ancestors: false,
    };
    walk_items(value, opts).map(|item| (item.path, item.value))
}

pub fn to_pointer(path: &[PathKey<'_>]) -> String {
    let mut out = String::new();
    for key in path {
        out.push('/');
        match key {
            PathKey::Key(k) => out.push_str(&k.replace('~', "~0").replace('/', "~1")),
            PathKey::Index(i) => out.push_str(&i.to_string()),
        }
    }
    out
}

pub fn join_path(path: &[PathKey<'_>], separator: &str) -> String {
    path.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}
