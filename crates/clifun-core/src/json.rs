use std::fmt;
use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::pattern::Matcher;
use crate::walk::{WalkOptions, walk_items};

/// True when `text` holds one well-formed JSON document.
pub fn contains_valid_json(text: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok()
}

pub fn parse(text: &str) -> Result<Value> {
    let v = serde_json::from_str::<Value>(text)?;
    tracing::debug!(kind = %kind_of(&v), "parsed JSON document");
    Ok(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Object,
    Array,
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "bool",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Object => "object",
            JsonKind::Array => "array",
        })
    }
}

pub fn kind_of(v: &Value) -> JsonKind {
    match v {
        Value::Null => JsonKind::Null,
        Value::Bool(_) => JsonKind::Bool,
        Value::Number(_) => JsonKind::Number,
        Value::String(_) => JsonKind::String,
        Value::Object(_) => JsonKind::Object,
        Value::Array(_) => JsonKind::Array,
    }
}

fn length_of(v: &Value) -> Option<usize> {
    match v {
        Value::Array(a) => Some(a.len()),
        Value::Object(m) => Some(m.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ChildInfo {
    pub key_or_index: String,
    pub kind: JsonKind,
    pub len: Option<usize>,
}

pub fn list_children(value: &Value) -> Vec<ChildInfo> {
    let child = |k: String, v: &Value| ChildInfo {
        key_or_index: k,
        kind: kind_of(v),
        len: match v {
            Value::Array(_) | Value::Object(_) => length_of(v),
            _ => None,
        },
    };
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| child(k.clone(), v)).collect(),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| child(i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Summary of a document: its type, length and (for objects) top-level keys.
pub fn info(value: &Value, verbose: bool) -> Value {
    let mut d = Map::new();
    d.insert("type".into(), json!(kind_of(value).to_string()));
    if let Some(n) = length_of(value) {
        d.insert("length".into(), json!(n));
    }
    if let Value::Object(map) = value {
        d.insert("keys".into(), json!(map.keys().collect::<Vec<_>>()));
    }
    if verbose {
        let children: Vec<Value> = list_children(value)
            .into_iter()
            .map(|c| json!({"key": c.key_or_index, "type": c.kind.to_string(), "length": c.len}))
            .collect();
        d.insert("children".into(), Value::Array(children));
    }
    Value::Object(d)
}

// -------- Python-style formatting --------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStyle {
    /// No whitespace at all.
    Compact,
    /// Two-space indentation.
    Pretty,
    /// One value per line, no indentation.
    Flat,
}

#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub indent: Option<usize>,
    pub item_separator: Option<String>,
    pub key_separator: Option<String>,
    pub sort_keys: bool,
    pub ensure_ascii: bool,
}

impl FormatOptions {
    /// Presets override indentation and separators.
    pub fn with_style(mut self, style: FormatStyle) -> Self {
        match style {
            FormatStyle::Compact => {
                self.indent = None;
                self.item_separator = Some(",".into());
                self.key_separator = Some(":".into());
            }
            FormatStyle::Pretty => {
                self.indent = Some(2);
                self.item_separator = None;
                self.key_separator = None;
            }
            FormatStyle::Flat => {
                self.indent = Some(0);
                self.item_separator = Some(",".into());
                self.key_separator = Some(": ".into());
            }
        }
        self
    }

    pub fn indented(indent: usize) -> Self {
        Self {
            indent: Some(indent),
            ..Self::default()
        }
    }

    fn separators(&self) -> (&str, &str) {
        let item = match (&self.item_separator, self.indent) {
            (Some(s), _) => s.as_str(),
            (None, Some(_)) => ",",
            (None, None) => ", ",
        };
        let key = self.key_separator.as_deref().unwrap_or(": ");
        (item, key)
    }
}

struct PyFormatter {
    indent: Option<Vec<u8>>,
    item_sep: Vec<u8>,
    key_sep: Vec<u8>,
    level: usize,
    has_value: bool,
    ensure_ascii: bool,
}

impl PyFormatter {
    fn new(opts: &FormatOptions) -> Self {
        let (item, key) = opts.separators();
        Self {
            indent: opts.indent.map(|n| vec![b' '; n]),
            item_sep: item.as_bytes().to_vec(),
            key_sep: key.as_bytes().to_vec(),
            level: 0,
            has_value: false,
            ensure_ascii: opts.ensure_ascii,
        }
    }

    fn newline<W: ?Sized + io::Write>(&self, w: &mut W) -> io::Result<()> {
        if let Some(ind) = &self.indent {
            w.write_all(b"\n")?;
            for _ in 0..self.level {
                w.write_all(ind)?;
            }
        }
        Ok(())
    }

    fn open<W: ?Sized + io::Write>(&mut self, w: &mut W, token: &[u8]) -> io::Result<()> {
        self.level += 1;
        self.has_value = false;
        w.write_all(token)
    }

    fn close<W: ?Sized + io::Write>(&mut self, w: &mut W, token: &[u8]) -> io::Result<()> {
        self.level -= 1;
        if self.has_value {
            self.newline(w)?;
        }
        w.write_all(token)
    }

    fn item<W: ?Sized + io::Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        if !first {
            w.write_all(&self.item_sep)?;
        }
        self.newline(w)
    }
}

impl Formatter for PyFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.open(w, b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.close(w, b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        self.item(w, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _w: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.open(w, b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.close(w, b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, w: &mut W, first: bool) -> io::Result<()> {
        self.item(w, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.key_sep)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _w: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, w: &mut W, fragment: &str) -> io::Result<()> {
        if !self.ensure_ascii || fragment.is_ascii() {
            return w.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                w.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(w, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Recursively orders object keys.
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Serializes `value` the way Python's `json.dumps` lays out its output.
pub fn to_string_with(value: &Value, opts: &FormatOptions) -> Result<String> {
    let sorted;
    let value = if opts.sort_keys {
        sorted = sort_keys(value);
        &sorted
    } else {
        value
    };
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PyFormatter::new(opts));
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|_| Error::NonUtf8)
}

// -------- Searching --------

#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub key: Option<Matcher>,
    pub value: Option<Matcher>,
    pub values_only: bool,
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Walks `value` and reports every node matching the query as
/// `{pointer, depth, key, value}`.
pub fn find(value: &Value, query: &FindQuery) -> Vec<Value> {
    let opts = WalkOptions {
        values_only: query.values_only,
        ancestors: false,
        keys_as_ancestors: false,
    };
    walk_items(value, opts)
        .filter(|item| match &query.key {
            Some(m) => item.key.is_some_and(|k| m.is_match(&k.to_string())),
            None => true,
        })
        .filter(|item| match &query.value {
            Some(m) => scalar_text(item.value).is_some_and(|s| m.is_match(&s)),
            None => true,
        })
        .map(|item| {
            json!({
                "pointer": item.pointer(),
                "depth": item.depth,
                "key": item.key.map(|k| k.to_value()),
                "value": item.value,
            })
        })
        .collect()
}
