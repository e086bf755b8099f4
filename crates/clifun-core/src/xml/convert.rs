use serde_json::{Map, Value};

use super::Element;

/// Switches for [`xml_to_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlToJsonOptions {
    /// Drop attributes entirely.
    pub strip_attribute: bool,
    /// Drop `prefix:` parts of names and `xmlns` declarations.
    pub strip_namespace: bool,
    /// Trim text and tails, discarding whitespace-only character data.
    pub strip_whitespace: bool,
}

impl Default for XmlToJsonOptions {
    fn default() -> Self {
        Self {
            strip_attribute: false,
            strip_namespace: false,
            strip_whitespace: true,
        }
    }
}

/// The part of a qualified name after its `prefix:`.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn is_namespace_decl(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// Converts an element tree to the conventional JSON shape:
/// attributes become `@name` keys, repeated child tags collapse into arrays,
/// and character data lands in `#text` / `#tail` (or is the whole value for
/// a bare leaf). The result is a single-key object `{root_tag: ...}`.
pub fn xml_to_json(root: &Element, opts: XmlToJsonOptions) -> Value {
    let (tag, value) = convert(root, opts);
    let mut out = Map::new();
    out.insert(tag, value);
    Value::Object(out)
}

fn convert(el: &Element, opts: XmlToJsonOptions) -> (String, Value) {
    let mut d = Map::new();
    if !opts.strip_attribute {
        for (k, v) in &el.attributes {
            let name = if opts.strip_namespace {
                if is_namespace_decl(k) {
                    continue;
                }
                local_name(k)
            } else {
                k
            };
            d.insert(format!("@{}", name), Value::String(v.clone()));
        }
    }

    for child in &el.children {
        let (tag, value) = convert(child, opts);
        match d.get_mut(&tag) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                d.insert(tag, value);
            }
        }
    }

    let clean = |s: &Option<String>| -> String {
        let s = s.as_deref().unwrap_or("");
        let s = if opts.strip_whitespace { s.trim() } else { s };
        s.to_string()
    };
    let text = clean(&el.text);
    let tail = clean(&el.tail);

    if !tail.is_empty() {
        d.insert("#tail".into(), Value::String(tail));
    }

    let value = if !d.is_empty() {
        if !text.is_empty() {
            d.insert("#text".into(), Value::String(text));
        }
        Value::Object(d)
    } else if text.is_empty() {
        Value::Null
    } else {
        Value::String(text)
    };

    let tag = if opts.strip_namespace {
        local_name(&el.tag)
    } else {
        &el.tag
    };
    (tag.to_string(), value)
}
