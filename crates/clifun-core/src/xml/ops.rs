use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use super::Element;
use super::path::ElementPath;
use crate::error::Result;

/// Selection used when no path is given: every element, root included.
pub const ALL_ELEMENTS: &str = "//*";

/// No children, no attributes and no text.
pub fn is_empty_element(el: &Element) -> bool {
    el.children.is_empty() && el.attributes.is_empty() && el.text.as_deref().is_none_or(str::is_empty)
}

pub fn is_parent_element(el: &Element) -> bool {
    !el.children.is_empty()
}

fn compile(xpath: Option<&str>) -> Result<ElementPath> {
    ElementPath::parse(xpath.filter(|s| !s.trim().is_empty()).unwrap_or(ALL_ELEMENTS))
}

pub fn get_elements<'a>(root: &'a Element, xpath: Option<&str>) -> Result<Vec<&'a Element>> {
    Ok(compile(xpath)?.find_all(root))
}

pub fn count_elements(root: &Element, xpath: Option<&str>) -> Result<usize> {
    Ok(compile(xpath)?.select(root).len())
}

/// Detaches every selected element from its parent and returns how many were
/// removed. The root element itself is never removed.
pub fn remove_elements(root: &mut Element, xpath: &str) -> Result<usize> {
    let path = ElementPath::parse(xpath)?;
    let mut selected = path.select(root);
    // deepest/last first, so the remaining index paths stay valid
    selected.sort_unstable_by(|a, b| b.cmp(a));
    let mut count = 0;
    for p in selected {
        let Some((&last, parent_path)) = p.split_last() else {
            continue;
        };
        if let Some(parent) = resolve_mut(root, parent_path)
            && last < parent.children.len()
        {
            let removed = parent.children.remove(last);
            tracing::debug!(tag = %removed.tag, "removed element");
            count += 1;
        }
    }
    Ok(count)
}

fn resolve_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    path.iter()
        .try_fold(root, |el, &i| el.children.get_mut(i))
}

fn for_each_mut(el: &mut Element, f: &mut impl FnMut(&mut Element)) {
    f(el);
    for child in &mut el.children {
        for_each_mut(child, f);
    }
}

/// Removes the named attribute (a leading `@` is ignored) from every element.
pub fn remove_attributes_with_name(root: &mut Element, name: &str) -> usize {
    let name = name.strip_prefix('@').unwrap_or(name);
    let mut count = 0;
    for_each_mut(root, &mut |el| {
        let before = el.attributes.len();
        el.attributes.retain(|(k, _)| k != name);
        count += before - el.attributes.len();
    });
    count
}

/// Removes every attribute whose value equals `value`, on every element.
pub fn remove_attributes_with_value(root: &mut Element, value: &str) -> usize {
    let mut count = 0;
    for_each_mut(root, &mut |el| {
        let before = el.attributes.len();
        el.attributes.retain(|(_, v)| v != value);
        count += before - el.attributes.len();
    });
    count
}

pub fn remove_attributes_with_empty_value(root: &mut Element) -> usize {
    remove_attributes_with_value(root, "")
}

fn summarize<'a>(elements: impl Iterator<Item = &'a Element>) -> Option<Value> {
    let mut count = 0usize;
    let mut tags = BTreeSet::new();
    let mut attributes = BTreeSet::new();
    for el in elements {
        count += 1;
        tags.insert(el.tag.as_str());
        attributes.extend(el.attributes.iter().map(|(k, _)| format!("@{}", k)));
    }
    (count > 0).then(|| json!({"count": count, "tags": tags, "attributes": attributes}))
}

/// Describes an element: its tag, text and attributes under `content`, and
/// counts of its direct children and all descendants under `metrics`.
pub fn element_info(el: &Element) -> Value {
    let mut content = Map::new();
    content.insert("tag".into(), Value::String(el.tag.clone()));
    if let Some(text) = el.text.as_deref()
        && !text.is_empty()
    {
        content.insert("#text".into(), Value::String(text.to_string()));
    }
    if !el.attributes.is_empty() {
        let attrs: Map<String, Value> = el
            .attributes
            .iter()
            .map(|(k, v)| (format!("@{}", k), Value::String(v.clone())))
            .collect();
        content.insert("attributes".into(), Value::Object(attrs));
    }

    let mut metrics = Map::new();
    if let Some(children) = summarize(el.children.iter()) {
        metrics.insert("children".into(), children);
    }
    if let Some(descendants) = summarize(el.descendants()) {
        metrics.insert("descendants".into(), descendants);
    }
    json!({"content": content, "metrics": metrics})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{parse, to_xml_string};

    #[test]
    fn info_of_leaf_and_parent() {
        let leaf = parse("<abc/>").unwrap();
        assert_eq!(
            element_info(&leaf),
            json!({"content": {"tag": "abc"}, "metrics": {}})
        );
        let tree = parse("<a>\t<b><c/> </b></a>").unwrap();
        assert_eq!(
            element_info(&tree),
            json!({
                "content": {"#text": "\t", "tag": "a"},
                "metrics": {
                    "children": {"attributes": [], "count": 1, "tags": ["b"]},
                    "descendants": {"attributes": [], "count": 2, "tags": ["b", "c"]}
                }
            })
        );
    }

    #[test]
    fn info_lists_attributes() {
        let el = parse(r#"<a x="1"><b y="2"/><b z=""/></a>"#).unwrap();
        let info = element_info(&el);
        assert_eq!(info["content"]["attributes"], json!({"@x": "1"}));
        assert_eq!(info["metrics"]["children"]["attributes"], json!(["@y", "@z"]));
        assert_eq!(info["metrics"]["children"]["tags"], json!(["b"]));
    }

    #[test]
    fn element_predicates() {
        let root = parse(r#"<r><e/><t>x</t><a k="v"/></r>"#).unwrap();
        assert!(is_parent_element(&root));
        assert!(is_empty_element(&root.children[0]));
        assert!(!is_empty_element(&root.children[1]));
        assert!(!is_empty_element(&root.children[2]));
    }

    #[test]
    fn count_and_get() {
        let root = parse("<r><a/><b><a/></b></r>").unwrap();
        assert_eq!(count_elements(&root, None).unwrap(), 4);
        assert_eq!(count_elements(&root, Some("//a")).unwrap(), 2);
        assert_eq!(count_elements(&root, Some("b")).unwrap(), 1);
        let got = get_elements(&root, Some(".//a")).unwrap();
        assert_eq!(got.len(), 2);
        assert!(count_elements(&root, Some("a[")).is_err());
    }

    #[test]
    fn remove_nested_selection() {
        let mut root = parse("<r><a><a/></a><b/><a/></r>").unwrap();
        assert_eq!(remove_elements(&mut root, "//a").unwrap(), 3);
        assert_eq!(to_xml_string(&root), "<r><b/></r>");
        assert_eq!(remove_elements(&mut root, "//r").unwrap(), 0);
    }

    #[test]
    fn remove_attributes() {
        let mut root = parse(r#"<r id="1"><a id="2" k=""/><b k="x" j=""/></r>"#).unwrap();
        assert_eq!(remove_attributes_with_name(&mut root, "@id"), 2);
        assert_eq!(to_xml_string(&root), r#"<r><a k=""/><b k="x" j=""/></r>"#);
        assert_eq!(remove_attributes_with_empty_value(&mut root), 2);
        assert_eq!(to_xml_string(&root), r#"<r><a/><b k="x"/></r>"#);
        assert_eq!(remove_attributes_with_value(&mut root, "x"), 1);
        assert_eq!(to_xml_string(&root), "<r><a/><b/></r>");
    }
}
