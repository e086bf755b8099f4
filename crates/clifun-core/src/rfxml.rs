//! Extraction of keywords, tests and metrics from Robot Framework `output.xml`.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::xml::{Element, element_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PASS" => Ok(Status::Pass),
            "FAIL" => Ok(Status::Fail),
            other => Err(Error::InvalidArgument(format!(
                "status must be PASS or FAIL, got {}",
                other
            ))),
        }
    }
}

/// Which optional sections [`node_to_dict`] includes.
#[derive(Debug, Clone, Copy)]
pub struct NodeOptions {
    pub show_args: bool,
    pub show_msgs: bool,
    pub show_tags: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            show_args: false,
            show_msgs: false,
            show_tags: true,
        }
    }
}

/// Status filter followed by a slice with Python semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    pub status: Option<Status>,
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

/// Counts of suites, tests and log messages anywhere in the document.
pub fn robot_metrics(root: &Element) -> Value {
    json!({
        "suites": root.iter_tag("suite").count(),
        "tests": root.iter_tag("test").count(),
        "messages": root.iter_tag("msg").count(),
    })
}

/// Robot metrics alongside the generic element description of the root.
pub fn info(root: &Element) -> Value {
    json!({"xml": element_info(root), "robot": robot_metrics(root)})
}

fn text_of(el: &Element) -> Value {
    el.text.clone().map_or(Value::Null, Value::String)
}

fn texts<'a>(elements: impl Iterator<Item = &'a Element>) -> Value {
    Value::Array(elements.map(text_of).collect())
}

/// Summarizes a `kw`, `test` or `suite` element.
pub fn node_to_dict(el: &Element, opts: NodeOptions) -> Value {
    let mut d = Map::new();
    for (k, v) in &el.attributes {
        d.insert(format!("@{}", k), Value::String(v.clone()));
    }

    if let Some(status) = el.find("status") {
        let attrs: Map<String, Value> = status
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        d.insert("status".into(), Value::Object(attrs));
    }

    if let Some(doc) = el.find("doc") {
        d.insert("doc".into(), text_of(doc));
    }

    if opts.show_tags {
        let tags = el
            .find("tags")
            .map_or(Value::Null, |tags| texts(tags.iter_tag("tag")));
        d.insert("tags".into(), tags);
    }

    if opts.show_args {
        // RF 3 wraps arguments in <arguments>; RF 4+ puts <arg> directly under the keyword
        let args = match el.find("arguments") {
            Some(arguments) => texts(arguments.iter_tag("arg")),
            None if el.find("arg").is_some() => {
                texts(el.children.iter().filter(|c| c.tag == "arg"))
            }
            None => Value::Null,
        };
        d.insert("args".into(), args);
    }

    if opts.show_msgs {
        d.insert("messages".into(), texts(el.iter_tag("msg")));
    }

    Value::Object(d)
}

fn status_of(node: &Value) -> Option<&str> {
    node.get("status")?.get("status")?.as_str()
}

fn extract(root: &Element, tag: &str, opts: NodeOptions, selection: Selection) -> Result<Vec<Value>> {
    let nodes: Vec<Value> = root
        .iter_tag(tag)
        .map(|el| node_to_dict(el, opts))
        .filter(|node| match selection.status {
            Some(wanted) => status_of(node) == Some(wanted.as_str()),
            None => true,
        })
        .collect();
    tracing::debug!(tag, matched = nodes.len(), "extracted robot nodes");
    py_slice(nodes, selection.start, selection.stop, selection.step)
}

/// Every `kw` element, in document order.
pub fn keywords(root: &Element, opts: NodeOptions, selection: Selection) -> Result<Vec<Value>> {
    extract(root, "kw", opts, selection)
}

/// Every `test` element, in document order.
pub fn tests(root: &Element, opts: NodeOptions, selection: Selection) -> Result<Vec<Value>> {
    extract(root, "test", opts, selection)
}

/// `items[start:stop:step]` as Python evaluates it.
pub fn py_slice<T>(items: Vec<T>, start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Result<Vec<T>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Error::InvalidArgument("slice step cannot be zero".into()));
    }
    let len = items.len() as i64;
    let norm = |x: i64| if x < 0 { x + len } else { x };
    let indexes: Vec<i64> = if step > 0 {
        let lo = start.map_or(0, |x| norm(x).clamp(0, len));
        let hi = stop.map_or(len, |x| norm(x).clamp(0, len));
        (lo..hi).step_by(step as usize).collect()
    } else {
        let hi = start.map_or(len - 1, |x| norm(x).clamp(-1, len - 1));
        let lo = stop.map_or(-1, |x| norm(x).clamp(-1, len - 1));
        let mut out = Vec::new();
        let mut i = hi;
        while i > lo {
            out.push(i);
            i += step;
        }
        out
    };
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    Ok(indexes
        .into_iter()
        .filter_map(|i| slots.get_mut(i as usize).and_then(Option::take))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    const OUTPUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<robot generator="Robot 3.0">
<suite id="s1" name="Demo" source="/tmp/demo.robot">
<test id="s1-t1" name="Passing">
<kw name="Log" library="BuiltIn">
<doc>Logs the given message.</doc>
<arguments>
<arg>hello</arg>
</arguments>
<msg timestamp="20170101 00:00:00.000" level="INFO">hello</msg>
<status status="PASS" starttime="a" endtime="b"></status>
</kw>
<tags>
<tag>smoke</tag>
<tag>fast</tag>
</tags>
<status status="PASS" critical="yes" starttime="a" endtime="b"></status>
</test>
<test id="s1-t2" name="Failing">
<kw name="Fail" library="BuiltIn">
<arg>boom</arg>
<status status="FAIL" starttime="a" endtime="b"></status>
</kw>
<status status="FAIL" critical="yes" starttime="a" endtime="b">boom</status>
</test>
<status status="FAIL" starttime="a" endtime="b"></status>
</suite>
</robot>
"#;

    #[test]
    fn metrics_count_documents_nodes() {
        let root = parse(OUTPUT).unwrap();
        assert_eq!(
            robot_metrics(&root),
            json!({"suites": 1, "tests": 2, "messages": 1})
        );
        let info = info(&root);
        assert_eq!(info["xml"]["content"]["tag"], json!("robot"));
        assert_eq!(info["robot"]["tests"], json!(2));
    }

    #[test]
    fn test_nodes_with_tags_and_status() {
        let root = parse(OUTPUT).unwrap();
        let all = tests(&root, NodeOptions::default(), Selection::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["@name"], json!("Passing"));
        assert_eq!(all[0]["tags"], json!(["smoke", "fast"]));
        assert_eq!(all[0]["status"]["critical"], json!("yes"));
        assert_eq!(all[1]["tags"], Value::Null);
        assert!(all[0].get("args").is_none());

        let failed = Selection {
            status: Some(Status::Fail),
            ..Default::default()
        };
        let got = tests(&root, NodeOptions::default(), failed).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0]["@id"], json!("s1-t2"));
    }

    #[test]
    fn keyword_args_and_messages() {
        let root = parse(OUTPUT).unwrap();
        let opts = NodeOptions {
            show_args: true,
            show_msgs: true,
            show_tags: false,
        };
        let kws = keywords(&root, opts, Selection::default()).unwrap();
        assert_eq!(kws[0]["doc"], json!("Logs the given message."));
        assert_eq!(kws[0]["args"], json!(["hello"]));
        assert_eq!(kws[0]["messages"], json!(["hello"]));
        assert_eq!(kws[1]["args"], json!(["boom"]));
        assert_eq!(kws[1]["messages"], json!([]));
        assert!(kws[1].get("tags").is_none());
    }

    #[test]
    fn python_slices() {
        let v: Vec<i32> = (0..6).collect();
        let s = |a, b, c| py_slice(v.clone(), a, b, c).unwrap();
        assert_eq!(s(None, None, None), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(s(Some(1), Some(4), None), vec![1, 2, 3]);
        assert_eq!(s(Some(-2), None, None), vec![4, 5]);
        assert_eq!(s(None, None, Some(2)), vec![0, 2, 4]);
        assert_eq!(s(None, None, Some(-1)), vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(s(Some(4), Some(1), Some(-2)), vec![4, 2]);
        assert_eq!(s(Some(10), Some(20), None), Vec::<i32>::new());
        assert_eq!(s(Some(-100), Some(2), None), vec![0, 1]);
        assert!(py_slice(v.clone(), None, None, Some(0)).is_err());
    }

    #[test]
    fn status_parsing() {
        assert_eq!("PASS".parse::<Status>().unwrap(), Status::Pass);
        assert!("pass".parse::<Status>().is_err());
    }
}
