//! ElementPath expressions: the abbreviated XPath subset ElementTree supports.
//!
//! Supported: `tag`, `*`, `.`, `/` and `//` steps, and the predicates `[@attr]`,
//! `[@attr='v']`, `[@*='v']`, `[tag]`, `[tag='text']`, `[n]` and `[last()]`.
//! Selections are returned as child-index paths from the root element.

use super::Element;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    /// Reached through `//`: any depth below the context node.
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Any,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttr(String),
    AttrEq(String, String),
    AnyAttrEq(String),
    HasChild(String),
    ChildText(String, String),
    Position(usize),
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath {
    expr: String,
    absolute: bool,
    steps: Vec<Step>,
}

/// Context of a step: above the root element, or at an element.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Ctx {
    Document,
    Node(Vec<usize>),
}

fn err(expr: &str, reason: impl Into<String>) -> Error {
    Error::XPath {
        expr: expr.to_string(),
        reason: reason.into(),
    }
}

/// Splits on `/` outside of brackets and quotes.
fn split_segments(expr: &str) -> Result<Vec<&str>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in expr.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| err(expr, "unbalanced ']'"))?;
            }
            (None, '/') if depth == 0 => {
                out.push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(err(expr, "unterminated string"));
    }
    if depth != 0 {
        return Err(err(expr, "unbalanced '['"));
    }
    out.push(&expr[start..]);
    Ok(out)
}

fn unquote<'a>(expr: &str, s: &'a str) -> Result<&'a str> {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'\'' || bytes[0] == b'"') && bytes[bytes.len() - 1] == bytes[0] {
        Ok(&s[1..s.len() - 1])
    } else {
        Err(err(expr, format!("expected a quoted string, got {}", s)))
    }
}

fn check_name<'a>(expr: &str, name: &'a str) -> Result<&'a str> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));
    if valid {
        Ok(name)
    } else {
        Err(err(expr, format!("invalid name: {:?}", name)))
    }
}

fn parse_predicate(expr: &str, body: &str) -> Result<Predicate> {
    let body = body.trim();
    if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
        let n: usize = body
            .parse()
            .map_err(|_| err(expr, format!("bad position: {}", body)))?;
        if n == 0 {
            return Err(err(expr, "positions start at 1"));
        }
        return Ok(Predicate::Position(n));
    }
    if body == "last()" {
        return Ok(Predicate::Last);
    }
    if let Some(attr) = body.strip_prefix('@') {
        return match attr.split_once('=') {
            Some((name, value)) if name.trim() == "*" => {
                Ok(Predicate::AnyAttrEq(unquote(expr, value)?.to_string()))
            }
            Some((name, value)) => Ok(Predicate::AttrEq(
                check_name(expr, name)?.to_string(),
                unquote(expr, value)?.to_string(),
            )),
            None => Ok(Predicate::HasAttr(check_name(expr, attr)?.to_string())),
        };
    }
    match body.split_once('=') {
        Some((tag, value)) => Ok(Predicate::ChildText(
            check_name(expr, tag)?.to_string(),
            unquote(expr, value)?.to_string(),
        )),
        None => Ok(Predicate::HasChild(check_name(expr, body)?.to_string())),
    }
}

fn parse_step(expr: &str, segment: &str, axis: Axis) -> Result<Step> {
    let (head, mut rest) = match segment.find('[') {
        Some(i) => (&segment[..i], &segment[i..]),
        None => (segment, ""),
    };
    let test = match head.trim() {
        "*" => NodeTest::Any,
        "." => NodeTest::SelfNode,
        ".." => return Err(err(expr, "parent steps are not supported")),
        name => NodeTest::Name(check_name(expr, name)?.to_string()),
    };
    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .ok_or_else(|| err(expr, format!("unexpected text: {}", rest)))?;
        let close = closing_bracket(inner).ok_or_else(|| err(expr, "unbalanced '['"))?;
        predicates.push(parse_predicate(expr, &inner[..close])?);
        rest = inner[close + 1..].trim_start();
    }
    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in s.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

impl ElementPath {
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(err(expr, "empty path"));
        }
        let mut absolute = false;
        let mut descendant = false;
        let mut steps = Vec::new();
        for (i, seg) in split_segments(trimmed)?.into_iter().enumerate() {
            if seg.trim().is_empty() {
                if i == 0 {
                    absolute = true;
                } else if descendant {
                    return Err(err(expr, "empty step"));
                } else {
                    descendant = true;
                }
                continue;
            }
            let axis = if descendant { Axis::Descendant } else { Axis::Child };
            descendant = false;
            steps.push(parse_step(expr, seg, axis)?);
        }
        if descendant || steps.is_empty() {
            return Err(err(expr, "path ends without a step"));
        }
        Ok(Self {
            expr: trimmed.to_string(),
            absolute,
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    /// Paths of the selected elements, in document order and without duplicates.
    /// A relative path is evaluated with the root element as context.
    pub fn select(&self, root: &Element) -> Vec<Vec<usize>> {
        let mut ctxs = vec![if self.absolute {
            Ctx::Document
        } else {
            Ctx::Node(Vec::new())
        }];
        for step in &self.steps {
            let mut next: Vec<Vec<usize>> = Vec::new();
            for ctx in &ctxs {
                for parent in step_parents(root, ctx, step.axis) {
                    let group = match &step.test {
                        NodeTest::SelfNode => match parent {
                            Ctx::Node(p) => vec![p],
                            Ctx::Document => Vec::new(),
                        },
                        test => children(root, &parent)
                            .into_iter()
                            .filter(|p| {
                                resolve(root, p).is_some_and(|el| match test {
                                    NodeTest::Name(name) => &el.tag == name,
                                    _ => true,
                                })
                            })
                            .collect(),
                    };
                    next.extend(apply_predicates(root, group, &step.predicates));
                }
            }
            next.sort();
            next.dedup();
            ctxs = next.into_iter().map(Ctx::Node).collect();
        }
        ctxs.into_iter()
            .filter_map(|c| match c {
                Ctx::Node(p) => Some(p),
                Ctx::Document => None,
            })
            .collect()
    }

    pub fn find_all<'a>(&self, root: &'a Element) -> Vec<&'a Element> {
        self.select(root)
            .iter()
            .filter_map(|p| resolve(root, p))
            .collect()
    }
}

/// Element at `path` (child indexes from `root`).
pub fn resolve<'a>(root: &'a Element, path: &[usize]) -> Option<&'a Element> {
    path.iter().try_fold(root, |el, &i| el.children.get(i))
}

fn children(root: &Element, ctx: &Ctx) -> Vec<Vec<usize>> {
    match ctx {
        Ctx::Document => vec![Vec::new()],
        Ctx::Node(p) => {
            let n = resolve(root, p).map_or(0, |el| el.children.len());
            (0..n)
                .map(|i| {
                    let mut c = p.clone();
                    c.push(i);
                    c
                })
                .collect()
        }
    }
}

/// Nodes whose children a step tests: the context itself, plus every
/// element below it for `//`.
fn step_parents(root: &Element, ctx: &Ctx, axis: Axis) -> Vec<Ctx> {
    let mut out = vec![ctx.clone()];
    if axis == Axis::Descendant {
        let mut stack = children(root, ctx);
        stack.reverse();
        while let Some(p) = stack.pop() {
            let mut kids = children(root, &Ctx::Node(p.clone()));
            kids.reverse();
            stack.extend(kids);
            out.push(Ctx::Node(p));
        }
    }
    out
}

fn apply_predicates(root: &Element, mut group: Vec<Vec<usize>>, predicates: &[Predicate]) -> Vec<Vec<usize>> {
    for pred in predicates {
        group = match pred {
            Predicate::Position(n) => group.into_iter().nth(n - 1).into_iter().collect(),
            Predicate::Last => group.pop().into_iter().collect(),
            _ => group
                .into_iter()
                .filter(|p| resolve(root, p).is_some_and(|el| matches(el, pred)))
                .collect(),
        };
    }
    group
}

fn matches(el: &Element, pred: &Predicate) -> bool {
    match pred {
        Predicate::HasAttr(name) => el.attr(name).is_some(),
        Predicate::AttrEq(name, value) => el.attr(name) == Some(value.as_str()),
        Predicate::AnyAttrEq(value) => el.attributes.iter().any(|(_, v)| v == value),
        Predicate::HasChild(tag) => el.find(tag).is_some(),
        Predicate::ChildText(tag, text) => el
            .children
            .iter()
            .any(|c| &c.tag == tag && c.text.as_deref().unwrap_or("") == text),
        Predicate::Position(_) | Predicate::Last => true,
    }
}
