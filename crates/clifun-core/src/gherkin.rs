//! Gherkin `.feature` parsing into a JSON document tree, plus summary metrics.
//!
//! Every node of the tree has a `type` (`Feature`, `Background`, `Rule`,
//! `Scenario`, `ScenarioOutline`, `Examples`, `Step`, `DataTable`,
//! `DocString`), a `location` and, where the source has one, a `keyword`.
//! Feature and rule children are kept in source order.

use std::collections::BTreeMap;

use gherkin::{Background, Examples, Feature, GherkinEnv, LineCol, Rule, Scenario, Step, Table};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::walk::{Ancestor, PathKey, WalkOptions, walk_items};

fn location(pos: &LineCol) -> Value {
    json!({"line": pos.line, "column": pos.col})
}

fn table_node(table: &Table) -> Value {
    json!({
        "type": "DataTable",
        "location": location(&table.position),
        "rows": table.rows,
    })
}

fn step_node(step: &Step) -> Value {
    let mut node = Map::new();
    node.insert("type".into(), json!("Step"));
    node.insert("location".into(), location(&step.position));
    node.insert("keyword".into(), json!(step.keyword));
    node.insert("stepType".into(), json!(format!("{:?}", step.ty)));
    node.insert("text".into(), json!(step.value));
    if let Some(doc) = &step.docstring {
        node.insert("argument".into(), json!({"type": "DocString", "content": doc}));
    } else if let Some(table) = &step.table {
        node.insert("argument".into(), table_node(table));
    }
    Value::Object(node)
}

fn steps(steps: &[Step]) -> Value {
    Value::Array(steps.iter().map(step_node).collect())
}

fn background_node(bg: &Background) -> Value {
    json!({
        "type": "Background",
        "location": location(&bg.position),
        "keyword": bg.keyword,
        "steps": steps(&bg.steps),
    })
}

fn examples_node(ex: &Examples) -> Value {
    json!({
        "type": "Examples",
        "location": location(&ex.position),
        "keyword": ex.keyword,
        "name": ex.name,
        "tags": ex.tags,
        "table": ex.table.as_ref().map(table_node),
    })
}

fn scenario_node(sc: &Scenario) -> Value {
    let mut node = Map::new();
    let ty = if sc.examples.is_empty() {
        "Scenario"
    } else {
        "ScenarioOutline"
    };
    node.insert("type".into(), json!(ty));
    node.insert("location".into(), location(&sc.position));
    node.insert("keyword".into(), json!(sc.keyword));
    node.insert("name".into(), json!(sc.name));
    node.insert("description".into(), json!(sc.description));
    node.insert("tags".into(), json!(sc.tags));
    node.insert("steps".into(), steps(&sc.steps));
    if !sc.examples.is_empty() {
        let examples: Vec<Value> = sc.examples.iter().map(examples_node).collect();
        node.insert("examples".into(), Value::Array(examples));
    }
    Value::Object(node)
}

/// Background first, then scenarios and rules interleaved by source line.
fn children(background: Option<&Background>, scenarios: &[Scenario], rules: &[Rule]) -> Value {
    let mut nodes: Vec<(usize, Value)> = Vec::new();
    if let Some(bg) = background {
        nodes.push((bg.position.line, background_node(bg)));
    }
    nodes.extend(scenarios.iter().map(|s| (s.position.line, scenario_node(s))));
    nodes.extend(rules.iter().map(|r| (r.position.line, rule_node(r))));
    nodes.sort_by_key(|(line, _)| *line);
    Value::Array(nodes.into_iter().map(|(_, v)| v).collect())
}

fn rule_node(rule: &Rule) -> Value {
    json!({
        "type": "Rule",
        "location": location(&rule.position),
        "keyword": rule.keyword,
        "name": rule.name,
        "tags": rule.tags,
        "children": children(rule.background.as_ref(), &rule.scenarios, &[]),
    })
}

fn feature_node(feature: &Feature) -> Value {
    json!({
        "type": "Feature",
        "location": location(&feature.position),
        "keyword": feature.keyword,
        "name": feature.name,
        "description": feature.description,
        "tags": feature.tags,
        "children": children(feature.background.as_ref(), &feature.scenarios, &feature.rules),
    })
}

/// Parses feature text into its document tree.
pub fn parse_feature(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Err(Error::Gherkin("empty input".into()));
    }
    let feature = Feature::parse(text, GherkinEnv::default())
        .map_err(|e| Error::Gherkin(e.to_string()))?;
    tracing::debug!(
        name = %feature.name,
        scenarios = feature.scenarios.len(),
        rules = feature.rules.len(),
        "parsed feature"
    );
    Ok(feature_node(&feature))
}

/// Counts keywords and node types, and lists scenario names and step texts,
/// for a tree produced by [`parse_feature`].
pub fn feature_info(ast: &Value) -> Value {
    let mut keywords: BTreeMap<String, usize> = BTreeMap::new();
    let mut types: BTreeMap<String, usize> = BTreeMap::new();
    let mut scenarios = Vec::new();
    let mut step_texts = Vec::new();

    for item in walk_items(ast, WalkOptions::default()) {
        let (Some(PathKey::Key(key)), Some(value)) = (item.key, item.value.as_str()) else {
            continue;
        };
        match key {
            "keyword" => *keywords.entry(value.trim().to_string()).or_default() += 1,
            "type" => {
                *types.entry(value.to_string()).or_default() += 1;
                let Some(Ancestor::Value(node)) = item.ancestors.last() else {
                    continue;
                };
                match value {
                    "Scenario" | "ScenarioOutline" => scenarios.push(node["name"].clone()),
                    "Step" => step_texts.push(node["text"].clone()),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    json!({
        "count": {"Keywords": keywords, "Types": types},
        "content": {"Scenarios": scenarios, "Steps": step_texts},
    })
}
