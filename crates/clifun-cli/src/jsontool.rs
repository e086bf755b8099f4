use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{ArgGroup, Args, Parser, Subcommand};
use clifun_core::dict::{self, DEFAULT_SEPARATOR};
use clifun_core::json::{self, FindQuery, FormatOptions, FormatStyle};
use clifun_core::pattern::Matcher;
use clifun_core::template::render;
use clifun_core::walk::{Ancestor, WalkOptions, walk_items};
use serde_json::{Value, json};

use crate::{GlobalArgs, InputArgs, Status, Tool, echo, info_format, validity, write_help, write_json};

/// Inspect, validate and reformat JSON documents
#[derive(Parser, Debug)]
#[command(name = "jsontool", version)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Echo the unparsed input
    Echo(InputArgs),
    /// Type, length and keys of the document
    Info(InfoArgs),
    /// Print whether the input is valid JSON (exit 1 when it is not)
    Validate(InputArgs),
    /// Reformat the document, json.dumps style
    Format(FormatArgs),
    /// Collapse nested objects into one level (or re-nest with --undo)
    Flatten(FlattenArgs),
    /// Remove null and empty values recursively
    Strip(OutputArgs),
    /// Find keys and/or values matching a pattern
    Find(FindArgs),
    /// List every node with its depth and path
    Walk(WalkArgs),
    /// Render a template using the document as context
    Mustache(MustacheArgs),
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Also describe each direct child
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("style").args(["compact", "pretty", "flat"])))]
struct FormatArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Minimal output; overrides indent and separators
    #[arg(long, short = 'c')]
    compact: bool,
    /// Human readable output (indent 2); overrides indent and separators
    #[arg(long, short = 'p')]
    pretty: bool,
    /// One value per line without indentation; overrides indent and separators
    #[arg(long, short = 'f')]
    flat: bool,
    /// Indentation width; omit for single-line output
    #[arg(long)]
    indent: Option<usize>,
    /// Output object keys in sorted order
    #[arg(long = "sort-keys", short = 's', visible_alias = "sorted")]
    sort_keys: bool,
    /// Escape every non-ASCII character as \uXXXX (default)
    #[arg(long, overrides_with = "no_ensure_ascii")]
    ensure_ascii: bool,
    /// Write non-ASCII characters as they are
    #[arg(long, visible_alias = "ensure-ascii-off", overrides_with = "ensure_ascii")]
    no_ensure_ascii: bool,
    /// Separator between items
    #[arg(long)]
    item_separator: Option<String>,
    /// Separator between a key and its value
    #[arg(long, visible_alias = "key-separator")]
    dict_separator: Option<String>,
}

impl FormatArgs {
    fn style(&self) -> Option<FormatStyle> {
        if self.compact {
            Some(FormatStyle::Compact)
        } else if self.pretty {
            Some(FormatStyle::Pretty)
        } else if self.flat {
            Some(FormatStyle::Flat)
        } else {
            None
        }
    }

    fn options(&self) -> FormatOptions {
        let opts = FormatOptions {
            indent: self.indent,
            item_separator: self.item_separator.clone(),
            key_separator: self.dict_separator.clone(),
            sort_keys: self.sort_keys,
            ensure_ascii: self.ensure_ascii || !self.no_ensure_ascii,
        };
        match self.style() {
            Some(style) => opts.with_style(style),
            None => opts,
        }
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Indent the output
    #[arg(long, short = 'p')]
    pretty: bool,
}

impl OutputArgs {
    fn format(&self) -> FormatOptions {
        if self.pretty {
            FormatOptions::default().with_style(FormatStyle::Pretty)
        } else {
            FormatOptions::default()
        }
    }
}

#[derive(Args, Debug)]
struct FlattenArgs {
    #[command(flatten)]
    output: OutputArgs,
    /// Joins ancestor keys
    #[arg(long, default_value = DEFAULT_SEPARATOR)]
    separator: String,
    /// Re-nest a flattened object
    #[arg(long)]
    undo: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("query").args(["key", "value"]).required(true).multiple(true)))]
struct FindArgs {
    #[command(flatten)]
    output: OutputArgs,
    /// Key (or index) to match
    #[arg(long, short = 'k')]
    key: Option<String>,
    /// Scalar value to match, compared as text
    #[arg(long)]
    value: Option<String>,
    /// Treat the patterns as regular expressions
    #[arg(long, short = 'r')]
    regex: bool,
    #[arg(long)]
    ignore_case: bool,
    /// Skip objects and arrays
    #[arg(long)]
    values_only: bool,
}

#[derive(Args, Debug)]
struct WalkArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Skip objects and arrays (their contents are still walked)
    #[arg(long)]
    values_only: bool,
    /// Count keys as ancestors, doubling the depth
    #[arg(long)]
    keys_as_ancestors: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").args(["template", "template_file"]).required(true)))]
struct MustacheArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Inline template, e.g. '{{greeting}} {{person}}!'
    #[arg(long, short = 't')]
    template: Option<String>,
    /// File holding the template
    #[arg(long, value_name = "PATH")]
    template_file: Option<PathBuf>,
}

impl Tool for Cli {
    fn global(&self) -> &GlobalArgs {
        &self.global
    }

    fn run(self, out: &mut dyn Write) -> anyhow::Result<Status> {
        let Some(cmd) = self.cmd else {
            return write_help::<Cli>(out);
        };
        match cmd {
            Cmd::Echo(a) => echo(&a, out),
            Cmd::Info(a) => cmd_info(a, out),
            Cmd::Validate(a) => {
                let data = a.read_bytes()?;
                let valid = std::str::from_utf8(&data).is_ok_and(json::contains_valid_json);
                validity(out, valid)
            }
            Cmd::Format(a) => cmd_format(a, out),
            Cmd::Flatten(a) => cmd_flatten(a, out),
            Cmd::Strip(a) => cmd_strip(a, out),
            Cmd::Find(a) => cmd_find(a, out),
            Cmd::Walk(a) => cmd_walk(a, out),
            Cmd::Mustache(a) => cmd_mustache(a, out),
        }
    }
}

fn load(input: &InputArgs) -> anyhow::Result<Value> {
    let text = input.read()?;
    json::parse(&text).with_context(|| format!("parsing {}", input.input))
}

fn cmd_info(args: InfoArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let v = load(&args.input)?;
    write_json(out, &json::info(&v, args.verbose), &info_format())?;
    Ok(Status::Success)
}

fn cmd_format(args: FormatArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let v = load(&args.input)?;
    write_json(out, &v, &args.options())?;
    Ok(Status::Success)
}

fn cmd_flatten(args: FlattenArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let v = load(&args.output.input)?;
    let kind = json::kind_of(&v);
    let Value::Object(map) = v else {
        bail!("flatten needs a JSON object, got {}", kind);
    };
    let result = if args.undo {
        dict::unflatten(&map, &args.separator)?
    } else {
        dict::flatten(&map, &args.separator)
    };
    write_json(out, &Value::Object(result), &args.output.format())?;
    Ok(Status::Success)
}

fn cmd_strip(args: OutputArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let mut v = load(&args.input)?;
    dict::strip_empty(&mut v);
    write_json(out, &v, &args.format())?;
    Ok(Status::Success)
}

fn cmd_find(args: FindArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let v = load(&args.output.input)?;
    let matcher = |p: &Option<String>| -> anyhow::Result<Option<Matcher>> {
        p.as_deref()
            .map(|p| Matcher::new(p, args.regex, args.ignore_case))
            .transpose()
            .map_err(Into::into)
    };
    let query = FindQuery {
        key: matcher(&args.key)?,
        value: matcher(&args.value)?,
        values_only: args.values_only,
    };
    let found = json::find(&v, &query);
    tracing::debug!(matches = found.len(), "find finished");
    write_json(out, &Value::Array(found), &args.output.format())?;
    Ok(Status::Success)
}

fn cmd_walk(args: WalkArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let v = load(&args.input)?;
    let opts = WalkOptions {
        values_only: args.values_only,
        ancestors: args.keys_as_ancestors,
        keys_as_ancestors: args.keys_as_ancestors,
    };
    let line = FormatOptions::default();
    for item in walk_items(&v, opts) {
        let mut entry = json!({
            "depth": item.depth,
            "pointer": item.pointer(),
            "key": item.key.map(|k| k.to_value()),
        });
        if args.keys_as_ancestors {
            let keys: Vec<Value> = item
                .ancestors
                .iter()
                .filter_map(|a| match a {
                    Ancestor::Key(k) => Some(k.to_value()),
                    Ancestor::Value(_) => None,
                })
                .collect();
            entry["ancestor_keys"] = Value::Array(keys);
        }
        if !matches!(item.value, Value::Object(_) | Value::Array(_)) {
            entry["value"] = item.value.clone();
        }
        write_json(out, &entry, &line)?;
    }
    Ok(Status::Success)
}

fn cmd_mustache(args: MustacheArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let template = match (&args.template, &args.template_file) {
        (Some(t), _) => t.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading template {}", path.display()))?,
        (None, None) => bail!("a template is required"),
    };
    let context = load(&args.input)?;
    writeln!(out, "{}", render(&template, &context)?)?;
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{input_file, run};

    fn path(f: &tempfile::NamedTempFile) -> &str {
        f.path().to_str().unwrap()
    }

    #[test]
    fn no_subcommand_prints_help() {
        let (res, out) = run::<Cli>(&[]);
        assert_eq!(res.unwrap(), Status::Success);
        assert!(out.contains("Usage:"));
        assert!(out.contains("flatten"));
    }

    #[test]
    fn validate_reports_and_sets_status() {
        let good = input_file(r#"{"a": [1, 2]}"#);
        let (res, out) = run::<Cli>(&["validate", "-i", path(&good)]);
        assert_eq!(res.unwrap(), Status::Success);
        assert_eq!(out, "true\n");

        let bad = input_file("{\"a\": ");
        let (res, out) = run::<Cli>(&["validate", "-i", path(&bad)]);
        assert_eq!(res.unwrap(), Status::Failure);
        assert_eq!(out, "false\n");

        let mut not_utf8 = tempfile::NamedTempFile::new().unwrap();
        not_utf8.write_all(&[0x7b, 0xff, 0x7d]).unwrap();
        let (res, out) = run::<Cli>(&["validate", "-i", path(&not_utf8)]);
        assert_eq!((res.unwrap(), out.as_str()), (Status::Failure, "false\n"));

        let (res, _) = run::<Cli>(&["validate", "-i", "/nonexistent/clifun/input.json"]);
        assert!(res.is_err());
    }

    #[test]
    fn format_styles() {
        let f = input_file(r#"{"b": {"y": 1, "x": [1, 2]}, "a": "é"}"#);
        let (_, out) = run::<Cli>(&["format", "-i", path(&f), "--compact", "--sort-keys"]);
        assert_eq!(out, "{\"a\":\"\\u00e9\",\"b\":{\"x\":[1,2],\"y\":1}}\n");
        let (_, out) = run::<Cli>(&["format", "-i", path(&f), "--no-ensure-ascii"]);
        assert_eq!(out, "{\"b\": {\"y\": 1, \"x\": [1, 2]}, \"a\": \"é\"}\n");
        let (_, out) = run::<Cli>(&["format", "-i", path(&f), "--ensure-ascii-off", "--ensure-ascii"]);
        assert!(out.contains("\\u00e9"));
        let (_, out) = run::<Cli>(&["format", "-i", path(&f), "--item-separator", ";"]);
        assert_eq!(out, "{\"b\": {\"y\": 1;\"x\": [1;2]};\"a\": \"\\u00e9\"}\n");
        let (_, out) = run::<Cli>(&["format", "-i", path(&f), "--flat"]);
        assert!(out.starts_with("{\n\"b\": {\n\"y\": 1,\n"));
    }

    #[test]
    fn format_rejects_two_styles() {
        assert!(Cli::try_parse_from(["jsontool", "format", "--compact", "--pretty"]).is_err());
    }

    #[test]
    fn flatten_and_undo() {
        let f = input_file(r#"{"a": 1, "c": {"a": 2, "b": {"x": 5}}, "d": [1]}"#);
        let (_, out) = run::<Cli>(&["flatten", "-i", path(&f)]);
        assert_eq!(out, "{\"a\": 1, \"c_a\": 2, \"c_b_x\": 5, \"d\": [1]}\n");
        let flat = input_file(out.trim());
        let (_, out) = run::<Cli>(&["flatten", "--undo", "-i", path(&flat)]);
        assert_eq!(out, "{\"a\": 1, \"c\": {\"a\": 2, \"b\": {\"x\": 5}}, \"d\": [1]}\n");

        let arr = input_file("[1]");
        let (res, _) = run::<Cli>(&["flatten", "-i", path(&arr)]);
        assert!(res.is_err());
    }

    #[test]
    fn strip_and_find() {
        let f = input_file(r#"{"a": null, "b": {"c": "", "d": 4}, "e": [{}]}"#);
        let (_, out) = run::<Cli>(&["strip", "-i", path(&f)]);
        assert_eq!(out, "{\"b\": {\"d\": 4}}\n");

        let (_, out) = run::<Cli>(&["find", "-i", path(&f), "--key", "d"]);
        assert_eq!(out, "[{\"pointer\": \"/b/d\", \"depth\": 2, \"key\": \"d\", \"value\": 4}]\n");
        assert!(Cli::try_parse_from(["jsontool", "find"]).is_err());
    }

    #[test]
    fn walk_lines() {
        let f = input_file(r#"{"a": [true]}"#);
        let (_, out) = run::<Cli>(&["walk", "-i", path(&f), "--values-only"]);
        assert_eq!(out, "{\"depth\": 2, \"pointer\": \"/a/0\", \"key\": 0, \"value\": true}\n");
        let (_, out) = run::<Cli>(&["walk", "-i", path(&f)]);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn mustache_renders_context() {
        let f = input_file(r#"{"p": "Mom", "g": {"informal": "Hi"}}"#);
        let (_, out) = run::<Cli>(&["mustache", "-i", path(&f), "-t", "{{g.informal}} {{p}}!"]);
        assert_eq!(out, "Hi Mom!\n");
        let (res, out) = run::<Cli>(&["mustache", "-i", path(&f), "-t", "[{{g.missing.x}}]"]);
        assert_eq!((res.unwrap(), out.as_str()), (Status::Success, "[]\n"));
    }

    #[test]
    fn parse_errors_propagate() {
        let f = input_file("not json");
        let (res, _) = run::<Cli>(&["info", "-i", path(&f)]);
        let err = res.unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));
    }
}
