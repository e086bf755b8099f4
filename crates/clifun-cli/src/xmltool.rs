use std::io::Write;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use clifun_core::json::{FormatOptions, FormatStyle};
use clifun_core::xml::{self, Element, XmlToJsonOptions};
use serde_json::Value;

use crate::{GlobalArgs, InputArgs, Status, Tool, echo, info_format, validity, write_help, write_json};

/// Inspect, query and convert XML documents
#[derive(Parser, Debug)]
#[command(name = "xmltool", version)]
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
    /// Tag, text, attributes and child/descendant metrics
    Info(InfoArgs),
    /// Print whether the input is well-formed XML (exit 1 when it is not)
    Validate(InputArgs),
    /// Convert the document to JSON
    Tojson(ToJsonArgs),
    /// Select elements with a path expression
    Find(FindArgs),
    /// Remove elements and attributes, then print the document
    Strip(StripArgs),
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Describe each selected element instead of the root
    #[arg(long, short = 'x')]
    xpath: Option<String>,
}

#[derive(Args, Debug)]
struct ToJsonArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Indent the output by four spaces
    #[arg(long, short = 'p')]
    pretty: bool,
    /// Trim text and drop whitespace-only text
    #[arg(long)]
    strip_whitespace: bool,
    /// Drop namespace prefixes and xmlns declarations
    #[arg(long)]
    strip_namespace: bool,
    /// Drop all attributes
    #[arg(long)]
    strip_attribute: bool,
    /// Print the XML input before the JSON output
    #[arg(long, short = 'e')]
    echo: bool,
}

#[derive(Args, Debug)]
struct FindArgs {
    #[command(flatten)]
    input: InputArgs,
    /// ElementPath expression (default: every element)
    #[arg(long, short = 'x')]
    xpath: Option<String>,
    /// Print only the number of matches
    #[arg(long, short = 'c', conflicts_with = "json")]
    count: bool,
    /// Print each match converted to JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct StripArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Remove the elements matching this expression (repeatable)
    #[arg(long, short = 'x')]
    xpath: Vec<String>,
    /// Remove attributes with this name (repeatable, leading '@' optional)
    #[arg(long, short = 'a')]
    attribute: Vec<String>,
    /// Remove attributes with this value (repeatable)
    #[arg(long)]
    attribute_value: Vec<String>,
    /// Remove attributes whose value is empty
    #[arg(long)]
    empty_attributes: bool,
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
            Cmd::Validate(a) => validity(out, xml::parse_bytes(&a.read_bytes()?).is_ok()),
            Cmd::Tojson(a) => cmd_tojson(a, out),
            Cmd::Find(a) => cmd_find(a, out),
            Cmd::Strip(a) => cmd_strip(a, out),
        }
    }
}

/// Reads the input as bytes so documents declaring another encoding load too.
pub(crate) fn load(input: &InputArgs) -> anyhow::Result<Element> {
    let data = input.read_bytes()?;
    xml::parse_bytes(&data).with_context(|| format!("parsing {}", input.input))
}

fn cmd_info(args: InfoArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let root = load(&args.input)?;
    let info = match &args.xpath {
        Some(path) => Value::Array(
            xml::get_elements(&root, Some(path.as_str()))?
                .into_iter()
                .map(xml::element_info)
                .collect(),
        ),
        None => xml::element_info(&root),
    };
    write_json(out, &info, &info_format())?;
    Ok(Status::Success)
}

fn cmd_tojson(args: ToJsonArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let data = args.input.read_bytes()?;
    let text = xml::decode_document(&data).with_context(|| format!("decoding {}", args.input.input))?;
    let root = xml::parse(&text).with_context(|| format!("parsing {}", args.input.input))?;
    let opts = XmlToJsonOptions {
        strip_attribute: args.strip_attribute,
        strip_namespace: args.strip_namespace,
        strip_whitespace: args.strip_whitespace,
    };
    if args.echo {
        writeln!(out, "\nXML:\n{}\n\nJSON:", text)?;
    }
    let format = if args.pretty {
        FormatOptions::indented(4)
    } else {
        FormatOptions::default()
    };
    write_json(out, &xml::xml_to_json(&root, opts), &format)?;
    Ok(Status::Success)
}

fn cmd_find(args: FindArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let root = load(&args.input)?;
    let found = xml::get_elements(&root, args.xpath.as_deref())?;
    tracing::debug!(matches = found.len(), "find finished");
    if args.count {
        writeln!(out, "{}", found.len())?;
        return Ok(Status::Success);
    }
    let line = FormatOptions::default().with_style(FormatStyle::Compact);
    for el in found {
        if args.json {
            let opts = XmlToJsonOptions::default();
            write_json(out, &xml::xml_to_json(el, opts), &line)?;
        } else {
            writeln!(out, "{}", xml::to_xml_string(el))?;
        }
    }
    Ok(Status::Success)
}

fn cmd_strip(args: StripArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let mut root = load(&args.input)?;
    for path in &args.xpath {
        let n = xml::remove_elements(&mut root, path)?;
        tracing::debug!(path = %path, removed = n, "removed elements");
    }
    for name in &args.attribute {
        let n = xml::remove_attributes_with_name(&mut root, name);
        tracing::debug!(name = %name, removed = n, "removed attributes by name");
    }
    for value in &args.attribute_value {
        let n = xml::remove_attributes_with_value(&mut root, value);
        tracing::debug!(value = %value, removed = n, "removed attributes by value");
    }
    if args.empty_attributes {
        let n = xml::remove_attributes_with_empty_value(&mut root);
        tracing::debug!(removed = n, "removed empty attributes");
    }
    writeln!(out, "{}", xml::to_xml_string(&root))?;
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{input_file, run};

    const DOC: &str = "<a> <b\nid=\"b1\"   />\n<c/> <d> </d> </a>";

    #[test]
    fn validate() {
        let good = input_file(DOC);
        let (res, out) = run::<Cli>(&["validate", "-i", good.path().to_str().unwrap()]);
        assert_eq!((res.unwrap(), out.as_str()), (Status::Success, "true\n"));
        let bad = input_file("<a><b></a>");
        let (res, out) = run::<Cli>(&["validate", "-i", bad.path().to_str().unwrap()]);
        assert_eq!((res.unwrap(), out.as_str()), (Status::Failure, "false\n"));

        let mut not_utf8 = tempfile::NamedTempFile::new().unwrap();
        not_utf8.write_all(b"<a>\xff</a>").unwrap();
        let (res, out) = run::<Cli>(&["validate", "-i", not_utf8.path().to_str().unwrap()]);
        assert_eq!((res.unwrap(), out.as_str()), (Status::Failure, "false\n"));

        let (res, _) = run::<Cli>(&["validate", "-i", "/nonexistent/clifun/input.xml"]);
        assert!(res.is_err());
    }

    #[test]
    fn declared_encoding_is_honoured() {
        let mut latin1 = tempfile::NamedTempFile::new().unwrap();
        latin1
            .write_all(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<a>caf\xe9</a>\n")
            .unwrap();
        let p = latin1.path().to_str().unwrap();
        let (res, out) = run::<Cli>(&["validate", "-i", p]);
        assert_eq!((res.unwrap(), out.as_str()), (Status::Success, "true\n"));
        let (_, out) = run::<Cli>(&["tojson", "-i", p, "--strip-whitespace"]);
        assert_eq!(out, "{\"a\": \"caf\u{e9}\"}\n");
    }

    #[test]
    fn tojson_flags() {
        let f = input_file(DOC);
        let p = f.path().to_str().unwrap();
        let (_, out) = run::<Cli>(&["tojson", "-i", p, "--strip-whitespace"]);
        assert_eq!(out, "{\"a\": {\"b\": {\"@id\": \"b1\"}, \"c\": null, \"d\": null}}\n");
        let (_, out) = run::<Cli>(&["tojson", "-i", p, "--strip-whitespace", "--strip-attribute"]);
        assert_eq!(out, "{\"a\": {\"b\": null, \"c\": null, \"d\": null}}\n");
        let (_, out) = run::<Cli>(&["tojson", "-i", p]);
        assert_eq!(
            out,
            "{\"a\": {\"b\": {\"@id\": \"b1\", \"#tail\": \"\\n\"}, \"c\": {\"#tail\": \" \"}, \"d\": {\"#tail\": \" \", \"#text\": \" \"}, \"#text\": \" \"}}\n"
        );

        let leaf = input_file("<a/>");
        let (_, out) = run::<Cli>(&["tojson", "-i", leaf.path().to_str().unwrap(), "--pretty"]);
        assert_eq!(out, "{\n    \"a\": null\n}\n");
    }

    #[test]
    fn info_is_sorted_and_indented() {
        let f = input_file("<abc/>");
        let (_, out) = run::<Cli>(&["info", "-i", f.path().to_str().unwrap()]);
        assert_eq!(out, "{\n  \"content\": {\n    \"tag\": \"abc\"\n  },\n  \"metrics\": {}\n}\n");
    }

    #[test]
    fn find_count_and_serialize() {
        let f = input_file(r#"<r><a k="1"/><b><a/></b></r>"#);
        let p = f.path().to_str().unwrap();
        let (_, out) = run::<Cli>(&["find", "-i", p, "--count"]);
        assert_eq!(out, "4\n");
        let (_, out) = run::<Cli>(&["find", "-i", p, "-x", "//a"]);
        assert_eq!(out, "<a k=\"1\"/>\n<a/>\n");
        let (_, out) = run::<Cli>(&["find", "-i", p, "-x", "//a[@k]", "--json"]);
        assert_eq!(out, "{\"a\":{\"@k\":\"1\"}}\n");
        let (res, _) = run::<Cli>(&["find", "-i", p, "-x", "a["]);
        assert!(res.is_err());
    }

    #[test]
    fn strip_elements_and_attributes() {
        let f = input_file(r#"<r x=""><a k="1"/><b k="2" j="drop"><a/></b></r>"#);
        let p = f.path().to_str().unwrap();
        let (_, out) = run::<Cli>(&[
            "strip",
            "-i",
            p,
            "-x",
            "//a",
            "--attribute",
            "@k",
            "--attribute-value",
            "drop",
            "--empty-attributes",
        ]);
        assert_eq!(out, "<r><b/></r>\n");
    }
}
