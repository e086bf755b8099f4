use std::io::Write;

use clap::{Args, Parser, Subcommand};
use clifun_core::json::FormatOptions;
use clifun_core::rfxml::{self, NodeOptions, Selection};
use serde_json::Value;

use crate::xmltool::load;
use crate::{GlobalArgs, InputArgs, Status, Tool, echo, info_format, write_help, write_json};

/// Summaries of Robot Framework output.xml files
#[derive(Parser, Debug)]
#[command(name = "rfxmltool", version)]
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
    /// Element metrics plus suite, test and message counts
    Info(InputArgs),
    /// List keywords
    Keywords(NodeArgs),
    /// List tests
    Tests(NodeArgs),
}

#[derive(Args, Debug)]
struct NodeArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Keep only nodes with this status
    #[arg(long, value_parser = ["PASS", "FAIL"])]
    status: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    start: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    stop: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    step: Option<i64>,
    /// Include keyword arguments
    #[arg(long = "showargs", short = 'a')]
    show_args: bool,
    /// Include log messages
    #[arg(long = "showmsgs", short = 'm')]
    show_msgs: bool,
    /// Print one indented array instead of one line per node
    #[arg(long, short = 'p')]
    pretty: bool,
}

impl NodeArgs {
    fn selection(&self) -> anyhow::Result<Selection> {
        Ok(Selection {
            status: self.status.as_deref().map(str::parse::<rfxml::Status>).transpose()?,
            start: self.start,
            stop: self.stop,
            step: self.step,
        })
    }

    fn options(&self) -> NodeOptions {
        NodeOptions {
            show_args: self.show_args,
            show_msgs: self.show_msgs,
            ..NodeOptions::default()
        }
    }
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
            Cmd::Info(a) => {
                let root = load(&a)?;
                write_json(out, &rfxml::info(&root), &info_format())?;
                Ok(Status::Success)
            }
            Cmd::Keywords(a) => {
                let root = load(&a.input)?;
                let nodes = rfxml::keywords(&root, a.options(), a.selection()?)?;
                write_nodes(out, nodes, a.pretty)
            }
            Cmd::Tests(a) => {
                let root = load(&a.input)?;
                let nodes = rfxml::tests(&root, a.options(), a.selection()?)?;
                write_nodes(out, nodes, a.pretty)
            }
        }
    }
}

fn write_nodes(out: &mut dyn Write, nodes: Vec<Value>, pretty: bool) -> anyhow::Result<Status> {
    if pretty {
        write_json(out, &Value::Array(nodes), &FormatOptions::indented(4))?;
    } else {
        let line = FormatOptions::default();
        for node in &nodes {
            write_json(out, node, &line)?;
        }
    }
    Ok(Status::Success)
}
