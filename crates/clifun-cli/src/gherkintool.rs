use std::io::Write;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use clifun_core::gherkin;
use clifun_core::json::FormatOptions;
use serde_json::Value;

use crate::{GlobalArgs, InputArgs, Status, Tool, echo, info_format, write_help, write_json};

/// Parse Gherkin feature files
#[derive(Parser, Debug)]
#[command(name = "gherkintool", version)]
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
    /// Keyword and node counts, scenario names and step texts
    Info(InputArgs),
    /// Print the parsed document tree as JSON
    Parse(ParseArgs),
}

#[derive(Args, Debug)]
struct ParseArgs {
    #[command(flatten)]
    input: InputArgs,
    #[arg(long, default_value_t = 2)]
    indent: usize,
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
                let ast = load(&a)?;
                write_json(out, &gherkin::feature_info(&ast), &info_format())?;
                Ok(Status::Success)
            }
            Cmd::Parse(a) => {
                let ast = load(&a.input)?;
                write_json(out, &ast, &FormatOptions::indented(a.indent))?;
                Ok(Status::Success)
            }
        }
    }
}

fn load(input: &InputArgs) -> anyhow::Result<Value> {
    let text = input.read()?;
    gherkin::parse_feature(&text).with_context(|| format!("parsing {}", input.input))
}
