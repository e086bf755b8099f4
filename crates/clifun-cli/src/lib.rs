//! Command groups behind the clifun binaries.
//!
//! Each tool module exposes a clap `Cli` implementing [`Tool`]; the binaries in
//! `src/bin` only call [`main_with`]. Handlers write to any `Write` so tests can
//! capture output.

pub mod gherkintool;
pub mod jsontool;
pub mod rfxmltool;
pub mod txttool;
pub mod xmltool;

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser};
use clifun_core::Input;
use clifun_core::json::{FormatOptions, to_string_with};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Log debug detail to stderr
    #[arg(long, short = 'd', conflicts_with = "silent")]
    pub debug: bool,
    /// Only log errors
    #[arg(long, short = 's')]
    pub silent: bool,
}

impl GlobalArgs {
    fn level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.silent {
            "error"
        } else {
            "warn"
        }
    }
}

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over the flags.
pub fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(global.level()));
    // a subscriber may already be installed when running under a test harness
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// File containing the input, or '-' to read stdin
    #[arg(long, short = 'i', value_name = "PATH", default_value = "-")]
    pub input: Input,
}

impl InputArgs {
    pub fn read(&self) -> anyhow::Result<String> {
        self.input
            .read_to_string()
            .with_context(|| format!("reading {}", self.input))
    }

    pub fn read_bytes(&self) -> anyhow::Result<Vec<u8>> {
        self.input
            .read_bytes()
            .with_context(|| format!("reading {}", self.input))
    }
}

/// Outcome of a command that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    /// The command ran but its answer is negative (e.g. `validate` on bad input).
    Failure,
}

impl From<Status> for ExitCode {
    fn from(s: Status) -> Self {
        match s {
            Status::Success => ExitCode::SUCCESS,
            Status::Failure => ExitCode::FAILURE,
        }
    }
}

pub trait Tool: Parser {
    fn global(&self) -> &GlobalArgs;
    fn run(self, out: &mut dyn Write) -> anyhow::Result<Status>;
}

/// Parses the command line, sets up logging and runs the tool against stdout.
pub fn main_with<T: Tool>() -> ExitCode {
    let cli = T::parse();
    init_logging(cli.global());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = cli.run(&mut out);
    let _ = out.flush();
    match result {
        Ok(status) => status.into(),
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

pub(crate) fn write_help<C: CommandFactory>(out: &mut dyn Write) -> anyhow::Result<Status> {
    let mut cmd = C::command();
    writeln!(out, "{}", cmd.render_help())?;
    Ok(Status::Success)
}

/// Writes the input back unparsed, ending with a newline.
pub(crate) fn echo(input: &InputArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let data = input.read_bytes()?;
    out.write_all(&data)?;
    if !data.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    Ok(Status::Success)
}

pub(crate) fn write_json(out: &mut dyn Write, value: &Value, opts: &FormatOptions) -> anyhow::Result<()> {
    writeln!(out, "{}", to_string_with(value, opts)?)?;
    Ok(())
}

/// Layout used by every `info` command: two-space indent, sorted keys.
pub(crate) fn info_format() -> FormatOptions {
    FormatOptions {
        sort_keys: true,
        ..FormatOptions::indented(2)
    }
}

pub(crate) fn validity(out: &mut dyn Write, valid: bool) -> anyhow::Result<Status> {
    writeln!(out, "{}", valid)?;
    Ok(if valid { Status::Success } else { Status::Failure })
}
