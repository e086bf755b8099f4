use std::io::Write;

use clap::{ArgGroup, Args, Parser, Subcommand};
use clifun_core::dict::{self, DEFAULT_SEPARATOR};
use clifun_core::txt::{self, FindMode};
use serde_json::{Value, json};

use crate::{GlobalArgs, InputArgs, Status, Tool, echo, info_format, write_help, write_json};

/// Word and character tools for plain text
#[derive(Parser, Debug)]
#[command(name = "txttool", version)]
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
    /// Length plus character and word frequencies
    Info(InfoArgs),
    /// Print the lorem ipsum filler text
    Lorem,
    /// Split the input into tokens
    Split(SplitArgs),
    /// Print the index and text of every matching word
    Find(FindArgs),
    /// Distance statistics between two sets of words
    Distance(DistanceArgs),
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Flatten the nested report into one level
    #[arg(long, short = 'f', visible_alias = "flat")]
    flatten: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("scope").args(["whitespace", "words"])))]
struct SplitArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Split on runs of whitespace (default)
    #[arg(long)]
    whitespace: bool,
    /// Split into words, keeping hyphens and apostrophes
    #[arg(long)]
    words: bool,
    /// Join the tokens with this instead of printing one per line
    #[arg(long)]
    separator: Option<String>,
}

#[derive(Args, Debug, Clone, Copy)]
struct MatchArgs {
    /// Treat patterns as regular expressions (unanchored search)
    #[arg(long, short = 'r')]
    regex: bool,
    #[arg(long)]
    ignore_case: bool,
}

impl From<MatchArgs> for FindMode {
    fn from(m: MatchArgs) -> Self {
        FindMode {
            regex: m.regex,
            ignore_case: m.ignore_case,
        }
    }
}

#[derive(Args, Debug)]
struct FindArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Word (or pattern) to look for
    #[arg(long, short = 'p')]
    pattern: String,
    #[command(flatten)]
    matching: MatchArgs,
}

#[derive(Args, Debug)]
struct DistanceArgs {
    #[command(flatten)]
    input: InputArgs,
    /// First word set (repeatable)
    #[arg(long, required = true)]
    first: Vec<String>,
    /// Second word set (repeatable)
    #[arg(long, required = true)]
    second: Vec<String>,
    #[command(flatten)]
    matching: MatchArgs,
    /// Also list the matched words and their indexes
    #[arg(long, short = 'v')]
    verbose: bool,
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
            Cmd::Lorem => {
                writeln!(out, "{}", txt::lorem_ipsum())?;
                Ok(Status::Success)
            }
            Cmd::Split(a) => cmd_split(a, out),
            Cmd::Find(a) => cmd_find(a, out),
            Cmd::Distance(a) => cmd_distance(a, out),
        }
    }
}

fn cmd_info(args: InfoArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let text = args.input.read()?;
    let mut report = json!({"content": txt::get_info(&text)});
    if args.flatten {
        report = dict::flatten_value(&report, DEFAULT_SEPARATOR);
    }
    write_json(out, &report, &info_format())?;
    Ok(Status::Success)
}

fn cmd_split(args: SplitArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let text = args.input.read()?;
    let tokens = if args.words {
        txt::get_words(&text)
    } else {
        txt::split_whitespace(&text)
    };
    match &args.separator {
        Some(sep) => writeln!(out, "{}", tokens.join(sep))?,
        None => {
            for t in tokens {
                writeln!(out, "{}", t)?;
            }
        }
    }
    Ok(Status::Success)
}

fn cmd_find(args: FindArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let text = args.input.read()?;
    let words = txt::get_words(&text);
    for (index, word) in txt::find_all(&args.pattern, &words, args.matching.into())? {
        writeln!(out, "{}\t{}", index, word)?;
    }
    Ok(Status::Success)
}

fn cmd_distance(args: DistanceArgs, out: &mut dyn Write) -> anyhow::Result<Status> {
    let text = args.input.read()?;
    let words = txt::get_words(&text);
    let stats: Value = txt::find_distances(
        &args.first,
        &args.second,
        &words,
        args.matching.into(),
        args.verbose,
    )?;
    write_json(out, &stats, &info_format())?;
    Ok(Status::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{input_file, run};

    const TEXT: &str = "Hi! My name is Anne-Marie. What's yours?";

    #[test]
    fn lorem_and_help() {
        let (_, out) = run::<Cli>(&["lorem"]);
        assert_eq!(out.len(), txt::lorem_ipsum().len() + 1);
        let (_, out) = run::<Cli>(&[]);
        assert!(out.contains("distance"));
    }

    #[test]
    fn split_modes() {
        let f = input_file(TEXT);
        let p = f.path().to_str().unwrap();
        let (_, out) = run::<Cli>(&["split", "-i", p]);
        assert_eq!(out, "Hi!\nMy\nname\nis\nAnne-Marie.\nWhat's\nyours?\n");
        let (_, out) = run::<Cli>(&["split", "-i", p, "--words", "--separator", "|"]);
        assert_eq!(out, "Hi|My|name|is|Anne-Marie|What's|yours\n");
    }

    #[test]
    fn info_flattened() {
        let f = input_file("Abba");
        let (_, out) = run::<Cli>(&["info", "-i", f.path().to_str().unwrap(), "--flatten"]);
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["content_length"], json!(4));
        assert_eq!(v["content_metrics_chars_counts_distinct"], json!(2));
        assert_eq!(v["content_metrics_words_counts_each_abba"], json!(1));
    }

    #[test]
    fn find_prints_index_and_word() {
        let f = input_file(TEXT);
        let p = f.path().to_str().unwrap();
        let (_, out) = run::<Cli>(&["find", "-i", p, "-p", "^[a-z]", "-r"]);
        assert_eq!(out, "2\tname\n3\tis\n6\tyours\n");
        let (_, out) = run::<Cli>(&["find", "-i", p, "-p", "IS", "--ignore-case"]);
        assert_eq!(out, "3\tis\n");
    }

    #[test]
    fn distance_over_lorem() {
        let f = input_file(txt::lorem_ipsum());
        let p = f.path().to_str().unwrap();
        let (_, out) = run::<Cli>(&["distance", "-i", p, "--first", "lorem", "--second", "ipsum"]);
        assert_eq!(out, "{\n  \"max\": 893,\n  \"mean\": 402.56,\n  \"min\": 83\n}\n");
        let (res, _) = run::<Cli>(&["distance", "-i", p, "--first", "zzz", "--second", "ipsum"]);
        assert!(res.is_err());
    }
}
