use std::process::ExitCode;

fn main() -> ExitCode {
    clifun_cli::main_with::<clifun_cli::rfxmltool::Cli>()
}
