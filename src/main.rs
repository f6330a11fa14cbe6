use std::process::ExitCode;

use clap::Parser;

use dtest_ci::cli::Cli;
use dtest_ci::{color_enabled_stderr, commands, log_error_stderr, set_color_mode};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Some(mode) = cli.color {
        set_color_mode(mode);
    }

    // Everything this tool does goes through git; fail fast when it is missing.
    if which::which("git").is_err() {
        let use_err = color_enabled_stderr();
        log_error_stderr(use_err, "dtest-ci: git not found in PATH");
        return ExitCode::from(127);
    }

    commands::run(&cli)
}
