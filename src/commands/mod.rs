//! Subcommand entry points: resolve parameters, open the repository, run.

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use crate::cli::{Cli, Cmd};
use crate::color::{color_enabled_stderr, log_error_stderr, log_info_stderr, paint};
use crate::errors::exit_code_for_error;
use crate::lock::{acquire_repo_lock, should_acquire_lock};
use crate::repo::{CiRepo, RemoveOpts};
use crate::variant::{TaskParams, VnodesMode};
use crate::verify::AcceptAll;

pub fn run(cli: &Cli) -> ExitCode {
    match &cli.command {
        Cmd::Generate {
            dtest_repo,
            dtest_branch,
            dtest_test,
            vnodes,
            branches,
            remote,
            generator_timeout,
        } => run_generate(
            cli,
            dtest_repo.as_deref(),
            dtest_branch,
            dtest_test.as_deref(),
            *vnodes,
            branches,
            remote.as_deref(),
            *generator_timeout,
        ),
        Cmd::Remove {
            dtest_branch,
            dry_run,
            yes,
        } => run_remove(dtest_branch, *dry_run, *yes),
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[allow(clippy::too_many_arguments)]
fn run_generate(
    cli: &Cli,
    dtest_repo: Option<&str>,
    dtest_branch: &str,
    dtest_test: Option<&str>,
    vnodes: VnodesMode,
    branches: &[String],
    remote: Option<&str>,
    generator_timeout: Option<u64>,
) -> ExitCode {
    let use_err = color_enabled_stderr();

    let dtest_repo = match dtest_repo
        .map(str::to_string)
        .or_else(|| env_nonempty("DTEST_CI_DTEST_REPO"))
    {
        Some(v) => v,
        None => {
            log_error_stderr(
                use_err,
                "dtest-ci: --dtest-repo is required (or set DTEST_CI_DTEST_REPO)",
            );
            return ExitCode::from(1);
        }
    };
    let remote = remote
        .map(str::to_string)
        .or_else(|| env_nonempty("DTEST_CI_REMOTE"));

    let cwd = match std::env::current_dir() {
        Ok(d) => d,
        Err(e) => {
            log_error_stderr(use_err, &format!("dtest-ci: {e}"));
            return ExitCode::from(1);
        }
    };
    let repo = match CiRepo::open(&cwd) {
        Ok(r) => r,
        Err(e) => {
            log_error_stderr(use_err, &format!("dtest-ci: {e}"));
            return ExitCode::from(exit_code_for_error(&e));
        }
    };
    let _lock = match repo_lock(&repo, use_err) {
        Ok(l) => l,
        Err(code) => return code,
    };

    let task = TaskParams {
        dtest_repo,
        dtest_branch: dtest_branch.to_string(),
        dtest_test: dtest_test.map(str::to_string),
        vnodes,
        branches: branches.to_vec(),
        remote,
        generator_timeout: generator_timeout.map(Duration::from_secs),
        verbose: cli.verbose,
    };

    if cli.verbose {
        log_info_stderr(
            use_err,
            &format!(
                "dtest-ci: repo {} (restoring to {} afterwards)",
                repo.root().display(),
                repo.original_ref()
            ),
        );
    }

    match repo.run(&task, &AcceptAll) {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            log_error_stderr(use_err, &format!("dtest-ci: {e}"));
            ExitCode::from(exit_code_for_error(&e))
        }
    }
}

fn run_remove(dtest_branch: &str, dry_run: bool, yes: bool) -> ExitCode {
    let use_err = color_enabled_stderr();

    let cwd = match std::env::current_dir() {
        Ok(d) => d,
        Err(e) => {
            log_error_stderr(use_err, &format!("dtest-ci: {e}"));
            return ExitCode::from(1);
        }
    };
    let repo = match CiRepo::open(&cwd) {
        Ok(r) => r,
        Err(e) => {
            log_error_stderr(use_err, &format!("dtest-ci: {e}"));
            return ExitCode::from(exit_code_for_error(&e));
        }
    };
    let _lock = match repo_lock(&repo, use_err) {
        Ok(l) => l,
        Err(code) => return code,
    };

    let matching = match repo.matching_branches(dtest_branch) {
        Ok(m) => m,
        Err(e) => {
            log_error_stderr(use_err, &format!("dtest-ci: {e}"));
            return ExitCode::from(exit_code_for_error(&e));
        }
    };
    if matching.is_empty() {
        log_info_stderr(
            use_err,
            &format!("dtest-ci: no branches matching '{dtest_branch}'"),
        );
        return ExitCode::from(0);
    }

    if let Err(code) = confirm_removal(&matching, dry_run, yes, use_err) {
        return ExitCode::from(code);
    }

    match repo.remove_matching(dtest_branch, RemoveOpts { dry_run }) {
        Ok(_) => ExitCode::from(0),
        Err(e) => {
            log_error_stderr(use_err, &format!("dtest-ci: {e}"));
            ExitCode::from(exit_code_for_error(&e))
        }
    }
}

fn repo_lock(repo: &CiRepo, use_err: bool) -> Result<Option<crate::lock::RepoLock>, ExitCode> {
    if !should_acquire_lock() {
        return Ok(None);
    }
    match acquire_repo_lock(repo.root()) {
        Ok(l) => Ok(Some(l)),
        Err(e) => {
            log_error_stderr(use_err, &format!("dtest-ci: {e}"));
            Err(ExitCode::from(1))
        }
    }
}

/// Branch deletion is irreversible, so interactive runs confirm first.
/// Non-interactive stdin without --yes or --dry-run is refused.
fn confirm_removal(matching: &[String], dry_run: bool, yes: bool, use_err: bool) -> Result<(), u8> {
    if dry_run || yes {
        return Ok(());
    }
    if !atty::is(atty::Stream::Stdin) {
        eprintln!(
            "dtest-ci: refusing to delete without confirmation on non-interactive stdin. Re-run with --yes or --dry-run."
        );
        return Err(1);
    }
    let prompt = format!(
        "dtest-ci: about to delete {} branch(es) locally and on origin. Proceed? [y/N] ",
        matching.len()
    );
    eprint!("{}", paint(use_err, "\x1b[33m", &prompt));
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
    let ans = line.trim().to_ascii_lowercase();
    if ans != "y" && ans != "yes" {
        eprintln!("aborted.");
        return Err(1);
    }
    Ok(())
}
