//! dtest-ci: create, push, and clean per-branch CircleCI configuration
//! branches for repeated dtest runs.
//!
//! For each requested base branch the tool derives a branch named
//! `<base>-<dtest_branch>-<vnodes|novnodes>`, rewrites the CircleCI config to
//! point at an alternate dtest fork/branch (optionally repeating one test,
//! optionally with vnodes), regenerates the materialized config, commits, and
//! pushes to `origin` so the run can be approved in CircleCI. The `remove`
//! mode deletes every branch matching the naming convention once the dtest
//! patch has merged.

pub mod cli;
pub mod color;
pub mod commands;
pub mod config;
pub mod errors;
pub mod exec;
pub mod git;
pub mod lock;
pub mod repo;
pub mod variant;
pub mod verify;

pub use color::{color_enabled_stderr, log_error_stderr, log_info_stderr, log_warn_stderr, paint,
    set_color_mode, ColorMode};
pub use errors::{exit_code_for_error, exit_code_for_io_error, CiError};
pub use lock::{acquire_repo_lock, should_acquire_lock, RepoLock};
pub use repo::{CiRepo, RemoveOpts};
pub use variant::{branch_name, commit_message, effective_vnodes, TaskParams, VnodesMode,
    PUSH_REMOTE};
pub use verify::{AcceptAll, DtestVerifier};
