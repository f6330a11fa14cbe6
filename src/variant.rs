//! Variant builder: one derived CI branch per (base branch, vnodes setting).
//!
//! Build order per variant: checkout, config edits, generator script,
//! commit, push. Any failure aborts the whole run; the controller restores
//! the original checkout afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;

use crate::config::{
    self, Substitution, CIRCLECI_DIR, CONFIG_FILE, DEFAULT_DTEST_BRANCH_MARKER,
    DEFAULT_DTEST_REPO, GENERATE_SCRIPT, LEGACY_CONFIG_FILE, REPEATED_TEST_MARKER,
    VNODES_FLAG_OFF, VNODES_FLAG_ON,
};
use crate::errors::CiError;
use crate::exec::{ExecRequest, ExecService};
use crate::git;

/// Fixed push target for generated branches.
pub const PUSH_REMOTE: &str = "origin";

/// Which topologies to build per base branch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum VnodesMode {
    Vnodes,
    Novnodes,
    All,
}

impl VnodesMode {
    /// Vnodes setting of the first build for each base branch. `all` starts
    /// with the novnodes variant; the vnodes one follows as a second build.
    pub fn primary_vnodes(self) -> bool {
        matches!(self, VnodesMode::Vnodes)
    }
}

/// Immutable parameters for one run.
#[derive(Debug, Clone)]
pub struct TaskParams {
    pub dtest_repo: String,
    pub dtest_branch: String,
    pub dtest_test: Option<String>,
    pub vnodes: VnodesMode,
    pub branches: Vec<String>,
    pub remote: Option<String>,
    pub generator_timeout: Option<Duration>,
    pub verbose: bool,
}

/// Derived branch name: `<base>-<dtest_branch>-<vnodes|novnodes>`.
pub fn branch_name(base: &str, dtest_branch: &str, vnodes: bool) -> String {
    let suffix = if vnodes { "vnodes" } else { "novnodes" };
    format!("{base}-{dtest_branch}-{suffix}")
}

/// Topology counts as enabled only when a single-test identifier is present;
/// the naming scheme does not support repeating a whole suite under both
/// topologies.
pub fn effective_vnodes(requested: bool, dtest_test: Option<&str>) -> bool {
    requested && dtest_test.is_some()
}

/// Fixed commit-message template for generated branches.
pub fn commit_message(dtest_branch: &str, base: &str, vnodes: bool) -> String {
    let suffix = if vnodes {
        " with vnodes"
    } else {
        " without vnodes"
    };
    format!("DO NOT MERGE! CircleCI configuration for {dtest_branch} and {base}{suffix}")
}

pub struct VariantBuilder<'a> {
    repo_root: &'a Path,
    task: &'a TaskParams,
    vnodes: bool,
}

impl<'a> VariantBuilder<'a> {
    pub fn new(repo_root: &'a Path, task: &'a TaskParams, vnodes_requested: bool) -> Self {
        Self {
            repo_root,
            task,
            vnodes: effective_vnodes(vnodes_requested, task.dtest_test.as_deref()),
        }
    }

    fn circleci_dir(&self) -> PathBuf {
        self.repo_root.join(CIRCLECI_DIR)
    }

    /// Build one variant for `base`: checkout, edit, generate, commit, push.
    /// Returns the name of the branch the commit landed on.
    pub fn build(&self, base: &str) -> Result<String, CiError> {
        let branch = self.create_branch(base)?;
        println!("{branch}");
        let touched = self.edit_config()?;
        self.invoke_generator()?;
        self.commit(base, &touched)?;
        self.push(&branch)?;
        Ok(branch)
    }

    /// With a remote: fetch the base branch and create+checkout the derived
    /// branch from the remote-tracking ref. Without one: check out the local
    /// base branch itself, so edits land on already-synced local state.
    fn create_branch(&self, base: &str) -> Result<String, CiError> {
        match self.task.remote.as_deref() {
            Some(remote) => {
                let name = branch_name(base, &self.task.dtest_branch, self.vnodes);
                self.run_git(&["fetch", remote, base])?;
                let start = format!("{remote}/{base}");
                self.run_git(&["checkout", "-B", &name, &start])?;
                Ok(name)
            }
            None => {
                self.run_git(&["checkout", base])?;
                Ok(base.to_string())
            }
        }
    }

    /// Keyed literal replacements on the config file(s); returns the paths to
    /// stage. The vnodes flip targets the legacy file when it exists.
    fn edit_config(&self) -> Result<Vec<PathBuf>, CiError> {
        let dir = self.circleci_dir();
        let main_cfg = dir.join(CONFIG_FILE);
        let mut touched = vec![main_cfg.clone()];

        let mut subs = vec![
            Substitution::new("dtest repo", DEFAULT_DTEST_REPO, self.task.dtest_repo.as_str()),
            Substitution::new(
                "dtest branch",
                DEFAULT_DTEST_BRANCH_MARKER,
                format!("DTEST_BRANCH: {}", self.task.dtest_branch),
            ),
        ];
        if let Some(test) = self.task.dtest_test.as_deref() {
            subs.push(Substitution::new(
                "repeated test",
                REPEATED_TEST_MARKER,
                format!("{REPEATED_TEST_MARKER} {test}"),
            ));
        }
        config::apply_substitutions(&main_cfg, &subs)?;

        if self.vnodes {
            let legacy = dir.join(LEGACY_CONFIG_FILE);
            let target = if legacy.exists() { legacy } else { main_cfg };
            config::apply_substitutions(
                &target,
                &[Substitution::new(
                    "vnodes flag",
                    VNODES_FLAG_OFF,
                    VNODES_FLAG_ON,
                )],
            )?;
            if !touched.contains(&target) {
                touched.push(target);
            }
        }
        Ok(touched)
    }

    /// Run `generate.sh -m` in the CircleCI directory. The script's non-zero
    /// exit (or a timeout) aborts the run.
    fn invoke_generator(&self) -> Result<(), CiError> {
        let dir = self.circleci_dir();
        let script = dir.join(GENERATE_SCRIPT);
        let svc = ExecService::new(self.task.generator_timeout);
        if self.task.verbose {
            eprintln!("dtest-ci: exec: {} -m", script.display());
        }
        let out = svc
            .run(
                ExecRequest::new(&script)
                    .arg("-m")
                    .cwd(&dir)
                    .capture_output(true),
            )
            .map_err(|e| CiError::ConfigGeneration(format!("{e:#}")))?;
        if !out.status.success() {
            let tail = out.stderr.trim();
            return Err(CiError::ConfigGeneration(if tail.is_empty() {
                format!("{} exited with {}", script.display(), out.status)
            } else {
                format!("{} exited with {}: {}", script.display(), out.status, tail)
            }));
        }
        Ok(())
    }

    fn commit(&self, base: &str, touched: &[PathBuf]) -> Result<(), CiError> {
        let mut add_args = vec!["add".to_string()];
        add_args.extend(touched.iter().map(|p| p.display().to_string()));
        let add_refs: Vec<&str> = add_args.iter().map(String::as_str).collect();
        self.run_git(&add_refs)?;

        let message = commit_message(&self.task.dtest_branch, base, self.vnodes);
        self.run_git(&["commit", "-m", &message])
    }

    fn push(&self, branch: &str) -> Result<(), CiError> {
        self.run_git(&["push", "-u", PUSH_REMOTE, branch])
    }

    fn run_git(&self, args: &[&str]) -> Result<(), CiError> {
        if self.task.verbose {
            eprintln!("dtest-ci: {}", git::preview(args));
        }
        git::git_run(self.repo_root, args)
    }
}
