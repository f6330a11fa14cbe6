//! Repository controller: owns the single working-copy checkout.
//!
//! The currently checked-out branch is global mutable state every operation
//! touches, so base branches are processed strictly sequentially and the
//! reference recorded at open time is checked out again after every base
//! branch, on success and on failure.

use std::path::{Path, PathBuf};

use crate::errors::CiError;
use crate::git;
use crate::variant::{TaskParams, VariantBuilder, VnodesMode, PUSH_REMOTE};
use crate::verify::DtestVerifier;

#[derive(Debug)]
pub struct CiRepo {
    root: PathBuf,
    original_ref: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RemoveOpts {
    pub dry_run: bool,
}

impl CiRepo {
    /// Locate the repository root by searching upward from `path` and record
    /// the checked-out reference for later restoration.
    pub fn open(path: &Path) -> Result<Self, CiError> {
        let root = git::git_stdout_str(Some(path), &["rev-parse", "--show-toplevel"])
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| CiError::NotARepository(path.to_path_buf()))?;
        let original_ref = git::current_ref(&root)?;
        Ok(Self { root, original_ref })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The reference checked out when the repository was opened.
    pub fn original_ref(&self) -> &str {
        &self.original_ref
    }

    pub fn is_dirty(&self) -> bool {
        git::is_dirty(&self.root)
    }

    /// Check the original reference out again.
    pub fn restore_original(&self) -> Result<(), CiError> {
        git::git_run(&self.root, &["checkout", &self.original_ref])
    }

    /// Generate, commit, and push the variant branches for every base branch
    /// in `task`. Refuses to start on a dirty working copy.
    pub fn run(&self, task: &TaskParams, verifier: &dyn DtestVerifier) -> Result<(), CiError> {
        if self.is_dirty() {
            return Err(CiError::DirtyWorkingCopy);
        }
        verifier.verify(&task.dtest_repo, &task.dtest_branch)?;

        for base in &task.branches {
            let result = self.build_variants_for(base, task);
            // Restore before propagating; a restore failure propagates itself.
            self.restore_original()?;
            result?;
        }
        Ok(())
    }

    fn build_variants_for(&self, base: &str, task: &TaskParams) -> Result<(), CiError> {
        VariantBuilder::new(&self.root, task, task.vnodes.primary_vnodes()).build(base)?;
        if task.vnodes == VnodesMode::All && task.dtest_test.is_some() {
            VariantBuilder::new(&self.root, task, true).build(base)?;
        }
        Ok(())
    }

    /// Local branches whose name contains `needle`, in ref order.
    pub fn matching_branches(&self, needle: &str) -> Result<Vec<String>, CiError> {
        Ok(git::local_branches(&self.root)?
            .into_iter()
            .filter(|b| b.contains(needle))
            .collect())
    }

    /// Delete every local branch whose name contains `needle`, remotely first
    /// and then locally. Prints one `Deleting <name>` line per branch.
    /// Returns the number of branches deleted (or planned, under dry-run).
    pub fn remove_matching(&self, needle: &str, opts: RemoveOpts) -> Result<usize, CiError> {
        let matching = self.matching_branches(needle)?;
        for name in &matching {
            if opts.dry_run {
                println!("DRY-RUN: Deleting {name}");
                continue;
            }
            println!("Deleting {name}");
            git::git_run(&self.root, &["push", "-d", PUSH_REMOTE, name])?;
            git::git_run(&self.root, &["branch", "-D", name])?;
        }
        Ok(matching.len())
    }
}
