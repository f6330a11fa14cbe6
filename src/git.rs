//! Thin wrappers over the `git` binary.
//!
//! All repository access goes through subprocess invocations with an
//! explicit `-C <repo>` so no operation depends on the process cwd.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::errors::CiError;

/// Run a git command with optional -C <repo>. Returns Output on invocation success.
pub fn git(repo: Option<&Path>, args: &[&str]) -> std::io::Result<Output> {
    let mut cmd = Command::new("git");
    if let Some(r) = repo {
        cmd.arg("-C").arg(r);
    }
    for a in args {
        cmd.arg(a);
    }
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.output()
}

/// Run a git command and capture trimmed stdout as UTF-8 String on success.
pub fn git_stdout_str(repo: Option<&Path>, args: &[&str]) -> Option<String> {
    git(repo, args).ok().and_then(|o| {
        if o.status.success() {
            Some(String::from_utf8_lossy(&o.stdout).trim().to_string())
        } else {
            None
        }
    })
}

/// Run a git command, requiring success. On a non-zero exit the error carries
/// the rendered command line and the trailing stderr lines.
pub fn git_run(repo: &Path, args: &[&str]) -> Result<(), CiError> {
    let out = git(Some(repo), args)?;
    if out.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&out.stderr);
    let tail = stderr.trim();
    Err(CiError::Git {
        context: if tail.is_empty() {
            format!("git {} failed ({})", args.join(" "), out.status)
        } else {
            format!("git {} failed: {}", args.join(" "), tail)
        },
    })
}

/// Get porcelain v1 status as string (empty when clean). Untracked files are
/// not listed: only tracked content counts as uncommitted changes. None if
/// git invocation failed.
pub fn git_status_porcelain(repo: &Path) -> Option<String> {
    git(Some(repo), &["status", "--porcelain=v1", "-uno"])
        .ok()
        .map(|o| String::from_utf8_lossy(&o.stdout).to_string())
}

/// True when the working copy has uncommitted changes to tracked files.
/// A failed status invocation counts as dirty.
pub fn is_dirty(repo: &Path) -> bool {
    match git_status_porcelain(repo) {
        Some(s) => s.lines().any(|l| !l.trim().is_empty()),
        None => true,
    }
}

/// Name of the checked-out branch, or the commit SHA when HEAD is detached.
pub fn current_ref(repo: &Path) -> Result<String, CiError> {
    let name = git_stdout_str(Some(repo), &["rev-parse", "--abbrev-ref", "HEAD"])
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CiError::Git {
            context: "git rev-parse --abbrev-ref HEAD failed".to_string(),
        })?;
    if name != "HEAD" {
        return Ok(name);
    }
    git_stdout_str(Some(repo), &["rev-parse", "--verify", "HEAD"]).ok_or_else(|| CiError::Git {
        context: "git rev-parse --verify HEAD failed (detached, unborn?)".to_string(),
    })
}

/// Short names of all local branches.
pub fn local_branches(repo: &Path) -> Result<Vec<String>, CiError> {
    let out = git(
        Some(repo),
        &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
    )?;
    if !out.status.success() {
        return Err(CiError::Git {
            context: format!("git for-each-ref failed ({})", out.status),
        });
    }
    Ok(String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

/// Render a git argument vector for verbose previews.
pub fn preview(args: &[&str]) -> String {
    format!("git {}", args.join(" "))
}
