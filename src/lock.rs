//! Repository-scoped lock so two invocations cannot fight over the single
//! working-copy checkout.

use fs2::FileExt;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Repo-scoped lock guard that removes the lock file on drop.
#[derive(Debug)]
pub struct RepoLock {
    file: File,
    path: PathBuf,
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        // Best-effort unlock; ignore errors
        let _ = self.file.unlock();
        let _ = fs::remove_file(&self.path);
    }
}

/// Return true unless DTEST_CI_SKIP_LOCK=1 disables locking for this process.
pub fn should_acquire_lock() -> bool {
    env::var("DTEST_CI_SKIP_LOCK").ok().as_deref() != Some("1")
}

/// Candidate lock locations for a repository:
/// 1) <repo_root>/.dtest-ci.lock
/// 2) <tmp>/dtest-ci.<hash(repo_root)>.lock (when the root is not writable)
pub fn candidate_lock_paths(repo_root: &Path) -> Vec<PathBuf> {
    let key = fs::canonicalize(repo_root)
        .unwrap_or_else(|_| repo_root.to_path_buf())
        .to_string_lossy()
        .to_string();
    vec![
        repo_root.join(".dtest-ci.lock"),
        env::temp_dir().join(format!("dtest-ci.{}.lock", hash_repo_key_hex(&key))),
    ]
}

/// Acquire a non-blocking exclusive lock for the repository at `repo_root`.
pub fn acquire_repo_lock(repo_root: &Path) -> io::Result<RepoLock> {
    let mut last_err: Option<io::Error> = None;
    for p in candidate_lock_paths(repo_root) {
        match OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&p)
        {
            Ok(f) => match f.try_lock_exclusive() {
                Ok(_) => return Ok(RepoLock { file: f, path: p }),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(io::Error::other(
                        "another dtest-ci run holds the repository lock. Please try again later.",
                    ));
                }
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            },
            Err(e) => {
                last_err = Some(e);
                continue;
            }
        }
    }
    let mut msg = String::from("failed to create a lock file in any candidate location");
    if let Some(e) = last_err {
        msg.push_str(&format!(" (last error: {e})"));
    }
    Err(io::Error::other(msg))
}

/// Simple stable 64-bit FNV-1a hash for strings; returns 16-hex lowercase id.
fn hash_repo_key_hex(s: &str) -> String {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 1099511628211;
    let mut h: u64 = FNV_OFFSET;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    format!("{h:016x}")
}
