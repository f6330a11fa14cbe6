//! Error taxonomy and exit-code mapping.
//!
//! - Precondition failures (not a repository, dirty working copy) abort
//!   before any side effect.
//! - External command failures (git, generator script) abort the remaining
//!   work in the run; branches pushed by earlier iterations are kept.
//! - Map io::ErrorKind::NotFound to exit code 127; all others to 1.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum CiError {
    /// The given path is not inside a git work tree.
    NotARepository(PathBuf),
    /// The working copy has uncommitted changes.
    DirtyWorkingCopy,
    /// A git subcommand failed to spawn or exited non-zero.
    Git { context: String },
    /// The CircleCI generator script failed or timed out.
    ConfigGeneration(String),
    Io(io::Error),
}

impl fmt::Display for CiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CiError::NotARepository(p) => {
                write!(
                    f,
                    "not a git repository (searched upward from {})",
                    p.display()
                )
            }
            CiError::DirtyWorkingCopy => {
                write!(f, "uncommitted changes in the git repo. Cannot continue.")
            }
            CiError::Git { context } => write!(f, "{context}"),
            CiError::ConfigGeneration(msg) => write!(f, "config generation failed: {msg}"),
            CiError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CiError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CiError {
    fn from(e: io::Error) -> Self {
        CiError::Io(e)
    }
}

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Convert CiError to exit code (parity with the io::Error mapping).
pub fn exit_code_for_error(e: &CiError) -> u8 {
    match e {
        CiError::Io(ioe) => exit_code_for_io_error(ioe),
        _ => 1,
    }
}
