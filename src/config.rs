//! CircleCI configuration editing via keyed literal substitution.
//!
//! The config template is never parsed: each edit is a plain substring
//! replacement keyed to a marker that must exist verbatim in the file.
//! A missing marker leaves the file untouched; it is reported as a warning
//! because it means the template changed underneath the tool.

use std::fs;
use std::path::Path;

use crate::color::{color_enabled_stderr, log_warn_stderr};
use crate::errors::CiError;

/// Directory under the repository root holding the CircleCI config.
pub const CIRCLECI_DIR: &str = ".circleci";
/// Main generated configuration file.
pub const CONFIG_FILE: &str = "config.yml";
/// Legacy configuration file carrying the repeated-dtest vnodes flag.
pub const LEGACY_CONFIG_FILE: &str = "config-2_1.yml";
/// Generator script invoked with `-m` after the edits.
pub const GENERATE_SCRIPT: &str = "generate.sh";

/// Template default replaced by the supplied dtest fork URL.
pub const DEFAULT_DTEST_REPO: &str = "https://github.com/apache/cassandra-dtest.git";
/// Template default replaced by `DTEST_BRANCH: <branch>`.
pub const DEFAULT_DTEST_BRANCH_MARKER: &str = "DTEST_BRANCH: trunk";
/// Placeholder filled with the repeated test identifier.
pub const REPEATED_TEST_MARKER: &str = "REPEATED_DTEST_NAME:";
/// Flag literal flipped when the variant runs with vnodes.
pub const VNODES_FLAG_OFF: &str = "REPEATED_DTEST_VNODES: false";
pub const VNODES_FLAG_ON: &str = "REPEATED_DTEST_VNODES: true";

/// One keyed find/replace rule.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub name: &'static str,
    pub from: String,
    pub to: String,
}

impl Substitution {
    pub fn new(name: &'static str, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name,
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Apply substitutions to `path` in place. Returns true when the file content
/// changed. A rule whose replacement is already present is skipped, so
/// re-editing a branch that was edited earlier in the run (local mode builds
/// both topologies on the same branch state) cannot stack values onto a
/// marker. Markers absent from the file are logged and skipped.
pub fn apply_substitutions(path: &Path, subs: &[Substitution]) -> Result<bool, CiError> {
    let original = fs::read_to_string(path)?;
    let mut content = original.clone();
    let use_err = color_enabled_stderr();
    for sub in subs {
        if content.contains(&sub.to) {
            continue;
        }
        if !content.contains(&sub.from) {
            log_warn_stderr(
                use_err,
                &format!(
                    "dtest-ci: warning: marker for {} not found in {} (template changed?)",
                    sub.name,
                    path.display()
                ),
            );
            continue;
        }
        content = content.replace(&sub.from, &sub.to);
    }
    if content == original {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_template(dir: &Path) -> std::path::PathBuf {
        let p = dir.join(CONFIG_FILE);
        fs::write(
            &p,
            format!(
                "env:\n  DTEST_REPO: {DEFAULT_DTEST_REPO}\n  {DEFAULT_DTEST_BRANCH_MARKER}\n  {REPEATED_TEST_MARKER}\n"
            ),
        )
        .unwrap();
        p
    }

    #[test]
    fn test_apply_substitutions_rewrites_markers() {
        let td = tempfile::tempdir().expect("tmpdir");
        let p = write_template(td.path());
        let changed = apply_substitutions(
            &p,
            &[
                Substitution::new(
                    "dtest repo",
                    DEFAULT_DTEST_REPO,
                    "https://github.com/k-rus/cassandra-dtest.git",
                ),
                Substitution::new(
                    "dtest branch",
                    DEFAULT_DTEST_BRANCH_MARKER,
                    "DTEST_BRANCH: cass-100",
                ),
                Substitution::new(
                    "repeated test",
                    REPEATED_TEST_MARKER,
                    format!("{REPEATED_TEST_MARKER} pkg/test.py::case"),
                ),
            ],
        )
        .expect("apply");
        assert!(changed);
        let out = fs::read_to_string(&p).unwrap();
        assert!(out.contains("k-rus/cassandra-dtest"));
        assert!(out.contains("DTEST_BRANCH: cass-100"));
        assert!(out.contains("REPEATED_DTEST_NAME: pkg/test.py::case"));
        assert!(!out.contains(DEFAULT_DTEST_REPO));
    }

    #[test]
    fn test_reapplying_substitutions_does_not_stack_values() {
        let td = tempfile::tempdir().expect("tmpdir");
        let p = write_template(td.path());
        let subs = [Substitution::new(
            "repeated test",
            REPEATED_TEST_MARKER,
            format!("{REPEATED_TEST_MARKER} pkg/test.py::case"),
        )];
        assert!(apply_substitutions(&p, &subs).expect("first apply"));
        let changed_again = apply_substitutions(&p, &subs).expect("second apply");
        assert!(!changed_again, "second apply must be a no-op");
        let out = fs::read_to_string(&p).unwrap();
        assert_eq!(
            out.matches("pkg/test.py::case").count(),
            1,
            "value must not be duplicated: {out}"
        );
    }

    #[test]
    fn test_missing_marker_is_a_silent_no_op_for_content() {
        let td = tempfile::tempdir().expect("tmpdir");
        let p = td.path().join(CONFIG_FILE);
        fs::write(&p, "jobs: {}\n").unwrap();
        let changed = apply_substitutions(
            &p,
            &[Substitution::new(
                "dtest repo",
                DEFAULT_DTEST_REPO,
                "https://example.com/fork.git",
            )],
        )
        .expect("apply");
        assert!(!changed, "file without markers must stay untouched");
        assert_eq!(fs::read_to_string(&p).unwrap(), "jobs: {}\n");
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let td = tempfile::tempdir().expect("tmpdir");
        let err = apply_substitutions(&td.path().join("nope.yml"), &[]).unwrap_err();
        assert!(matches!(err, CiError::Io(_)));
    }
}
