//! Validation hook for the supplied dtest repository reference.
//!
//! Injected into the run so a real reachability check can be added without
//! touching the orchestration. The default accepts everything, matching the
//! long-standing behavior of this tool.

use crate::errors::CiError;

/// Capability: validate an external (repo URL, branch) reference before use.
pub trait DtestVerifier {
    fn verify(&self, dtest_repo: &str, dtest_branch: &str) -> Result<(), CiError>;
}

/// Default verifier: accepts any reference without checking it.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl DtestVerifier for AcceptAll {
    fn verify(&self, _dtest_repo: &str, _dtest_branch: &str) -> Result<(), CiError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;
    impl DtestVerifier for RejectAll {
        fn verify(&self, repo: &str, branch: &str) -> Result<(), CiError> {
            Err(CiError::Git {
                context: format!("unreachable: {repo}#{branch}"),
            })
        }
    }

    #[test]
    fn test_accept_all_accepts_anything() {
        assert!(AcceptAll.verify("", "").is_ok());
        assert!(AcceptAll
            .verify("https://github.com/k-rus/cassandra-dtest.git", "cass-100")
            .is_ok());
    }

    #[test]
    fn test_custom_verifier_can_reject() {
        let err = RejectAll.verify("url", "br").unwrap_err();
        assert!(err.to_string().contains("unreachable"));
    }
}
