//! Run-artifact failure detection.
//!
//! A project needs recovery when its latest run artifact carries one of the
//! agent failure markers, or is missing altogether. An absent artifact
//! counts as a failure while an unreadable one does not; that asymmetry is
//! deliberate policy, carried as an explicit [`DetectorPolicy`] value.

use crate::agent::{CONNECTION_FAILURE_MARKER, RETRY_EXHAUSTED_MARKER, RUN_ARTIFACT_NAME};
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug)]
pub struct DetectorPolicy {
    /// An absent artifact after an attempt is itself a failure signal.
    pub missing_artifact_fails: bool,
    /// An unreadable-but-present artifact does not trigger destructive
    /// recovery.
    pub unreadable_artifact_fails: bool,
}

impl Default for DetectorPolicy {
    fn default() -> Self {
        DetectorPolicy {
            missing_artifact_fails: true,
            unreadable_artifact_fails: false,
        }
    }
}

/// Decide whether a project workspace needs recovery.
pub fn needs_recovery(project_dir: &Path, policy: DetectorPolicy) -> bool {
    let artifact = project_dir.join(RUN_ARTIFACT_NAME);
    if !artifact.exists() {
        return policy.missing_artifact_fails;
    }
    let content = match fs::read_to_string(&artifact) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(file = %artifact.display(), error = %err, "run artifact unreadable");
            return policy.unreadable_artifact_fails;
        }
    };
    content.contains(CONNECTION_FAILURE_MARKER) || content.contains(RETRY_EXHAUSTED_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{write_run_artifact, AgentFailure, AgentOutcome};

    #[test]
    fn missing_artifact_follows_policy() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(needs_recovery(dir.path(), DetectorPolicy::default()));
        let lenient = DetectorPolicy {
            missing_artifact_fails: false,
            unreadable_artifact_fails: false,
        };
        assert!(!needs_recovery(dir.path(), lenient));
    }

    #[test]
    fn failure_markers_trigger_recovery() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = AgentOutcome::Failure(AgentFailure::RetriesExhausted {
            attempts: 3,
            last_error: "timeout".to_string(),
        });
        write_run_artifact(dir.path(), &outcome).expect("write artifact");
        assert!(needs_recovery(dir.path(), DetectorPolicy::default()));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_artifact_follows_policy() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let artifact = dir.path().join(RUN_ARTIFACT_NAME);
        std::fs::write(&artifact, "connection error").expect("write artifact");
        std::fs::set_permissions(&artifact, std::fs::Permissions::from_mode(0o000))
            .expect("chmod");
        if std::fs::read(&artifact).is_ok() {
            // Running as root; permission bits are not enforced.
            return;
        }
        assert!(!needs_recovery(dir.path(), DetectorPolicy::default()));
        let strict = DetectorPolicy {
            missing_artifact_fails: true,
            unreadable_artifact_fails: true,
        };
        assert!(needs_recovery(dir.path(), strict));
    }

    #[test]
    fn clean_artifact_is_not_a_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outcome = AgentOutcome::Response(serde_json::json!({"status": "ok"}));
        write_run_artifact(dir.path(), &outcome).expect("write artifact");
        assert!(!needs_recovery(dir.path(), DetectorPolicy::default()));
    }
}
