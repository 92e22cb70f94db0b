use jenkins_client::{BuildResult, ProtocolError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("job {job} has been canceled")]
    Canceled { job: String },

    #[error("build was interrupted")]
    Interrupted,

    #[error("build result is worse or equal to '{threshold}'. result = {actual}")]
    ThresholdViolation {
        threshold: BuildResult,
        actual: BuildResult,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to write console output: {0}")]
    Console(#[from] std::io::Error),
}

impl BuildError {
    pub fn reason(&self) -> FailureReason {
        match self {
            BuildError::Protocol(e) if e.is_transport() => FailureReason::IoFailure,
            BuildError::Protocol(_) => FailureReason::JenkinsFailure,
            BuildError::Canceled { .. } => FailureReason::BuildCanceled,
            BuildError::Interrupted => FailureReason::Interrupted,
            BuildError::ThresholdViolation { .. } => FailureReason::BuildFailure,
            BuildError::Configuration(_) => FailureReason::ConfigurationFailure,
            BuildError::Console(_) => FailureReason::IoFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

// ---------------------------------------------------------------------------
// FailureReason
// ---------------------------------------------------------------------------

/// Closed set of reasons a build step can fail, for callers that branch on
/// the kind of failure rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    BuildCanceled,
    BuildFailure,
    JenkinsFailure,
    Interrupted,
    IoFailure,
    ConfigurationFailure,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::BuildCanceled => "build_canceled",
            FailureReason::BuildFailure => "build_failure",
            FailureReason::JenkinsFailure => "jenkins_failure",
            FailureReason::Interrupted => "interrupted",
            FailureReason::IoFailure => "io_failure",
            FailureReason::ConfigurationFailure => "configuration_failure",
        }
    }

    /// Process exit code used by the command-line front end.
    pub fn exit_code(self) -> i32 {
        match self {
            FailureReason::ConfigurationFailure => 2,
            FailureReason::BuildCanceled => 3,
            FailureReason::BuildFailure => 4,
            FailureReason::JenkinsFailure => 5,
            FailureReason::IoFailure => 6,
            FailureReason::Interrupted => 130,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_violation_message_carries_both_results() {
        let err = BuildError::ThresholdViolation {
            threshold: BuildResult::Unstable,
            actual: BuildResult::Failure,
        };
        assert_eq!(
            err.to_string(),
            "build result is worse or equal to 'UNSTABLE'. result = FAILURE"
        );
        assert_eq!(err.reason(), FailureReason::BuildFailure);
    }

    #[test]
    fn protocol_errors_are_jenkins_failures() {
        let err = BuildError::from(ProtocolError::MissingHeader("Location"));
        assert_eq!(err.reason(), FailureReason::JenkinsFailure);
    }

    #[test]
    fn canceled_and_interrupted_are_distinct() {
        let canceled = BuildError::Canceled { job: "app".into() };
        assert_eq!(canceled.reason(), FailureReason::BuildCanceled);
        assert_eq!(canceled.to_string(), "job app has been canceled");
        assert_eq!(BuildError::Interrupted.reason(), FailureReason::Interrupted);
        assert_eq!(FailureReason::Interrupted.exit_code(), 130);
    }
}
