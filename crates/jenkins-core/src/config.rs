use std::path::Path;
use std::time::Duration;

use jenkins_client::{BuildResult, BuildTrigger, Parameters};
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};
use crate::executor::Monitoring;
use crate::properties;

// ---------------------------------------------------------------------------
// StepConfig
// ---------------------------------------------------------------------------

/// Settings of one build step, as written in a YAML config file.
///
/// ```yaml
/// job_name: platform/deploy
/// parameters: |
///   ENV=prod
///   VERSION=1.2.3
/// wait_for_build_to_finish: true
/// follow_console_output: true
/// failure_threshold: UNSTABLE
/// base_url: https://ci.example.com
/// user_id: deploy
/// api_token_path: keys/jenkins/api-token
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepConfig {
    pub job_name: Option<String>,
    /// Java properties text.
    pub parameters: String,
    pub authorization_token_path: Option<String>,
    pub wait_for_build_to_finish: bool,
    /// Seconds between polls.
    pub poll_interval: u64,
    pub log_console_output: bool,
    pub follow_console_output: bool,
    pub failure_threshold: Option<String>,
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub api_token_path: Option<String>,
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            job_name: None,
            parameters: String::new(),
            authorization_token_path: None,
            wait_for_build_to_finish: false,
            poll_interval: default_poll_interval(),
            log_console_output: false,
            follow_console_output: false,
            failure_threshold: None,
            base_url: None,
            user_id: None,
            api_token_path: None,
        }
    }
}

impl StepConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            BuildError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&data).map_err(|e| {
            BuildError::Configuration(format!("invalid config {}: {e}", path.display()))
        })
    }

    /// Check everything that can be checked without touching the network or
    /// key storage.
    pub fn validate(&self) -> Result<StepPlan> {
        let job_name = non_blank(self.job_name.as_deref())
            .ok_or_else(|| BuildError::Configuration("job_name is required".into()))?;
        let base_url = non_blank(self.base_url.as_deref())
            .ok_or_else(|| BuildError::Configuration("base_url is required".into()))?;

        let failure_threshold = match non_blank(self.failure_threshold.as_deref()) {
            Some(value) => Some(value.parse::<BuildResult>().map_err(|e| {
                BuildError::Configuration(format!("invalid failure_threshold: {e}"))
            })?),
            None => None,
        };

        let parameters = parse_parameters(&self.parameters)?;

        Ok(StepPlan {
            trigger: BuildTrigger {
                job_name: job_name.to_string(),
                parameters,
                token: None,
            },
            monitoring: Monitoring::from_flags(
                self.wait_for_build_to_finish,
                self.log_console_output,
                self.follow_console_output,
            ),
            poll_interval: Duration::from_secs(self.poll_interval),
            failure_threshold,
            base_url: base_url.to_string(),
            user_id: non_blank(self.user_id.as_deref()).map(str::to_string),
            authorization_token_path: non_blank(self.authorization_token_path.as_deref())
                .map(str::to_string),
            api_token_path: non_blank(self.api_token_path.as_deref()).map(str::to_string),
        })
    }
}

pub fn parse_parameters(text: &str) -> Result<Parameters> {
    if text.trim().is_empty() {
        return Ok(Parameters::new());
    }
    properties::parse(text)
        .map_err(|e| BuildError::Configuration(format!("unable to parse parameters: {e}")))
}

/// Trimmed, or `None` when blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// StepPlan
// ---------------------------------------------------------------------------

/// A validated [`StepConfig`]. The trigger token is filled in later from key
/// storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub trigger: BuildTrigger,
    pub monitoring: Monitoring,
    pub poll_interval: Duration,
    pub failure_threshold: Option<BuildResult>,
    pub base_url: String,
    pub user_id: Option<String>,
    pub authorization_token_path: Option<String>,
    pub api_token_path: Option<String>,
}
