use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Build number assigned by Jenkins once a queue item leaves the queue.
pub type BuildNumber = u32;

// ─── Trigger ──────────────────────────────────────────────────────────────

/// Ordered build parameters.
///
/// Keeps insertion order so the query string sent to `buildWithParameters`
/// is stable. Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(Vec<(String, String)>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = Parameters::new();
        for (k, v) in iter {
            parameters.insert(k, v);
        }
        parameters
    }
}

/// Everything needed to ask Jenkins for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTrigger {
    /// Full job name; folders are separated by `/`.
    pub job_name: String,
    pub parameters: Parameters,
    /// Remote trigger token (`authToken` on the job), sent as `token`.
    pub token: Option<String>,
}

impl BuildTrigger {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            parameters: Parameters::default(),
            token: None,
        }
    }
}

// ─── Queue ────────────────────────────────────────────────────────────────

/// Handle to a pending build request, parsed from the trigger's `Location`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueItemId(pub u64);

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `GET /queue/item/<id>/api/json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    #[serde(default)]
    pub executable: Option<Executable>,
    /// Absent while the item is still waiting; only left items carry it.
    #[serde(default)]
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
    pub number: BuildNumber,
}

// ─── Build ────────────────────────────────────────────────────────────────

/// `GET <job>/<n>/api/json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub building: bool,
    #[serde(default)]
    pub result: Option<BuildResult>,
}

/// Jenkins build result, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl BuildResult {
    pub fn all() -> &'static [BuildResult] {
        &[
            BuildResult::Success,
            BuildResult::Unstable,
            BuildResult::Failure,
            BuildResult::NotBuilt,
            BuildResult::Aborted,
        ]
    }

    /// Severity comparison used for failure thresholds only.
    pub fn is_worse_or_equal_to(self, other: BuildResult) -> bool {
        self >= other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
            BuildResult::NotBuilt => "NOT_BUILT",
            BuildResult::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown build result '{0}': expected one of SUCCESS, UNSTABLE, FAILURE, NOT_BUILT, ABORTED")]
pub struct UnknownResult(pub String);

impl std::str::FromStr for BuildResult {
    type Err = UnknownResult;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BuildResult::all()
            .iter()
            .copied()
            .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownResult(s.to_string()))
    }
}

// ─── Progressive log ──────────────────────────────────────────────────────

/// One page of `logText/progressiveText`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub content: String,
    /// Offset to request next: `X-Text-Size`, less any bytes of a split
    /// character held back for the next request.
    pub next_offset: u64,
    /// `false` while Jenkins sends `X-More-Data`.
    pub complete: bool,
}
