//! Text-to-image provider seam.
//!
//! The engine talks to an [`ImageProvider`]; [`KieClient`] is the production
//! implementation. Providers never retry on their own, the poller owns that.

mod kie;

pub use kie::KieClient;

use crate::constants::{DEFAULT_ASPECT_RATIO, DEFAULT_RESOLUTION, NEWSPAPER_ASPECT_RATIO};
use crate::errors::Error;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;

/// Provider-side state of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    Success,
    Fail,
    /// Any state name this client does not know, treated as still pending
    Other(String),
}

impl JobState {
    pub fn parse(state: &str) -> Self {
        match state {
            "waiting" | "queued" | "queuing" => JobState::Queued,
            "generating" | "running" => JobState::Running,
            "success" => JobState::Success,
            "fail" => JobState::Fail,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Success | JobState::Fail)
    }
}

/// One observation of a provider job
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    pub result_urls: Vec<String>,
    pub fail_reason: Option<String>,
    /// Generation time in milliseconds, when reported
    pub cost_time_ms: Option<u64>,
    /// Provider completion timestamp in epoch milliseconds, when reported
    pub complete_time: Option<i64>,
}

/// Request options forwarded with a job submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub image_input: Vec<String>,
    pub aspect_ratio: String,
    pub resolution: String,
    /// Provider-side completion webhook, distinct from the task callback
    pub callback_url: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            image_input: Vec::new(),
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            resolution: DEFAULT_RESOLUTION.to_string(),
            callback_url: None,
        }
    }
}

impl GenerationOptions {
    /// Portrait A4-like poster settings
    pub fn newspaper() -> Self {
        Self {
            aspect_ratio: NEWSPAPER_ASPECT_RATIO.to_string(),
            ..Self::default()
        }
    }
}

/// Account usage as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quota {
    pub remaining: Option<f64>,
    pub used: Option<f64>,
    pub limit: Option<f64>,
}

#[async_trait]
pub trait ImageProvider: Debug + Send + Sync {
    /// Creates a job and returns the provider's job id.
    ///
    /// Fails with `Error::Submission` on a non-success status or malformed payload.
    async fn submit(&self, prompt: &str, options: &GenerationOptions) -> Result<String, Error>;

    /// Reads the current state of a job.
    ///
    /// Fails with `Error::Query`; `transient` tells whether another attempt may succeed.
    async fn query_status(&self, job_id: &str) -> Result<JobStatus, Error>;

    /// Best-effort usage probe; `None` when unsupported or unavailable
    async fn check_quota(&self) -> Option<Quota> {
        None
    }
}
