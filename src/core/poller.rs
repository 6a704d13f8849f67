use crate::constants::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_MAX_ATTEMPTS};
use crate::errors::Error;
use crate::provider::{ImageProvider, JobState};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often and how many times a job is queried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
        }
    }
}

/// Result of a job that reached `success`
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub image_url: String,
    pub result_urls: Vec<String>,
    pub cost_time_ms: Option<u64>,
    pub complete_time: Option<i64>,
    /// Number of status queries spent, including the final one
    pub attempts: u32,
}

/// Drives one provider job to a terminal state.
///
/// Each query consumes one attempt. Pending states and transient query errors
/// lead to another attempt after `interval`; `success`, `fail` and permanent
/// query errors end the loop at once. When the ceiling is reached the last
/// transient error is returned if the final attempt failed, otherwise
/// `Error::PollTimeout`.
pub struct Poller<'a> {
    provider: &'a dyn ImageProvider,
    policy: PollPolicy,
}

impl<'a> Poller<'a> {
    pub fn new(provider: &'a dyn ImageProvider, policy: PollPolicy) -> Self {
        Self { provider, policy }
    }

    pub async fn wait_for(&self, job_id: &str) -> Result<PollOutcome, Error> {
        let max_attempts = self.policy.max_attempts;
        let mut last_error: Option<Error> = None;

        for attempt in 1..=max_attempts {
            match self.provider.query_status(job_id).await {
                Ok(status) => match status.state {
                    JobState::Success => {
                        info!(
                            job_id,
                            attempt,
                            cost_time_ms = ?status.cost_time_ms,
                            "Provider job finished"
                        );
                        let image_url = status.result_urls.first().cloned().ok_or_else(|| {
                            Error::JobFailed("provider reported success without result URLs".to_string())
                        })?;
                        return Ok(PollOutcome {
                            image_url,
                            result_urls: status.result_urls,
                            cost_time_ms: status.cost_time_ms,
                            complete_time: status.complete_time,
                            attempts: attempt,
                        });
                    }
                    JobState::Fail => {
                        let reason = status
                            .fail_reason
                            .unwrap_or_else(|| "unknown reason".to_string());
                        return Err(Error::JobFailed(reason));
                    }
                    state => {
                        debug!(job_id, attempt, ?state, "Provider job still pending");
                        last_error = None;
                    }
                },
                Err(e) if e.is_transient() => {
                    warn!(
                        job_id,
                        "Status query failed (attempt {}/{}): {}", attempt, max_attempts, e
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.policy.interval).await;
            }
        }

        Err(last_error.unwrap_or(Error::PollTimeout {
            attempts: max_attempts,
        }))
    }
}
