use super::{GenerationOptions, ImageProvider, JobState, JobStatus, Quota};
use crate::constants::{OUTPUT_FORMAT, PROVIDER_MODEL};
use crate::errors::Error;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Kie.ai job API (`createTask` + `recordInfo`)
#[derive(Debug)]
pub struct KieClient {
    api_key: String,
    base_url: String,
    http: Client,
}

/// Common response wrapper: `{code, msg, data}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskData {
    task_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordInfoData {
    state: String,
    #[serde(default)]
    result_json: Option<String>,
    #[serde(default)]
    fail_msg: Option<String>,
    #[serde(default)]
    cost_time: Option<u64>,
    #[serde(default)]
    complete_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultPayload {
    #[serde(default)]
    result_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    remaining: Option<f64>,
    used: Option<f64>,
    limit: Option<f64>,
}

impl KieClient {
    /// Creates a client for the given API key and base URL
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ImageProvider for KieClient {
    async fn submit(&self, prompt: &str, options: &GenerationOptions) -> Result<String, Error> {
        let mut body = json!({
            "model": PROVIDER_MODEL,
            "input": {
                "prompt": prompt,
                "image_input": options.image_input,
                "aspect_ratio": options.aspect_ratio,
                "resolution": options.resolution,
                "output_format": OUTPUT_FORMAT,
            }
        });
        if let Some(callback) = &options.callback_url {
            body["callBackUrl"] = json!(callback);
        }

        info!("Creating {} job", PROVIDER_MODEL);
        let res = self
            .http
            .post(self.endpoint("/api/v1/jobs/createTask"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Submission(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Submission(format!("HTTP {}: {}", status, text)));
        }

        let envelope: Envelope<CreateTaskData> = res
            .json()
            .await
            .map_err(|e| Error::Submission(format!("malformed response: {}", e)))?;
        if envelope.code != 200 {
            return Err(Error::Submission(envelope_message(&envelope)));
        }
        let data = envelope
            .data
            .ok_or_else(|| Error::Submission("response has no job id".to_string()))?;

        debug!("Provider accepted job {}", data.task_id);
        Ok(data.task_id)
    }

    async fn query_status(&self, job_id: &str) -> Result<JobStatus, Error> {
        let res = self
            .http
            .get(self.endpoint("/api/v1/jobs/recordInfo"))
            .query(&[("taskId", job_id)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::Query {
                message: e.to_string(),
                transient: true,
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Query {
                message: format!("HTTP {}: {}", status, text),
                transient: is_transient_code(i64::from(status.as_u16())),
            });
        }

        let envelope: Envelope<RecordInfoData> = res.json().await.map_err(|e| Error::Query {
            message: format!("malformed response: {}", e),
            transient: true,
        })?;
        if envelope.code != 200 {
            return Err(Error::Query {
                message: envelope_message(&envelope),
                transient: is_transient_code(envelope.code),
            });
        }
        let data = envelope.data.ok_or_else(|| Error::Query {
            message: "response has no job record".to_string(),
            transient: true,
        })?;

        job_status_from_record(data)
    }

    async fn check_quota(&self) -> Option<Quota> {
        let res = match self
            .http
            .get(self.endpoint("/usage"))
            .bearer_auth(&self.api_key)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                error!("Failed to fetch quota: {}", e);
                return None;
            }
        };

        // The job API has no documented usage endpoint; a 404 is expected.
        if res.status() == StatusCode::NOT_FOUND {
            return None;
        }
        if !res.status().is_success() {
            error!("Failed to fetch quota: HTTP {}", res.status());
            return None;
        }

        match res.json::<UsageData>().await {
            Ok(usage) => Some(Quota {
                remaining: usage.remaining,
                used: usage.used,
                limit: usage.limit,
            }),
            Err(e) => {
                error!("Failed to parse quota: {}", e);
                None
            }
        }
    }
}

fn envelope_message<T>(envelope: &Envelope<T>) -> String {
    format!(
        "code {}: {}",
        envelope.code,
        envelope.msg.as_deref().unwrap_or("no message")
    )
}

/// Client errors are permanent, except timeouts and rate limiting
fn is_transient_code(code: i64) -> bool {
    !(400..500).contains(&code) || code == 408 || code == 429
}

/// Converts a job record; an unreadable `resultJson` is a transient query error
fn job_status_from_record(data: RecordInfoData) -> Result<JobStatus, Error> {
    let result_urls = match data.result_json.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => serde_json::from_str::<ResultPayload>(raw)
            .map_err(|e| Error::Query {
                message: format!("malformed resultJson: {}", e),
                transient: true,
            })?
            .result_urls,
        None => Vec::new(),
    };

    Ok(JobStatus {
        state: JobState::parse(&data.state),
        result_urls,
        fail_reason: data.fail_msg.filter(|m| !m.is_empty()),
        cost_time_ms: data.cost_time,
        complete_time: data.complete_time,
    })
}
