use super::task::Task;
use super::task_state::TaskStatus;
use super::vocabulary::WordList;
use crate::constants::CALLBACK_TIMEOUT;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize, PartialEq)]
pub struct CallbackResult {
    pub image_url: String,
    pub word_list: Option<WordList>,
}

/// Body POSTed to a task's `callback_url`
#[derive(Debug, Serialize, PartialEq)]
pub struct CallbackPayload {
    pub task_id: String,
    pub status: TaskStatus,
    pub result: Option<CallbackResult>,
    pub error: Option<String>,
}

impl CallbackPayload {
    pub fn from_task(task: &Task) -> Self {
        let result = match (task.status, &task.result_url) {
            (TaskStatus::Completed, Some(url)) => Some(CallbackResult {
                image_url: url.clone(),
                word_list: task.word_list.clone(),
            }),
            _ => None,
        };
        let error = match task.status {
            TaskStatus::Failed => task.error.clone(),
            _ => None,
        };
        Self {
            task_id: task.id.clone(),
            status: task.status,
            result,
            error,
        }
    }
}

/// Best-effort, at-most-once delivery of terminal task states
#[derive(Debug, Clone)]
pub struct CallbackNotifier {
    http: Client,
}

impl Default for CallbackNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackNotifier {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(CALLBACK_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default callback client: {}", e);
                Client::new()
            });
        Self { http }
    }

    /// Spawns the delivery and returns at once. Failures are only logged.
    pub fn notify(&self, url: &str, task: &Task) {
        let http = self.http.clone();
        let url = url.to_string();
        let payload = CallbackPayload::from_task(task);
        tokio::spawn(async move {
            let task_id = payload.task_id.clone();
            match http.post(&url).json(&payload).send().await {
                Ok(res) if res.status().is_success() => {
                    info!(task_id = %task_id, "Callback delivered to {}", url);
                }
                Ok(res) => {
                    warn!(task_id = %task_id, "Callback to {} returned HTTP {}", url, res.status());
                }
                Err(e) => {
                    warn!(task_id = %task_id, "Callback to {} failed: {}", url, e);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new(
            "t-9".to_string(),
            "医院".to_string(),
            "看医生".to_string(),
            "prompt".to_string(),
            Some("http://127.0.0.1:9/hook".to_string()),
            10,
        )
    }

    #[test]
    fn completed_payload_carries_result() {
        let mut t = task();
        let words = WordList {
            core: vec!["yī shēng 医生".to_string()],
            ..WordList::default()
        };
        t.complete("https://cdn/x.png".to_string(), Some(words.clone()));

        let json = serde_json::to_value(CallbackPayload::from_task(&t)).unwrap();
        assert_eq!(json["task_id"], "t-9");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["result"]["image_url"], "https://cdn/x.png");
        assert_eq!(json["result"]["word_list"]["core"][0], "yī shēng 医生");
        assert!(json["error"].is_null());
    }

    #[test]
    fn failed_payload_carries_error() {
        let mut t = task();
        t.fail("provider job failed: quota exceeded");

        let json = serde_json::to_value(CallbackPayload::from_task(&t)).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json["result"].is_null());
        assert_eq!(json["error"], "provider job failed: quota exceeded");
    }

    #[tokio::test]
    async fn unreachable_callback_does_not_panic() {
        let mut t = task();
        t.fail("boom");
        CallbackNotifier::new().notify("http://127.0.0.1:9/hook", &t);
        tokio::task::yield_now().await;
    }
}
