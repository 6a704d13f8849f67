use super::task_state::TaskStatus;
use super::vocabulary::WordList;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted record tracking one newspaper generation end-to-end.
///
/// `theme`, `title`, `prompt` and `callback_url` never change after creation.
/// Status changes go through [`Task::mark_generating`], [`Task::complete`] and
/// [`Task::fail`], which keep the terminal invariants: a completed task has a
/// `result_url` and no `error`, a failed task has an `error` and no
/// `result_url`, and `completed_at` is written once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub theme: String,
    pub title: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_list: Option<WordList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Rough duration announced to the caller, in seconds
    #[serde(default)]
    pub estimated_time: u64,
    /// Provider-reported generation time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_time_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(
        id: String,
        theme: String,
        title: String,
        prompt: String,
        callback_url: Option<String>,
        estimated_time: u64,
    ) -> Self {
        Self {
            id,
            status: TaskStatus::Processing,
            theme,
            title,
            prompt,
            style: None,
            provider_job_id: None,
            result_url: None,
            word_list: None,
            error: None,
            callback_url,
            estimated_time,
            cost_time_ms: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves a `processing` task to `generating`. Returns false if the task
    /// was not in `processing`.
    pub fn mark_generating(&mut self) -> bool {
        if self.status != TaskStatus::Processing {
            return false;
        }
        self.status = TaskStatus::Generating;
        true
    }

    /// Records a successful result. Returns false and leaves the task untouched
    /// if it is already terminal.
    pub fn complete(&mut self, result_url: String, word_list: Option<WordList>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.result_url = Some(result_url);
        self.word_list = word_list;
        self.error = None;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Records a failure. Returns false and leaves the task untouched if it is
    /// already terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.result_url = None;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Seconds between creation and the terminal transition
    pub fn duration_secs(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_seconds().max(0))
    }
}
