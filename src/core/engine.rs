use super::callback::CallbackNotifier;
use super::poller::{PollPolicy, Poller};
use super::prompt::{estimate_processing_time, PromptBuilder};
use super::task::Task;
use super::task_state::TaskStatus;
use super::vocabulary::WordList;
use crate::constants::{MOCK_ESTIMATED_TIME_SECS, MOCK_IMAGE_SVG};
use crate::errors::Error;
use crate::provider::{GenerationOptions, ImageProvider};
use crate::store::TaskStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

const INTERRUPTED_MESSAGE: &str = "interrupted by service restart";

/// Parameters of a generation request
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub theme: String,
    pub title: String,
    pub style: Option<String>,
    pub custom_words: Option<WordList>,
    pub callback_url: Option<String>,
}

/// What the caller gets back before any generation work happens
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedTask {
    pub task_id: String,
    pub status: TaskStatus,
    pub estimated_time: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThemeSummary {
    pub name: String,
    pub word_count: usize,
    pub sample_words: Vec<String>,
}

/// Image produced by the background job
#[derive(Debug)]
struct Generated {
    image_url: String,
    cost_time_ms: Option<u64>,
}

/// Orchestrates the task lifecycle.
///
/// `create_task` validates, persists a `processing` record and spawns exactly
/// one background job for it. The job moves the task to `generating`, obtains
/// an image from the provider (or synthesizes one in mock mode) and ends with
/// a single terminal transition, after which the callback, if any, is fired.
#[derive(Debug)]
pub struct TaskEngine {
    store: Arc<dyn TaskStore>,
    provider: Option<Arc<dyn ImageProvider>>,
    prompts: PromptBuilder,
    notifier: CallbackNotifier,
    policy: PollPolicy,
    mock: bool,
}

impl TaskEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        provider: Option<Arc<dyn ImageProvider>>,
        prompts: PromptBuilder,
        policy: PollPolicy,
        mock: bool,
    ) -> Self {
        Self {
            store,
            provider,
            prompts,
            notifier: CallbackNotifier::new(),
            policy,
            mock,
        }
    }

    pub fn store(&self) -> &dyn TaskStore {
        self.store.as_ref()
    }

    pub fn provider(&self) -> Option<&Arc<dyn ImageProvider>> {
        self.provider.as_ref()
    }

    pub fn mock_enabled(&self) -> bool {
        self.mock
    }

    /// True when tasks can be created, with a real provider or in mock mode
    pub fn is_available(&self) -> bool {
        self.provider.is_some() || self.mock
    }

    /// Registers a task and starts generating it in the background.
    ///
    /// # Errors
    ///
    /// * `Error::ProviderUnavailable` - no provider and mock mode disabled
    /// * `Error::Validation` - missing theme or title, bad callback URL, or an
    ///   unsupported theme without custom words
    pub fn create_task(self: &Arc<Self>, request: NewTask) -> Result<CreatedTask, Error> {
        if !self.is_available() {
            return Err(Error::ProviderUnavailable);
        }

        let theme = request.theme.trim();
        let title = request.title.trim();
        if theme.is_empty() || title.is_empty() {
            return Err(Error::Validation(
                "missing required fields: theme and title are required".to_string(),
            ));
        }

        let callback_url = match request.callback_url.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(validate_callback_url(raw)?),
            _ => None,
        };

        let custom_words = request.custom_words.filter(|words| !words.is_empty());
        let vocabulary = self.prompts.vocabulary();
        match &custom_words {
            Some(words) => vocabulary.add_words(theme, words),
            None if !vocabulary.contains(theme) => {
                return Err(Error::Validation(format!(
                    "unsupported theme. Supported themes: {}",
                    vocabulary.themes().join(", ")
                )));
            }
            None => {}
        }

        let prompt = self.prompts.build(theme, title)?;
        let estimated_time = if self.provider.is_some() && !self.mock {
            estimate_processing_time(&prompt)
        } else {
            MOCK_ESTIMATED_TIME_SECS
        };

        let task_id = uuid::Uuid::new_v4().to_string();
        let mut task = Task::new(
            task_id.clone(),
            theme.to_string(),
            title.to_string(),
            prompt,
            callback_url,
            estimated_time,
        );
        task.style = request.style;
        self.store.set(task);
        info!(task_id = %task_id, theme, title, "Task created");

        self.spawn_generation(task_id.clone());

        Ok(CreatedTask {
            task_id,
            status: TaskStatus::Processing,
            estimated_time,
        })
    }

    pub fn get_task(&self, task_id: &str) -> Result<Task, Error> {
        self.store
            .get(task_id)
            .ok_or_else(|| Error::NotFound(task_id.to_string()))
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.store.list()
    }

    pub fn add_custom_words(&self, theme: &str, words: &WordList) {
        self.prompts.vocabulary().add_words(theme, words);
        info!(theme, added = words.len(), "Custom words added");
    }

    pub fn themes(&self) -> Vec<ThemeSummary> {
        let vocabulary = self.prompts.vocabulary();
        vocabulary
            .themes()
            .into_iter()
            .filter_map(|name| {
                vocabulary.words(&name).map(|words| ThemeSummary {
                    word_count: words.len(),
                    sample_words: words.sample(),
                    name,
                })
            })
            .collect()
    }

    /// Picks up tasks a previous process left `processing` or `generating`.
    ///
    /// Tasks with a provider job resume polling it, and mock mode reruns them.
    /// The rest never reached the provider and fail as interrupted. Returns the
    /// number of tasks handled.
    pub fn resume_interrupted(self: &Arc<Self>) -> usize {
        let interrupted: Vec<Task> = self
            .store
            .list()
            .into_iter()
            .filter(|t| t.status.is_active())
            .collect();

        for task in &interrupted {
            let resumable =
                self.mock || (self.provider.is_some() && task.provider_job_id.is_some());
            if resumable {
                info!(
                    task_id = %task.id,
                    job_id = ?task.provider_job_id,
                    "Resuming interrupted task"
                );
                self.spawn_generation(task.id.clone());
            } else {
                self.finish(&task.id, Err(INTERRUPTED_MESSAGE.to_string()));
            }
        }
        interrupted.len()
    }

    fn spawn_generation(self: &Arc<Self>, task_id: String) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_generation(task_id).await;
        });
    }

    /// Runs the job in its own tokio task so that a panic still ends in a
    /// terminal `failed` state.
    async fn run_generation(self: Arc<Self>, task_id: String) {
        let worker = Arc::clone(&self);
        let job_task_id = task_id.clone();
        let handle = tokio::spawn(async move { worker.generate(&job_task_id).await });

        let outcome = match handle.await {
            Ok(Ok(generated)) => Ok(generated),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                error!(task_id = %task_id, "Generation job aborted: {}", message);
                Err(format!("unexpected failure: {}", message))
            }
        };

        self.finish(&task_id, outcome);
    }

    async fn generate(&self, task_id: &str) -> Result<Generated, Error> {
        let task = self
            .update(task_id, Task::mark_generating)
            .or_else(|| self.store.get(task_id))
            .ok_or_else(|| Error::NotFound(task_id.to_string()))?;

        if self.mock {
            info!(task_id, "Mock generation");
            return Ok(Generated {
                image_url: mock_image_url(),
                cost_time_ms: None,
            });
        }

        let provider = self.provider.as_ref().ok_or(Error::ProviderUnavailable)?;
        let job_id = match task.provider_job_id {
            Some(job_id) => job_id,
            None => {
                let job_id = provider
                    .submit(&task.prompt, &GenerationOptions::newspaper())
                    .await?;
                info!(task_id, job_id = %job_id, "Provider job submitted");

                self.update(task_id, |t| {
                    t.provider_job_id = Some(job_id.clone());
                    true
                });
                job_id
            }
        };

        let outcome = Poller::new(provider.as_ref(), self.policy)
            .wait_for(&job_id)
            .await?;
        Ok(Generated {
            image_url: outcome.image_url,
            cost_time_ms: outcome.cost_time_ms,
        })
    }

    /// Applies the terminal transition once and fires the callback
    fn finish(&self, task_id: &str, outcome: Result<Generated, String>) {
        let vocabulary = self.prompts.vocabulary();
        let updated = self.update(task_id, |task| match &outcome {
            Ok(generated) => {
                let words = vocabulary.words(&task.theme);
                let changed = task.complete(generated.image_url.clone(), words);
                if changed {
                    task.cost_time_ms = generated.cost_time_ms;
                }
                changed
            }
            Err(message) => task.fail(message.clone()),
        });

        let Some(task) = updated else {
            warn!(task_id, "Task missing or already terminal, result dropped");
            return;
        };

        match task.status {
            TaskStatus::Completed => info!(task_id, "Task completed"),
            _ => warn!(task_id, error = ?task.error, "Task failed"),
        }

        if let Some(url) = &task.callback_url {
            self.notifier.notify(url, &task);
        }
    }

    /// Read-modify-write through the store; only writes when `apply` reports a change
    fn update<F>(&self, task_id: &str, apply: F) -> Option<Task>
    where
        F: FnOnce(&mut Task) -> bool,
    {
        let mut task = self.store.get(task_id)?;
        if !apply(&mut task) {
            return None;
        }
        self.store.set(task.clone());
        Some(task)
    }
}

fn validate_callback_url(raw: &str) -> Result<String, Error> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Validation(format!("invalid callback_url: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        scheme => Err(Error::Validation(format!(
            "invalid callback_url: unsupported scheme {}",
            scheme
        ))),
    }
}

fn mock_image_url() -> String {
    format!(
        "data:image/svg+xml;utf8,{}",
        urlencoding::encode(MOCK_IMAGE_SVG)
    )
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "background job panicked".to_string()
    }
}
