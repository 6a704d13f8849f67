use crate::api::errors::{api_error, ApiError};
use crate::core::report::{self, TaskOverview, TaskStats};
use crate::core::{NewTask, TaskEngine, TaskStatus, ThemeSummary, WordList};
use crate::provider::Quota;
use axum::http::{StatusCode, Uri};
use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Custom vocabulary supplied with a request.
///
/// A flat list is taken as core words.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CustomWords {
    Flat(Vec<String>),
    Grouped(WordList),
}

impl From<CustomWords> for WordList {
    fn from(words: CustomWords) -> Self {
        match words {
            CustomWords::Grouped(words) => words,
            CustomWords::Flat(core) => WordList {
                core,
                ..WordList::default()
            },
        }
    }
}

/// Represents the request payload for generating a newspaper
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub custom_words: Option<CustomWords>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub estimated_time: u64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TaskResult {
    pub image_url: String,
    pub word_list: Option<WordList>,
    pub prompt_used: String,
}

/// Task state as seen by a polling client
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ThemesResponse {
    pub themes: Vec<ThemeSummary>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct WordsBatchRequest {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub words: Option<CustomWords>,
}

#[derive(Debug, Serialize)]
pub struct WordsBatchResponse {
    pub message: String,
    pub theme: String,
    pub added_words: WordList,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub quota: Option<Quota>,
    pub active_tasks: usize,
    pub kie_api_configured: bool,
    pub mock_image_generation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

/// Creates a newspaper task and starts generating it in the background
pub async fn generate(
    Extension(engine): Extension<Arc<TaskEngine>>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let created = engine.create_task(NewTask {
        theme: payload.theme.unwrap_or_default(),
        title: payload.title.unwrap_or_default(),
        style: payload.style,
        custom_words: payload.custom_words.map(WordList::from),
        callback_url: payload.callback_url,
    })?;

    Ok(Json(GenerateResponse {
        task_id: created.task_id,
        status: created.status,
        estimated_time: created.estimated_time,
        message: "task created and processing".to_string(),
    }))
}

/// Retrieves a task by id; the shape depends on whether it has finished
pub async fn get_task(
    Path(task_id): Path<String>,
    Extension(engine): Extension<Arc<TaskEngine>>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = engine.get_task(&task_id)?;

    let mut response = TaskResponse {
        task_id: task.id,
        status: task.status,
        created_at: task.created_at,
        result: None,
        completed_at: None,
        error: None,
        estimated_time: None,
    };
    match task.status {
        TaskStatus::Completed => {
            response.result = task.result_url.map(|image_url| TaskResult {
                image_url,
                word_list: task.word_list,
                prompt_used: task.prompt,
            });
            response.completed_at = task.completed_at;
        }
        TaskStatus::Failed => {
            response.error = task.error;
            response.completed_at = task.completed_at;
        }
        TaskStatus::Processing | TaskStatus::Generating => {
            response.estimated_time = Some(task.estimated_time);
        }
    }

    Ok(Json(response))
}

pub async fn themes(Extension(engine): Extension<Arc<TaskEngine>>) -> Json<ThemesResponse> {
    let themes = engine.themes();
    Json(ThemesResponse {
        total: themes.len(),
        themes,
    })
}

/// Merges custom words into a theme's vocabulary, creating the theme if needed
pub async fn words_batch(
    Extension(engine): Extension<Arc<TaskEngine>>,
    Json(payload): Json<WordsBatchRequest>,
) -> Result<Json<WordsBatchResponse>, ApiError> {
    let theme = payload
        .theme
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let (theme, words) = match (theme, payload.words) {
        (Some(theme), Some(words)) => (theme, WordList::from(words)),
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "missing required fields: theme and words are required",
            ))
        }
    };

    engine.add_custom_words(&theme, &words);

    Ok(Json(WordsBatchResponse {
        message: "custom words added".to_string(),
        theme,
        added_words: words,
    }))
}

pub async fn health(Extension(engine): Extension<Arc<TaskEngine>>) -> Json<HealthResponse> {
    let quota = match engine.provider() {
        Some(provider) => provider.check_quota().await,
        None => None,
    };
    let persistence_error = engine.store().persistence_error();
    let active_tasks = engine
        .tasks()
        .iter()
        .filter(|t| t.status.is_active())
        .count();

    let status = if persistence_error.is_some() {
        HealthStatus::Unhealthy
    } else if engine.is_available() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    Json(HealthResponse {
        status,
        timestamp: Utc::now(),
        quota,
        active_tasks,
        kie_api_configured: engine.provider().is_some(),
        mock_image_generation: engine.mock_enabled(),
        persistence_error,
    })
}

pub async fn tasks_all(Extension(engine): Extension<Arc<TaskEngine>>) -> Json<TaskOverview> {
    Json(report::overview(&engine.tasks()))
}

pub async fn stats(Extension(engine): Extension<Arc<TaskEngine>>) -> Json<TaskStats> {
    Json(report::stats(&engine.tasks()))
}

/// Service index listing the public endpoints
pub async fn index() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "POST /api/v1/newspaper/generate": "create a newspaper generation task",
            "GET /api/v1/newspaper/task/:task_id": "query task status",
            "GET /api/v1/newspaper/themes": "list supported themes",
            "POST /api/v1/newspaper/words/batch": "add custom words to a theme",
            "GET /api/v1/tasks/all": "list all tasks",
            "GET /api/v1/stats": "task statistics",
            "GET /health": "health check"
        }
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "endpoint not found")
        .with_message(format!("path {} does not exist", uri.path()))
}
