//! Read-only aggregates over the task table for the admin dashboard.

use super::task::Task;
use super::task_state::TaskStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: String,
    pub theme: String,
    pub title: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Formatted as `"<seconds>s"`
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskOverview {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub processing: usize,
    pub active_users: usize,
    pub list: Vec<TaskRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThemeCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// Mean seconds from creation to completion over completed tasks
    pub average_time: i64,
    pub top_themes: Vec<ThemeCount>,
}

fn count(tasks: &[Task], pred: impl Fn(TaskStatus) -> bool) -> usize {
    tasks.iter().filter(|t| pred(t.status)).count()
}

/// All tasks, newest first, with per-status counters
pub fn overview(tasks: &[Task]) -> TaskOverview {
    let mut list: Vec<TaskRow> = tasks
        .iter()
        .map(|t| TaskRow {
            id: t.id.clone(),
            theme: t.theme.clone(),
            title: t.title.clone(),
            status: t.status,
            created_at: t.created_at,
            completed_at: t.completed_at,
            duration: t.duration_secs().map(|secs| format!("{}s", secs)),
        })
        .collect();
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    TaskOverview {
        total: tasks.len(),
        completed: count(tasks, |s| s == TaskStatus::Completed),
        failed: count(tasks, |s| s == TaskStatus::Failed),
        processing: count(tasks, TaskStatus::is_active),
        active_users: 0,
        list,
    }
}

pub fn stats(tasks: &[Task]) -> TaskStats {
    let durations: Vec<i64> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .filter_map(Task::duration_secs)
        .collect();
    let average_time = if durations.is_empty() {
        0
    } else {
        let sum: i64 = durations.iter().sum();
        (sum as f64 / durations.len() as f64).round() as i64
    };

    let mut per_theme: HashMap<&str, usize> = HashMap::new();
    for task in tasks.iter().filter(|t| !t.theme.is_empty()) {
        *per_theme.entry(task.theme.as_str()).or_default() += 1;
    }
    let mut top_themes: Vec<ThemeCount> = per_theme
        .into_iter()
        .map(|(name, count)| ThemeCount {
            name: name.to_string(),
            count,
        })
        .collect();
    top_themes.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    top_themes.truncate(5);

    TaskStats {
        total: tasks.len(),
        success: count(tasks, |s| s == TaskStatus::Completed),
        failed: count(tasks, |s| s == TaskStatus::Failed),
        average_time,
        top_themes,
    }
}
