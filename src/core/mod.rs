//! Core module containing the task lifecycle
//!
//! This module contains:
//! - The task record and its status machine
//! - The engine that creates tasks and runs their background jobs
//! - The poller that drives a provider job to a terminal state
//! - Callback delivery, prompt building and admin reports

mod callback;
mod engine;
mod poller;
mod prompt;
pub mod report;
mod task;
mod task_state;
mod vocabulary;

pub use callback::*;
pub use engine::*;
pub use poller::*;
pub use prompt::*;
pub use task::*;
pub use task_state::*;
pub use vocabulary::*;
