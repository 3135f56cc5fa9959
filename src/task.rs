use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    error::ApiError,
    http::{ApiRequest, Transport},
    poll::{PollOutcome, PollSchedule, poll_until},
};

/// The id of a bulk update task. The console sends a number, but it's only
/// ever put back into a URL so it's kept as text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::String(id) => Some(TaskId(id)),
            Value::Number(id) => Some(TaskId(id.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TaskStatus {
    Completed,
    Failed,
    /// Anything else means the task is still going.
    Other(String),
}

impl From<&str> for TaskStatus {
    fn from(status: &str) -> Self {
        match status {
            "COMPLETED" => TaskStatus::Completed,
            "FAILED" => TaskStatus::Failed,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskState {
    Completed,
    Failed,
    /// We gave up polling. The task may still finish on its own.
    TimedOut,
}

/// Ask the console for the status of a task. `None` if the request failed or
/// the response didn't say.
pub async fn check_task_status(transport: &impl Transport, task_id: &TaskId) -> Option<TaskStatus> {
    let request = ApiRequest::get(format!(
        "/api/reference_data_collections/set_bulk_update_tasks/{task_id}"
    ));

    let res = async {
        #[derive(Deserialize)]
        struct Task {
            status: Option<String>,
        }

        let task: Task = transport.send(request).await?.json()?;
        task.status.ok_or(ApiError::MissingField("status"))
    }
    .await;

    match res {
        Ok(status) => {
            info!("Task status for add operation: {status}");
            Some(TaskStatus::from(status.as_str()))
        }
        Err(err) => {
            warn!("Failed to check task status: {err}");
            None
        }
    }
}

pub async fn wait_for_task_completion(
    transport: &impl Transport,
    task_id: &TaskId,
    schedule: PollSchedule,
) -> TaskState {
    let outcome = poll_until(schedule, move |_| async move {
        match check_task_status(transport, task_id).await {
            Some(TaskStatus::Completed) => Some(TaskState::Completed),
            Some(TaskStatus::Failed) => Some(TaskState::Failed),
            _ => {
                info!("Waiting for task to complete...");
                None
            }
        }
    })
    .await;

    match outcome {
        PollOutcome::Done {
            value: TaskState::Completed,
            ..
        } => {
            info!("Task completed successfully.");
            TaskState::Completed
        }
        PollOutcome::Done { value, .. } => {
            info!("Task failed.");
            value
        }
        PollOutcome::TimedOut => {
            warn!("Timeout reached. Task did not complete within the allowed time.");
            TaskState::TimedOut
        }
    }
}
