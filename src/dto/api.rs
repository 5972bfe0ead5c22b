//! DTOs exposed by the JSON API endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::LeadView;
use crate::domain::types::TaskId;

/// Query parameters accepted by `GET /api/v1/leads`.
#[derive(Debug, Default, Deserialize)]
pub struct LeadsQuery {
    #[serde(default)]
    pub view: LeadView,
}

/// Body of `POST /api/v1/reminders`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub lead_id: String,
    /// Directory object id of the user the task is assigned to.
    pub user_id: String,
    /// Defaults to the time the request is processed.
    pub due_date: Option<DateTime<Utc>>,
    /// Link written into the task description; defaults to the leads page.
    pub context_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub status: &'static str,
    pub task_id: TaskId,
}

impl ReminderResponse {
    pub fn succeeded(task_id: TaskId) -> Self {
        Self {
            status: "succeeded",
            task_id,
        }
    }
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    /// Set when retrying may succeed because the failure was a lost update race.
    pub conflict: bool,
}
