use thiserror::Error;

use crate::domain::types::TaskId;
use crate::lead_source::LeadSourceError;
use crate::planner::ResourceLevel;
use crate::planner::errors::PlannerError;

/// Failures of the reminder pipeline, classified by the stage that failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReminderError {
    #[error("Cannot provision the {level}: {source}")]
    ProvisioningFailed {
        level: ResourceLevel,
        source: PlannerError,
    },

    #[error("Cannot create the reminder task: {0}")]
    TaskCreationFailed(#[source] PlannerError),

    #[error("Task {task_id} was modified by someone else while adding its description")]
    ConcurrencyConflict { task_id: TaskId },

    #[error("Cannot add a description to task {task_id}: {source}")]
    AnnotationFailed { task_id: TaskId, source: PlannerError },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Reminder session cannot do that now: {0}")]
    InvalidSession(String),
}

impl ReminderError {
    /// Whether retrying only the annotate step with a fresh read may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReminderError::ConcurrencyConflict { .. })
    }

    /// Task left behind without a description, if the failure happened after creation.
    pub fn orphaned_task(&self) -> Option<&TaskId> {
        match self {
            ReminderError::ConcurrencyConflict { task_id }
            | ReminderError::AnnotationFailed { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service is not configured: {0}")]
    NotConfigured(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Type constraint violated: {0}")]
    TypeConstraint(String),

    #[error(transparent)]
    LeadSource(#[from] LeadSourceError),

    #[error(transparent)]
    Reminder(#[from] ReminderError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
