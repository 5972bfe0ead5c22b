//! Reminder task creation and the conditional description update.

use chrono::{DateTime, Utc};

use crate::domain::reminder::{NewReminderTask, ReminderTarget, TaskDetailsPatch};
use crate::domain::types::{LeadTitle, TaskId, UserId};
use crate::planner::errors::PlannerError;
use crate::planner::{PlannerReader, PlannerWriter};
use crate::services::errors::ReminderError;

/// Creates the reminder task for a lead, assigned to `assignee` and due at `due`.
pub async fn create_task<P>(
    planner: &P,
    target: &ReminderTarget,
    lead_title: &LeadTitle,
    assignee: &UserId,
    due: DateTime<Utc>,
) -> Result<TaskId, ReminderError>
where
    P: PlannerWriter + ?Sized,
{
    let task = NewReminderTask::for_lead(target, lead_title, assignee, due);

    match planner.create_task(&task).await {
        Ok(task_id) => {
            log::info!("Created reminder task {task_id} in bucket {}", target.bucket_id);
            Ok(task_id)
        }
        Err(e) => {
            log::error!("Failed to create reminder task for '{lead_title}': {e}");
            Err(ReminderError::TaskCreationFailed(e))
        }
    }
}

/// Writes `description` into the task details.
///
/// The version tag is read right before the update and never reused. When the
/// details change in between the update is rejected and reported as a
/// conflict; nothing is retried here.
pub async fn annotate<P>(
    planner: &P,
    task_id: &TaskId,
    description: &str,
) -> Result<(), ReminderError>
where
    P: PlannerReader + PlannerWriter + ?Sized,
{
    let annotation_failed = |source: PlannerError| {
        log::error!("Failed to annotate task {task_id}: {source}");
        ReminderError::AnnotationFailed {
            task_id: task_id.clone(),
            source,
        }
    };

    let details = planner
        .get_task_details(task_id)
        .await
        .map_err(annotation_failed)?;

    let patch = TaskDetailsPatch {
        description: description.to_string(),
    };

    match planner
        .update_task_details(task_id, &details.version, &patch)
        .await
    {
        Ok(()) => Ok(()),
        Err(PlannerError::PreconditionFailed) => {
            log::warn!("Task {task_id} details changed since version {}", details.version);
            Err(ReminderError::ConcurrencyConflict {
                task_id: task_id.clone(),
            })
        }
        Err(e) => Err(annotation_failed(e)),
    }
}
