//! Entry points behind the reminder API.

use crate::domain::reminder::ReminderLead;
use crate::domain::types::{ContextUrl, TaskId, UserId};
use crate::dto::api::ReminderRequest;
use crate::lead_source::LeadSource;
use crate::planner::PlannerGateway;
use crate::services::errors::ReminderError;
use crate::services::leads::find_lead;
use crate::services::reminder::{ReminderOrchestrator, ReminderOutcome};
use crate::services::{ServiceError, ServiceResult};

/// Runs one reminder session for the requested lead and returns the new task.
///
/// `default_context_url` is used when the request carries no link of its own.
pub async fn schedule_reminder<P, S>(
    planner: P,
    source: Option<&S>,
    default_context_url: &str,
    request: ReminderRequest,
) -> ServiceResult<TaskId>
where
    P: PlannerGateway,
    S: LeadSource + ?Sized,
{
    let assignee = UserId::new(request.user_id)?;
    let context_url = ContextUrl::new(
        request
            .context_url
            .unwrap_or_else(|| default_context_url.to_string()),
    )?;

    let lead = find_lead(source, &request.lead_id).await?;

    let orchestrator = ReminderOrchestrator::new(planner);
    orchestrator.open(ReminderLead {
        lead_id: lead.id,
        title: lead.title,
        context_url,
    });
    if let Some(due) = request.due_date {
        orchestrator.set_due_date(due)?;
    }

    match orchestrator.confirm(&assignee).await? {
        ReminderOutcome::Succeeded(task_id) => Ok(task_id),
        ReminderOutcome::Failed(err) => Err(ServiceError::from(err)),
        ReminderOutcome::Discarded => Err(ReminderError::InvalidSession(
            "reminder session was superseded".to_string(),
        )
        .into()),
    }
}
