//! Reminder session state machine.
//!
//! A session moves `Idle → Provisioning → CreatingTask → Annotating` and ends
//! in `Succeeded` or `Failed`. Opening or closing the dialog starts a new
//! generation; results of a run that belongs to an older generation are
//! dropped instead of overwriting the fresher state.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::domain::reminder::{ReminderLead, ReminderTarget};
use crate::domain::types::{TaskId, UserId};
use crate::planner::PlannerGateway;
use crate::services::errors::ReminderError;
use crate::services::provisioning::{ensure_bucket, ensure_group, ensure_plan};
use crate::services::tasks::{annotate, create_task};

/// Source of the current time, used for the default due date.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReminderStage {
    Idle,
    Provisioning,
    CreatingTask,
    Annotating { task_id: TaskId },
    Succeeded { task_id: TaskId },
    Failed(ReminderError),
}

/// Snapshot of one reminder session as the UI sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderSessionState {
    pub lead: Option<ReminderLead>,
    pub dialog_visible: bool,
    pub due_date: DateTime<Utc>,
    pub stage: ReminderStage,
    generation: u64,
}

impl ReminderSessionState {
    fn new(due_date: DateTime<Utc>) -> Self {
        Self {
            lead: None,
            dialog_visible: false,
            due_date,
            stage: ReminderStage::Idle,
            generation: 0,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self.stage,
            ReminderStage::Provisioning
                | ReminderStage::CreatingTask
                | ReminderStage::Annotating { .. }
        )
    }

    pub fn error(&self) -> Option<&ReminderError> {
        match &self.stage {
            ReminderStage::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// How a pipeline run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReminderOutcome {
    Succeeded(TaskId),
    Failed(ReminderError),
    /// The session was closed or reopened while the run was in flight.
    Discarded,
}

pub struct ReminderOrchestrator<P, C = SystemClock> {
    planner: P,
    clock: C,
    session: Mutex<ReminderSessionState>,
}

impl<P: PlannerGateway> ReminderOrchestrator<P> {
    pub fn new(planner: P) -> Self {
        Self::with_clock(planner, SystemClock)
    }
}

impl<P: PlannerGateway, C: Clock> ReminderOrchestrator<P, C> {
    pub fn with_clock(planner: P, clock: C) -> Self {
        let session = Mutex::new(ReminderSessionState::new(clock.now()));
        Self {
            planner,
            clock,
            session,
        }
    }

    fn session(&self) -> MutexGuard<'_, ReminderSessionState> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ReminderSessionState {
        self.session().clone()
    }

    /// Shows the dialog for `lead`, discarding whatever the previous session held.
    pub fn open(&self, lead: ReminderLead) {
        let now = self.clock.now();
        let mut session = self.session();
        session.generation += 1;
        session.lead = Some(lead);
        session.dialog_visible = true;
        session.due_date = now;
        session.stage = ReminderStage::Idle;
    }

    /// Hides the dialog. A run still in flight completes remotely but its
    /// result is no longer applied.
    pub fn close(&self) {
        let now = self.clock.now();
        let mut session = self.session();
        if session.is_in_progress() {
            log::warn!("Reminder dialog closed while a run was in progress");
        }
        session.generation += 1;
        session.lead = None;
        session.dialog_visible = false;
        session.due_date = now;
        session.stage = ReminderStage::Idle;
    }

    pub fn set_due_date(&self, due: DateTime<Utc>) -> Result<(), ReminderError> {
        let mut session = self.session();
        if session.is_in_progress() {
            return Err(ReminderError::InvalidSession(
                "due date cannot change while the reminder is being created".to_string(),
            ));
        }
        session.due_date = due;
        Ok(())
    }

    /// Runs provisioning, task creation and annotation for the open lead.
    ///
    /// `Err` is returned only when the session cannot start a run; pipeline
    /// failures come back as [`ReminderOutcome::Failed`] and are also kept in
    /// the session state.
    pub async fn confirm(&self, assignee: &UserId) -> Result<ReminderOutcome, ReminderError> {
        let (generation, lead, due) = {
            let mut session = self.session();
            if !session.dialog_visible {
                return Err(ReminderError::InvalidSession(
                    "reminder dialog is not open".to_string(),
                ));
            }
            let Some(lead) = session.lead.clone() else {
                return Err(ReminderError::InvalidSession(
                    "no lead is selected".to_string(),
                ));
            };
            if session.is_in_progress() {
                return Err(ReminderError::InvalidSession(
                    "a reminder is already being created".to_string(),
                ));
            }
            if matches!(session.stage, ReminderStage::Succeeded { .. }) {
                return Err(ReminderError::InvalidSession(
                    "reminder was already created; reopen the dialog for another".to_string(),
                ));
            }
            session.stage = ReminderStage::Provisioning;
            (session.generation, lead, session.due_date)
        };
        log::info!("Creating reminder for lead {}", lead.lead_id);

        let target = match self.provision(generation, assignee).await {
            Ok(Some(target)) => target,
            Ok(None) => return Ok(ReminderOutcome::Discarded),
            Err(e) => return Ok(self.finish(generation, Err(e))),
        };
        if !self.advance(generation, ReminderStage::CreatingTask) {
            return Ok(ReminderOutcome::Discarded);
        }

        let task_id = match create_task(&self.planner, &target, &lead.title, assignee, due).await {
            Ok(task_id) => task_id,
            Err(e) => return Ok(self.finish(generation, Err(e))),
        };
        let annotating = ReminderStage::Annotating {
            task_id: task_id.clone(),
        };
        if !self.advance(generation, annotating) {
            return Ok(ReminderOutcome::Discarded);
        }

        let result = annotate(&self.planner, &task_id, lead.context_url.as_str())
            .await
            .map(|()| task_id);
        Ok(self.finish(generation, result))
    }

    /// Re-runs only the annotate step after a concurrency conflict, with a
    /// fresh read of the version tag.
    pub async fn retry_annotation(&self) -> Result<ReminderOutcome, ReminderError> {
        let (generation, task_id, lead) = {
            let mut session = self.session();
            let task_id = match &session.stage {
                ReminderStage::Failed(ReminderError::ConcurrencyConflict { task_id }) => {
                    task_id.clone()
                }
                _ => {
                    return Err(ReminderError::InvalidSession(
                        "only a concurrency conflict can be retried".to_string(),
                    ));
                }
            };
            let Some(lead) = session.lead.clone() else {
                return Err(ReminderError::InvalidSession(
                    "no lead is selected".to_string(),
                ));
            };
            session.stage = ReminderStage::Annotating {
                task_id: task_id.clone(),
            };
            (session.generation, task_id, lead)
        };
        log::info!("Retrying description of task {task_id}");

        let result = annotate(&self.planner, &task_id, lead.context_url.as_str())
            .await
            .map(|()| task_id);
        Ok(self.finish(generation, result))
    }

    /// Resolves group, plan and bucket, stopping between levels once the
    /// session has moved on. `None` means the run was superseded.
    async fn provision(
        &self,
        generation: u64,
        owner: &UserId,
    ) -> Result<Option<ReminderTarget>, ReminderError> {
        let group_id = ensure_group(&self.planner, owner).await?;
        if !self.is_current(generation) {
            return Ok(None);
        }
        let plan_id = ensure_plan(&self.planner, &group_id).await?;
        if !self.is_current(generation) {
            return Ok(None);
        }
        let bucket_id = ensure_bucket(&self.planner, &plan_id).await?;
        Ok(Some(ReminderTarget {
            group_id,
            plan_id,
            bucket_id,
        }))
    }

    fn is_current(&self, generation: u64) -> bool {
        let current = self.session().generation == generation;
        if !current {
            log::warn!("Stopping superseded reminder run");
        }
        current
    }

    /// Moves to `stage` unless the session moved on; returns whether it did.
    fn advance(&self, generation: u64, stage: ReminderStage) -> bool {
        let mut session = self.session();
        if session.generation != generation {
            log::warn!("Discarding result of a superseded reminder run");
            return false;
        }
        log::info!("Reminder stage: {stage:?}");
        session.stage = stage;
        true
    }

    fn finish(&self, generation: u64, result: Result<TaskId, ReminderError>) -> ReminderOutcome {
        let (stage, outcome) = match result {
            Ok(task_id) => (
                ReminderStage::Succeeded {
                    task_id: task_id.clone(),
                },
                ReminderOutcome::Succeeded(task_id),
            ),
            Err(err) => (
                ReminderStage::Failed(err.clone()),
                ReminderOutcome::Failed(err),
            ),
        };
        if self.advance(generation, stage) {
            outcome
        } else {
            ReminderOutcome::Discarded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::domain::reminder::{NewReminderTask, TaskDetails, TaskDetailsPatch};
    use crate::domain::types::{ContextUrl, LeadTitle, ResourceId, VersionTag};
    use crate::planner::errors::{PlannerError, PlannerResult};
    use crate::planner::memory::{InMemoryPlanner, PlannerOperation};
    use crate::planner::{
        NewResource, PlannerReader, PlannerWriter, ResourceLevel, ResourceQuery,
    };

    const USER: &str = "6e7b768e-07e2-4810-8459-485f84f8f204";

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn opened_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap()
    }

    fn lead(id: &str, title: &str) -> ReminderLead {
        ReminderLead {
            lead_id: id.to_string(),
            title: LeadTitle::new(title).unwrap(),
            context_url: ContextUrl::new("https://crm.example.com/leads").unwrap(),
        }
    }

    fn user() -> UserId {
        UserId::new(USER).unwrap()
    }

    fn orchestrator(
        planner: InMemoryPlanner,
    ) -> ReminderOrchestrator<InMemoryPlanner, FixedClock> {
        ReminderOrchestrator::with_clock(planner, FixedClock(opened_at()))
    }

    #[test]
    fn open_resets_to_idle_with_due_date_now() {
        let orchestrator = orchestrator(InMemoryPlanner::new());

        orchestrator.open(lead("1", "Acme Renewal"));

        let state = orchestrator.state();
        assert!(state.dialog_visible);
        assert_eq!(state.stage, ReminderStage::Idle);
        assert_eq!(state.due_date, opened_at());
        assert_eq!(state.lead.unwrap().lead_id, "1");
    }

    #[tokio::test]
    async fn confirm_runs_every_stage_and_succeeds() {
        let planner = InMemoryPlanner::new();
        let orchestrator = orchestrator(planner.clone());
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        orchestrator.open(lead("1", "Acme Renewal"));
        orchestrator.set_due_date(due).unwrap();

        let outcome = orchestrator.confirm(&user()).await.unwrap();

        let tasks = planner.tasks();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(outcome, ReminderOutcome::Succeeded(task.id.clone()));
        assert_eq!(
            orchestrator.state().stage,
            ReminderStage::Succeeded {
                task_id: task.id.clone()
            }
        );
        assert_eq!(task.payload["title"], json!("Review lead Acme Renewal"));
        assert_eq!(task.payload["dueDateTime"], json!("2024-06-01T00:00:00.000Z"));
        assert_eq!(
            task.payload["assignments"][USER],
            json!({
                "@odata.type": "#microsoft.graph.plannerAssignment",
                "orderHint": " !"
            })
        );
        assert_eq!(
            task.description.as_deref(),
            Some("https://crm.example.com/leads")
        );
        assert_eq!(
            planner.operations().last(),
            Some(&PlannerOperation::UpdateTaskDetails)
        );
    }

    #[tokio::test]
    async fn provisioning_failure_skips_task_creation() {
        let planner = InMemoryPlanner::new();
        planner.fail_next(
            PlannerOperation::FindResources(ResourceLevel::Group),
            PlannerError::Transport("offline".to_string()),
        );
        let orchestrator = orchestrator(planner.clone());
        orchestrator.open(lead("1", "Acme Renewal"));

        let outcome = orchestrator.confirm(&user()).await.unwrap();

        assert!(matches!(
            outcome,
            ReminderOutcome::Failed(ReminderError::ProvisioningFailed {
                level: ResourceLevel::Group,
                ..
            })
        ));
        assert!(orchestrator.state().error().is_some());
        assert!(
            !planner
                .operations()
                .contains(&PlannerOperation::CreateTask)
        );
    }

    #[tokio::test]
    async fn conflict_fails_without_retry_until_asked() {
        let planner = InMemoryPlanner::new();
        planner.fail_next(
            PlannerOperation::UpdateTaskDetails,
            PlannerError::PreconditionFailed,
        );
        let orchestrator = orchestrator(planner.clone());
        orchestrator.open(lead("1", "Acme Renewal"));

        let outcome = orchestrator.confirm(&user()).await.unwrap();

        let task_id = planner.tasks()[0].id.clone();
        assert_eq!(
            outcome,
            ReminderOutcome::Failed(ReminderError::ConcurrencyConflict {
                task_id: task_id.clone()
            })
        );
        let updates = planner
            .operations()
            .into_iter()
            .filter(|op| *op == PlannerOperation::UpdateTaskDetails)
            .count();
        assert_eq!(updates, 1);

        let retried = orchestrator.retry_annotation().await.unwrap();

        assert_eq!(retried, ReminderOutcome::Succeeded(task_id));
        assert_eq!(planner.tasks().len(), 1);
        assert!(planner.tasks()[0].description.is_some());
    }

    #[tokio::test]
    async fn confirm_is_rejected_without_an_open_dialog_or_after_success() {
        let orchestrator = orchestrator(InMemoryPlanner::new());

        let closed = orchestrator.confirm(&user()).await;
        assert!(matches!(closed, Err(ReminderError::InvalidSession(_))));

        orchestrator.open(lead("1", "Acme Renewal"));
        orchestrator.confirm(&user()).await.unwrap();
        let again = orchestrator.confirm(&user()).await;

        assert!(matches!(again, Err(ReminderError::InvalidSession(_))));
        assert!(matches!(
            orchestrator.state().stage,
            ReminderStage::Succeeded { .. }
        ));
    }

    #[tokio::test]
    async fn retry_is_only_allowed_after_a_conflict() {
        let orchestrator = orchestrator(InMemoryPlanner::new());
        orchestrator.open(lead("1", "Acme Renewal"));

        let result = orchestrator.retry_annotation().await;

        assert!(matches!(result, Err(ReminderError::InvalidSession(_))));
        assert_eq!(orchestrator.state().stage, ReminderStage::Idle);
    }

    #[tokio::test]
    async fn reopening_creates_a_new_task_and_reuses_resources() {
        let planner = InMemoryPlanner::new();
        let orchestrator = orchestrator(planner.clone());

        orchestrator.open(lead("1", "Acme Renewal"));
        orchestrator.confirm(&user()).await.unwrap();
        orchestrator.close();
        assert_eq!(orchestrator.state().stage, ReminderStage::Idle);
        orchestrator.open(lead("1", "Acme Renewal"));
        orchestrator.confirm(&user()).await.unwrap();

        assert_eq!(planner.tasks().len(), 2);
        assert_eq!(planner.resources(ResourceLevel::Group).len(), 1);
        assert_eq!(planner.resources(ResourceLevel::Bucket).len(), 1);
    }

    /// Holds the first group lookup open until released.
    struct HeldPlanner {
        inner: InMemoryPlanner,
        held: AtomicBool,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl PlannerReader for HeldPlanner {
        async fn find_resources(&self, query: &ResourceQuery) -> PlannerResult<Vec<ResourceId>> {
            if !self.held.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.find_resources(query).await
        }

        async fn get_task_details(&self, task_id: &TaskId) -> PlannerResult<TaskDetails> {
            self.inner.get_task_details(task_id).await
        }
    }

    #[async_trait]
    impl PlannerWriter for HeldPlanner {
        async fn create_resource(&self, resource: &NewResource) -> PlannerResult<ResourceId> {
            self.inner.create_resource(resource).await
        }

        async fn create_task(&self, task: &NewReminderTask) -> PlannerResult<TaskId> {
            self.inner.create_task(task).await
        }

        async fn update_task_details(
            &self,
            task_id: &TaskId,
            version: &VersionTag,
            patch: &TaskDetailsPatch,
        ) -> PlannerResult<()> {
            self.inner.update_task_details(task_id, version, patch).await
        }
    }

    #[tokio::test]
    async fn results_of_a_superseded_run_are_discarded() {
        let inner = InMemoryPlanner::new();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let planner = HeldPlanner {
            inner: inner.clone(),
            held: AtomicBool::new(false),
            entered: entered.clone(),
            release: release.clone(),
        };
        let orchestrator = ReminderOrchestrator::with_clock(planner, FixedClock(opened_at()));
        orchestrator.open(lead("1", "Acme Renewal"));

        let user = user();
        let (outcome, ()) = tokio::join!(orchestrator.confirm(&user), async {
            entered.notified().await;
            assert_eq!(orchestrator.state().stage, ReminderStage::Provisioning);
            orchestrator.open(lead("2", "Globex Expansion"));
            release.notify_one();
        });

        assert_eq!(outcome.unwrap(), ReminderOutcome::Discarded);
        let state = orchestrator.state();
        assert_eq!(state.stage, ReminderStage::Idle);
        assert_eq!(state.lead.unwrap().lead_id, "2");
        assert_eq!(
            inner.operations(),
            vec![
                PlannerOperation::FindResources(ResourceLevel::Group),
                PlannerOperation::CreateResource(ResourceLevel::Group),
            ]
        );
    }

    /// Bumps the task's version tag right after handing out its details.
    struct RacingPlanner {
        inner: InMemoryPlanner,
    }

    #[async_trait]
    impl PlannerReader for RacingPlanner {
        async fn find_resources(&self, query: &ResourceQuery) -> PlannerResult<Vec<ResourceId>> {
            self.inner.find_resources(query).await
        }

        async fn get_task_details(&self, task_id: &TaskId) -> PlannerResult<TaskDetails> {
            let details = self.inner.get_task_details(task_id).await?;
            self.inner.touch_task(task_id)?;
            Ok(details)
        }
    }

    #[async_trait]
    impl PlannerWriter for RacingPlanner {
        async fn create_resource(&self, resource: &NewResource) -> PlannerResult<ResourceId> {
            self.inner.create_resource(resource).await
        }

        async fn create_task(&self, task: &NewReminderTask) -> PlannerResult<TaskId> {
            self.inner.create_task(task).await
        }

        async fn update_task_details(
            &self,
            task_id: &TaskId,
            version: &VersionTag,
            patch: &TaskDetailsPatch,
        ) -> PlannerResult<()> {
            self.inner.update_task_details(task_id, version, patch).await
        }
    }

    #[tokio::test]
    async fn concurrent_edit_between_read_and_patch_is_a_conflict() {
        let inner = InMemoryPlanner::new();
        let planner = RacingPlanner {
            inner: inner.clone(),
        };
        let orchestrator = ReminderOrchestrator::with_clock(planner, FixedClock(opened_at()));
        orchestrator.open(lead("1", "Acme Renewal"));

        let outcome = orchestrator.confirm(&user()).await.unwrap();

        let tasks = inner.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(
            outcome,
            ReminderOutcome::Failed(ReminderError::ConcurrencyConflict {
                task_id: tasks[0].id.clone()
            })
        );
        assert!(orchestrator.state().error().unwrap().is_conflict());
        assert_eq!(tasks[0].description, None);
    }
}
