//! In-process planner used by demo mode and tests.
//!
//! Behaves like the remote system where the services can observe it: exact
//! name lookups, parent scoping, version tags that change on every mutation
//! and `If-Match` checks. Recent calls are recorded in a bounded journal.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::reminder::{NewReminderTask, TaskDetails, TaskDetailsPatch};
use crate::domain::types::{ResourceId, ResourceName, TaskId, VersionTag};
use crate::planner::errors::{PlannerError, PlannerResult};
use crate::planner::{
    NewResource, PlannerReader, PlannerWriter, ResourceLevel, ResourceQuery, ResourceScope,
};

/// Number of most recent calls kept in the journal.
pub const JOURNAL_CAPACITY: usize = 1024;

/// Kind of call issued against the planner.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PlannerOperation {
    FindResources(ResourceLevel),
    CreateResource(ResourceLevel),
    CreateTask,
    GetTaskDetails,
    UpdateTaskDetails,
}

/// Journal entry of a single call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannerCall {
    pub operation: PlannerOperation,
    /// Version tag sent with a conditional update.
    pub version: Option<VersionTag>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredResource {
    pub id: ResourceId,
    pub level: ResourceLevel,
    pub name: ResourceName,
    /// Owning group of a plan or owning plan of a bucket.
    pub parent: Option<ResourceId>,
    pub payload: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StoredTask {
    pub id: TaskId,
    pub task: NewReminderTask,
    /// Create payload exactly as it would go over the wire.
    pub payload: Value,
    pub description: Option<String>,
    pub version: VersionTag,
}

#[derive(Default)]
struct PlannerState {
    resources: Vec<StoredResource>,
    tasks: Vec<StoredTask>,
    journal: VecDeque<PlannerCall>,
    failures: HashMap<PlannerOperation, PlannerError>,
    revision: u64,
}

impl PlannerState {
    fn next_version(&mut self) -> PlannerResult<VersionTag> {
        self.revision += 1;
        Ok(VersionTag::new(format!("W/\"rev-{}\"", self.revision))?)
    }

    fn record(&mut self, operation: PlannerOperation, version: Option<VersionTag>) {
        if self.journal.len() == JOURNAL_CAPACITY {
            self.journal.pop_front();
        }
        self.journal.push_back(PlannerCall { operation, version });
    }

    /// Records the call and returns the injected failure for it, if any.
    fn enter(&mut self, operation: PlannerOperation) -> PlannerResult<()> {
        self.record(operation.clone(), None);
        match self.failures.remove(&operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn resource_exists(&self, level: ResourceLevel, id: &str) -> bool {
        self.resources
            .iter()
            .any(|r| r.level == level && r.id.as_str() == id)
    }

    fn task_mut(&mut self, task_id: &TaskId) -> PlannerResult<&mut StoredTask> {
        self.tasks
            .iter_mut()
            .find(|t| &t.id == task_id)
            .ok_or_else(|| PlannerError::NotFound(format!("task {task_id}")))
    }
}

fn new_id() -> PlannerResult<ResourceId> {
    Ok(ResourceId::new(Uuid::new_v4().to_string())?)
}

#[derive(Clone, Default)]
pub struct InMemoryPlanner {
    state: Arc<Mutex<PlannerState>>,
}

impl InMemoryPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, PlannerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: PlannerOperation, error: PlannerError) {
        self.state().failures.insert(operation, error);
    }

    /// Stores a group directly, bypassing the journal.
    pub fn seed_group(&self, name: ResourceName) -> PlannerResult<ResourceId> {
        let id = new_id()?;
        self.state().resources.push(StoredResource {
            id: id.clone(),
            level: ResourceLevel::Group,
            name,
            parent: None,
            payload: Value::Null,
        });
        Ok(id)
    }

    /// Simulates another client editing the task details.
    pub fn touch_task(&self, task_id: &TaskId) -> PlannerResult<VersionTag> {
        let mut state = self.state();
        let version = state.next_version()?;
        let task = state.task_mut(task_id)?;
        task.version = version.clone();
        Ok(version)
    }

    pub fn resources(&self, level: ResourceLevel) -> Vec<StoredResource> {
        self.state()
            .resources
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    pub fn tasks(&self) -> Vec<StoredTask> {
        self.state().tasks.clone()
    }

    pub fn journal(&self) -> Vec<PlannerCall> {
        self.state().journal.iter().cloned().collect()
    }

    pub fn operations(&self) -> Vec<PlannerOperation> {
        self.state()
            .journal
            .iter()
            .map(|call| call.operation.clone())
            .collect()
    }
}

#[async_trait]
impl PlannerReader for InMemoryPlanner {
    async fn find_resources(&self, query: &ResourceQuery) -> PlannerResult<Vec<ResourceId>> {
        let mut state = self.state();
        state.enter(PlannerOperation::FindResources(query.scope.level()))?;

        let parent = match &query.scope {
            ResourceScope::Groups => None,
            ResourceScope::GroupPlans(group_id) => Some(group_id.as_str()),
            ResourceScope::PlanBuckets(plan_id) => Some(plan_id.as_str()),
        };

        Ok(state
            .resources
            .iter()
            .filter(|r| {
                r.level == query.scope.level()
                    && r.name == query.name
                    && r.parent.as_ref().map(|p| p.as_str()) == parent
            })
            .map(|r| r.id.clone())
            .collect())
    }

    async fn get_task_details(&self, task_id: &TaskId) -> PlannerResult<TaskDetails> {
        let mut state = self.state();
        state.enter(PlannerOperation::GetTaskDetails)?;
        let task = state.task_mut(task_id)?;

        Ok(TaskDetails {
            id: task.id.clone(),
            version: task.version.clone(),
            description: task.description.clone(),
        })
    }
}

#[async_trait]
impl PlannerWriter for InMemoryPlanner {
    async fn create_resource(&self, resource: &NewResource) -> PlannerResult<ResourceId> {
        let mut state = self.state();
        state.enter(PlannerOperation::CreateResource(resource.level()))?;

        let parent = match resource {
            NewResource::Group(_) => None,
            NewResource::Plan(plan) => {
                if !state.resource_exists(ResourceLevel::Group, plan.owner.as_str()) {
                    return Err(PlannerError::NotFound(format!("group {}", plan.owner)));
                }
                Some(ResourceId::new(plan.owner.as_str())?)
            }
            NewResource::Bucket(bucket) => {
                if !state.resource_exists(ResourceLevel::Plan, bucket.plan_id.as_str()) {
                    return Err(PlannerError::NotFound(format!("plan {}", bucket.plan_id)));
                }
                Some(ResourceId::new(bucket.plan_id.as_str())?)
            }
        };

        let id = new_id()?;
        state.resources.push(StoredResource {
            id: id.clone(),
            level: resource.level(),
            name: resource.name().clone(),
            parent,
            payload: resource.payload()?,
        });
        Ok(id)
    }

    async fn create_task(&self, task: &NewReminderTask) -> PlannerResult<TaskId> {
        let mut state = self.state();
        state.enter(PlannerOperation::CreateTask)?;

        let bucket_in_plan = state.resources.iter().any(|r| {
            r.level == ResourceLevel::Bucket
                && r.id.as_str() == task.bucket_id.as_str()
                && r.parent.as_ref().map(|p| p.as_str()) == Some(task.plan_id.as_str())
        });
        if !bucket_in_plan {
            return Err(PlannerError::NotFound(format!(
                "bucket {} in plan {}",
                task.bucket_id, task.plan_id
            )));
        }

        let payload = serde_json::to_value(task)
            .map_err(|e| PlannerError::Decode(format!("Cannot encode task: {e}")))?;
        let id = TaskId::from(new_id()?);
        let version = state.next_version()?;
        state.tasks.push(StoredTask {
            id: id.clone(),
            task: task.clone(),
            payload,
            description: None,
            version,
        });
        Ok(id)
    }

    async fn update_task_details(
        &self,
        task_id: &TaskId,
        version: &VersionTag,
        patch: &TaskDetailsPatch,
    ) -> PlannerResult<()> {
        let mut state = self.state();
        state.record(PlannerOperation::UpdateTaskDetails, Some(version.clone()));
        if let Some(err) = state.failures.remove(&PlannerOperation::UpdateTaskDetails) {
            return Err(err);
        }

        let next = state.next_version()?;
        let task = state.task_mut(task_id)?;
        if &task.version != version {
            return Err(PlannerError::PreconditionFailed);
        }
        task.description = Some(patch.description.clone());
        task.version = next;
        Ok(())
    }
}
