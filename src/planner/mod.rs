//! Gateway to the remote group/plan/bucket/task system.
//!
//! Reads and writes are split into two traits the same way the services
//! declare exactly what they need. [`graph::GraphPlanner`] talks to the remote
//! API, [`memory::InMemoryPlanner`] keeps everything in process.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::reminder::{
    NewBucket, NewGroup, NewPlan, NewReminderTask, TaskDetails, TaskDetailsPatch,
    UNIFIED_GROUP_TYPE,
};
use crate::domain::types::{GroupId, PlanId, ResourceId, ResourceName, TaskId, VersionTag};
use crate::planner::errors::{PlannerError, PlannerResult};

pub mod errors;
pub mod graph;
pub mod memory;
#[cfg(any(test, feature = "test-mocks"))]
pub mod mock;

/// Level of the provisioning chain a resource belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceLevel {
    Group,
    Plan,
    Bucket,
}

impl std::fmt::Display for ResourceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceLevel::Group => write!(f, "group"),
            ResourceLevel::Plan => write!(f, "plan"),
            ResourceLevel::Bucket => write!(f, "bucket"),
        }
    }
}

/// Collection a resource query runs against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceScope {
    /// Organization-wide collaborative groups.
    Groups,
    /// Plans owned by a group.
    GroupPlans(GroupId),
    /// Buckets within a plan.
    PlanBuckets(PlanId),
}

impl ResourceScope {
    pub fn level(&self) -> ResourceLevel {
        match self {
            ResourceScope::Groups => ResourceLevel::Group,
            ResourceScope::GroupPlans(_) => ResourceLevel::Plan,
            ResourceScope::PlanBuckets(_) => ResourceLevel::Bucket,
        }
    }
}

/// Exact-name lookup of a resource within a scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceQuery {
    pub scope: ResourceScope,
    pub name: ResourceName,
}

/// Quotes a value as an OData string literal.
fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl ResourceQuery {
    pub fn groups(name: ResourceName) -> Self {
        Self {
            scope: ResourceScope::Groups,
            name,
        }
    }

    pub fn plans(group_id: GroupId, name: ResourceName) -> Self {
        Self {
            scope: ResourceScope::GroupPlans(group_id),
            name,
        }
    }

    pub fn buckets(plan_id: PlanId, name: ResourceName) -> Self {
        Self {
            scope: ResourceScope::PlanBuckets(plan_id),
            name,
        }
    }

    /// Collection path relative to the API root.
    pub fn path(&self) -> String {
        match &self.scope {
            ResourceScope::Groups => "groups".to_string(),
            ResourceScope::GroupPlans(group_id) => format!("groups/{group_id}/planner/plans"),
            ResourceScope::PlanBuckets(plan_id) => format!("planner/plans/{plan_id}/buckets"),
        }
    }

    /// OData `$filter` expression selecting resources named exactly [`Self::name`].
    pub fn filter(&self) -> String {
        let name = odata_literal(self.name.as_str());
        match &self.scope {
            ResourceScope::Groups => format!(
                "groupTypes/any(c:c eq {}) and displayName eq {name}",
                odata_literal(UNIFIED_GROUP_TYPE)
            ),
            ResourceScope::GroupPlans(_) => format!("title eq {name}"),
            ResourceScope::PlanBuckets(_) => format!("name eq {name}"),
        }
    }

    /// Path with the filter and an `id`-only projection.
    pub fn path_and_query(&self) -> String {
        format!("{}?$filter={}&$select=id", self.path(), self.filter())
    }
}

/// Create payload for one level of the provisioning chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NewResource {
    Group(NewGroup),
    Plan(NewPlan),
    Bucket(NewBucket),
}

impl NewResource {
    pub fn level(&self) -> ResourceLevel {
        match self {
            NewResource::Group(_) => ResourceLevel::Group,
            NewResource::Plan(_) => ResourceLevel::Plan,
            NewResource::Bucket(_) => ResourceLevel::Bucket,
        }
    }

    pub fn name(&self) -> &ResourceName {
        match self {
            NewResource::Group(group) => &group.display_name,
            NewResource::Plan(plan) => &plan.title,
            NewResource::Bucket(bucket) => &bucket.name,
        }
    }

    /// Collection the create call is posted to.
    pub fn path(&self) -> &'static str {
        match self {
            NewResource::Group(_) => "groups",
            NewResource::Plan(_) => "planner/plans",
            NewResource::Bucket(_) => "planner/buckets",
        }
    }

    pub fn payload(&self) -> PlannerResult<Value> {
        let value = match self {
            NewResource::Group(group) => serde_json::to_value(group),
            NewResource::Plan(plan) => serde_json::to_value(plan),
            NewResource::Bucket(bucket) => serde_json::to_value(bucket),
        };
        value.map_err(|e| PlannerError::Decode(format!("Cannot encode payload: {e}")))
    }
}

#[async_trait]
pub trait PlannerReader: Send + Sync {
    /// Identifiers of every resource matching the query, in the remote system's order.
    async fn find_resources(&self, query: &ResourceQuery) -> PlannerResult<Vec<ResourceId>>;
    async fn get_task_details(&self, task_id: &TaskId) -> PlannerResult<TaskDetails>;
}

#[async_trait]
pub trait PlannerWriter: Send + Sync {
    async fn create_resource(&self, resource: &NewResource) -> PlannerResult<ResourceId>;
    async fn create_task(&self, task: &NewReminderTask) -> PlannerResult<TaskId>;
    /// Patches the task details only if they still carry `version`.
    ///
    /// Fails with [`PlannerError::PreconditionFailed`] when the details changed
    /// since the tag was read.
    async fn update_task_details(
        &self,
        task_id: &TaskId,
        version: &VersionTag,
        patch: &TaskDetailsPatch,
    ) -> PlannerResult<()>;
}

/// Full planner access, usable as a trait object.
pub trait PlannerGateway: PlannerReader + PlannerWriter {}

impl<T: PlannerReader + PlannerWriter + ?Sized> PlannerGateway for T {}

#[async_trait]
impl<T: PlannerReader + ?Sized> PlannerReader for Arc<T> {
    async fn find_resources(&self, query: &ResourceQuery) -> PlannerResult<Vec<ResourceId>> {
        (**self).find_resources(query).await
    }

    async fn get_task_details(&self, task_id: &TaskId) -> PlannerResult<TaskDetails> {
        (**self).get_task_details(task_id).await
    }
}

#[async_trait]
impl<T: PlannerWriter + ?Sized> PlannerWriter for Arc<T> {
    async fn create_resource(&self, resource: &NewResource) -> PlannerResult<ResourceId> {
        (**self).create_resource(resource).await
    }

    async fn create_task(&self, task: &NewReminderTask) -> PlannerResult<TaskId> {
        (**self).create_task(task).await
    }

    async fn update_task_details(
        &self,
        task_id: &TaskId,
        version: &VersionTag,
        patch: &TaskDetailsPatch,
    ) -> PlannerResult<()> {
        (**self).update_task_details(task_id, version, patch).await
    }
}
