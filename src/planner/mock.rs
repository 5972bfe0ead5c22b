//! Mock planner implementation for isolating services in tests.

use async_trait::async_trait;
use mockall::mock;

use crate::domain::reminder::{NewReminderTask, TaskDetails, TaskDetailsPatch};
use crate::domain::types::{ResourceId, TaskId, VersionTag};
use crate::planner::errors::PlannerResult;
use crate::planner::{NewResource, PlannerReader, PlannerWriter, ResourceQuery};

mock! {
    pub Planner {}

    #[async_trait]
    impl PlannerReader for Planner {
        async fn find_resources(&self, query: &ResourceQuery) -> PlannerResult<Vec<ResourceId>>;
        async fn get_task_details(&self, task_id: &TaskId) -> PlannerResult<TaskDetails>;
    }

    #[async_trait]
    impl PlannerWriter for Planner {
        async fn create_resource(&self, resource: &NewResource) -> PlannerResult<ResourceId>;
        async fn create_task(&self, task: &NewReminderTask) -> PlannerResult<TaskId>;
        async fn update_task_details(
            &self,
            task_id: &TaskId,
            version: &VersionTag,
            patch: &TaskDetailsPatch,
        ) -> PlannerResult<()>;
    }
}
