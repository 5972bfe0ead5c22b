//! [`PlannerReader`]/[`PlannerWriter`] over the Microsoft Graph REST API.

use async_trait::async_trait;
use reqwest::header::IF_MATCH;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::reminder::{NewReminderTask, TaskDetails, TaskDetailsPatch};
use crate::domain::types::{ResourceId, TaskId, VersionTag};
use crate::planner::errors::{PlannerError, PlannerResult};
use crate::planner::{NewResource, PlannerReader, PlannerWriter, ResourceQuery};

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
struct Created {
    id: ResourceId,
}

/// Graph-backed planner. Token acquisition is the caller's concern.
#[derive(Clone)]
pub struct GraphPlanner {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl GraphPlanner {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self::with_client(Client::new(), base_url, access_token)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client,
            base_url,
            access_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Turns non-success statuses into errors, keeping the response body as message.
    async fn check(response: Response) -> PlannerResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        log::error!("Planner call failed with {status}: {message}");
        Err(PlannerError::from_status(status, message))
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> PlannerResult<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PlannerReader for GraphPlanner {
    async fn find_resources(&self, query: &ResourceQuery) -> PlannerResult<Vec<ResourceId>> {
        let builder = self
            .request(Method::GET, &query.path())
            .query(&[("$filter", query.filter().as_str()), ("$select", "id")]);

        let found: Collection<Created> = Self::send_json(builder).await?;
        Ok(found.value.into_iter().map(|item| item.id).collect())
    }

    async fn get_task_details(&self, task_id: &TaskId) -> PlannerResult<TaskDetails> {
        let builder = self.request(Method::GET, &format!("planner/tasks/{task_id}/details"));
        Self::send_json(builder).await
    }
}

#[async_trait]
impl PlannerWriter for GraphPlanner {
    async fn create_resource(&self, resource: &NewResource) -> PlannerResult<ResourceId> {
        let builder = self
            .request(Method::POST, resource.path())
            .json(&resource.payload()?);

        let created: Created = Self::send_json(builder).await?;
        Ok(created.id)
    }

    async fn create_task(&self, task: &NewReminderTask) -> PlannerResult<TaskId> {
        let builder = self.request(Method::POST, "planner/tasks").json(task);

        let created: Created = Self::send_json(builder).await?;
        Ok(created.id.into())
    }

    async fn update_task_details(
        &self,
        task_id: &TaskId,
        version: &VersionTag,
        patch: &TaskDetailsPatch,
    ) -> PlannerResult<()> {
        let builder = self
            .request(Method::PATCH, &format!("planner/tasks/{task_id}/details"))
            .header(IF_MATCH, version.as_str())
            .json(patch);

        Self::check(builder.send().await?).await?;
        Ok(())
    }
}
