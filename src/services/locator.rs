//! Find-or-create lookup shared by every level of the provisioning chain.

use crate::domain::types::ResourceId;
use crate::planner::errors::PlannerResult;
use crate::planner::{NewResource, PlannerReader, PlannerWriter, ResourceQuery};

/// Returns the first resource matching `query`, creating it from `resource`
/// only when the query comes back empty.
///
/// Errors from either call are returned unchanged. The query and the create
/// call are not atomic: concurrent callers may both create the resource.
pub async fn locate<P>(
    planner: &P,
    query: &ResourceQuery,
    resource: &NewResource,
) -> PlannerResult<ResourceId>
where
    P: PlannerReader + PlannerWriter + ?Sized,
{
    let level = query.scope.level();

    if let Some(existing) = planner.find_resources(query).await?.into_iter().next() {
        log::debug!("Found {level} '{}' as {existing}", query.name);
        return Ok(existing);
    }

    let created = planner.create_resource(resource).await?;
    log::info!("Created {level} '{}' as {created}", resource.name());
    Ok(created)
}
