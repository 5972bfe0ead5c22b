//! Resolves the group → plan → bucket chain reminders are filed under.

use crate::domain::reminder::{
    NewBucket, NewGroup, NewPlan, ReminderTarget, SALES_GROUP_NAME, SALES_PLAN_NAME,
    TODO_BUCKET_NAME,
};
use crate::domain::types::{BucketId, GroupId, PlanId, ResourceName, UserId};
use crate::planner::errors::PlannerError;
use crate::planner::{NewResource, PlannerReader, PlannerWriter, ResourceLevel, ResourceQuery};
use crate::services::errors::ReminderError;
use crate::services::locator::locate;

fn provisioning_failed(level: ResourceLevel) -> impl FnOnce(PlannerError) -> ReminderError {
    move |source| {
        log::error!("Provisioning the {level} failed: {source}");
        ReminderError::ProvisioningFailed { level, source }
    }
}

/// Finds or creates the organization-wide sales group owned by `owner`.
pub async fn ensure_group<P>(planner: &P, owner: &UserId) -> Result<GroupId, ReminderError>
where
    P: PlannerReader + PlannerWriter + ?Sized,
{
    let name = ResourceName::new(SALES_GROUP_NAME)?;
    let id = locate(
        planner,
        &ResourceQuery::groups(name.clone()),
        &NewResource::Group(NewGroup::unified(name, owner.clone())),
    )
    .await
    .map_err(provisioning_failed(ResourceLevel::Group))?;
    Ok(id.into())
}

/// Finds or creates the sales plan owned by `group_id`.
pub async fn ensure_plan<P>(planner: &P, group_id: &GroupId) -> Result<PlanId, ReminderError>
where
    P: PlannerReader + PlannerWriter + ?Sized,
{
    let name = ResourceName::new(SALES_PLAN_NAME)?;
    let id = locate(
        planner,
        &ResourceQuery::plans(group_id.clone(), name.clone()),
        &NewResource::Plan(NewPlan {
            owner: group_id.clone(),
            title: name,
        }),
    )
    .await
    .map_err(provisioning_failed(ResourceLevel::Plan))?;
    Ok(id.into())
}

/// Finds or creates the to-do bucket within `plan_id`.
pub async fn ensure_bucket<P>(planner: &P, plan_id: &PlanId) -> Result<BucketId, ReminderError>
where
    P: PlannerReader + PlannerWriter + ?Sized,
{
    let name = ResourceName::new(TODO_BUCKET_NAME)?;
    let id = locate(
        planner,
        &ResourceQuery::buckets(plan_id.clone(), name.clone()),
        &NewResource::Bucket(NewBucket {
            plan_id: plan_id.clone(),
            name,
        }),
    )
    .await
    .map_err(provisioning_failed(ResourceLevel::Bucket))?;
    Ok(id.into())
}

/// Finds or creates the sales group owned by `owner`, its plan and the to-do bucket.
///
/// Each level waits for its parent's identifier. The first failure aborts the
/// chain; resources created before it are kept and reused on the next call.
pub async fn ensure_reminder_target<P>(
    planner: &P,
    owner: &UserId,
) -> Result<ReminderTarget, ReminderError>
where
    P: PlannerReader + PlannerWriter + ?Sized,
{
    let group_id = ensure_group(planner, owner).await?;
    let plan_id = ensure_plan(planner, &group_id).await?;
    let bucket_id = ensure_bucket(planner, &plan_id).await?;

    Ok(ReminderTarget {
        group_id,
        plan_id,
        bucket_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ResourceId;
    use crate::planner::ResourceScope;
    use crate::planner::memory::{InMemoryPlanner, PlannerOperation};
    use crate::planner::mock::MockPlanner;
    use mockall::Sequence;

    fn owner() -> UserId {
        UserId::new("6e7b768e-07e2-4810-8459-485f84f8f204").expect("valid user")
    }

    #[tokio::test]
    async fn provisioning_twice_is_idempotent() {
        let planner = InMemoryPlanner::new();

        let first = ensure_reminder_target(&planner, &owner())
            .await
            .expect("first run");
        let second = ensure_reminder_target(&planner, &owner())
            .await
            .expect("second run");

        assert_eq!(first, second);
        assert_eq!(planner.resources(ResourceLevel::Group).len(), 1);
        assert_eq!(planner.resources(ResourceLevel::Plan).len(), 1);
        assert_eq!(planner.resources(ResourceLevel::Bucket).len(), 1);
    }

    #[tokio::test]
    async fn levels_are_resolved_in_order() {
        let planner = InMemoryPlanner::new();

        ensure_reminder_target(&planner, &owner())
            .await
            .expect("should provision");

        assert_eq!(
            planner.operations(),
            vec![
                PlannerOperation::FindResources(ResourceLevel::Group),
                PlannerOperation::CreateResource(ResourceLevel::Group),
                PlannerOperation::FindResources(ResourceLevel::Plan),
                PlannerOperation::CreateResource(ResourceLevel::Plan),
                PlannerOperation::FindResources(ResourceLevel::Bucket),
                PlannerOperation::CreateResource(ResourceLevel::Bucket),
            ]
        );
    }

    #[tokio::test]
    async fn child_queries_use_parent_identifiers() {
        let mut planner = MockPlanner::new();
        let mut seq = Sequence::new();

        planner
            .expect_find_resources()
            .withf(|q| q.scope == ResourceScope::Groups && q.name.as_str() == "Sales")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![ResourceId::new("group-1").expect("valid id")]));
        planner
            .expect_find_resources()
            .withf(|q| {
                q.scope == ResourceScope::GroupPlans(GroupId::new("group-1").expect("valid id"))
                    && q.name.as_str() == "Sales"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![ResourceId::new("plan-1").expect("valid id")]));
        planner
            .expect_find_resources()
            .withf(|q| {
                q.scope == ResourceScope::PlanBuckets(PlanId::new("plan-1").expect("valid id"))
                    && q.name.as_str() == "To do"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![ResourceId::new("bucket-1").expect("valid id")]));
        planner.expect_create_resource().times(0);

        let target = ensure_reminder_target(&planner, &owner())
            .await
            .expect("should provision");

        assert_eq!(target.plan_id.as_str(), "plan-1");
        assert_eq!(target.bucket_id.as_str(), "bucket-1");
    }

    #[tokio::test]
    async fn existing_group_is_reused() {
        let planner = InMemoryPlanner::new();
        let existing = planner
            .seed_group(ResourceName::new("Sales").expect("valid name"))
            .expect("seeded");

        let target = ensure_reminder_target(&planner, &owner())
            .await
            .expect("should provision");

        assert_eq!(target.group_id.as_str(), existing.as_str());
        assert!(
            !planner
                .operations()
                .contains(&PlannerOperation::CreateResource(ResourceLevel::Group))
        );
    }

    #[tokio::test]
    async fn failure_aborts_the_chain_and_keeps_created_parents() {
        let planner = InMemoryPlanner::new();
        planner.fail_next(
            PlannerOperation::CreateResource(ResourceLevel::Plan),
            PlannerError::Status {
                status: 403,
                message: "denied".to_string(),
            },
        );

        let result = ensure_reminder_target(&planner, &owner()).await;

        assert!(matches!(
            result,
            Err(ReminderError::ProvisioningFailed {
                level: ResourceLevel::Plan,
                ..
            })
        ));
        assert!(
            !planner
                .operations()
                .contains(&PlannerOperation::FindResources(ResourceLevel::Bucket))
        );
        assert_eq!(planner.resources(ResourceLevel::Group).len(), 1);

        ensure_reminder_target(&planner, &owner())
            .await
            .expect("retry succeeds");
        assert_eq!(planner.resources(ResourceLevel::Group).len(), 1);
    }
}
