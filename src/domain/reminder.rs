//! Remote records read and written while scheduling a lead reminder.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::domain::types::{
    BucketId, ContextUrl, GroupId, LeadTitle, PlanId, ResourceName, TaskId, UserId, VersionTag,
};

pub const SALES_GROUP_NAME: &str = "Sales";
pub const SALES_PLAN_NAME: &str = "Sales";
pub const TODO_BUCKET_NAME: &str = "To do";

/// Group type that makes a group organization-wide and collaborative.
pub const UNIFIED_GROUP_TYPE: &str = "Unified";
pub const ASSIGNMENT_ODATA_TYPE: &str = "#microsoft.graph.plannerAssignment";
/// Lowest-priority ordering hint accepted by the planner.
pub const DEFAULT_ORDER_HINT: &str = " !";

/// Formats a timestamp as UTC ISO 8601 with millisecond precision, e.g.
/// `2024-06-01T00:00:00.000Z`.
pub fn format_due_date(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_due_date<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_due_date(value))
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub display_name: ResourceName,
    pub owners: Vec<UserId>,
    pub group_types: Vec<String>,
    pub mail_enabled: bool,
    pub mail_nickname: String,
    pub security_enabled: bool,
}

impl NewGroup {
    /// Collaborative group owned by `owner`; the mail nickname is the lower-cased name.
    pub fn unified(name: ResourceName, owner: UserId) -> Self {
        Self {
            mail_nickname: name.as_str().to_lowercase(),
            display_name: name,
            owners: vec![owner],
            group_types: vec![UNIFIED_GROUP_TYPE.to_string()],
            mail_enabled: true,
            security_enabled: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct NewPlan {
    pub owner: GroupId,
    pub title: ResourceName,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewBucket {
    pub plan_id: PlanId,
    pub name: ResourceName,
}

/// Identifiers a reminder task is filed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderTarget {
    pub group_id: GroupId,
    pub plan_id: PlanId,
    pub bucket_id: BucketId,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    pub order_hint: String,
}

impl Default for TaskAssignment {
    fn default() -> Self {
        Self {
            odata_type: ASSIGNMENT_ODATA_TYPE.to_string(),
            order_hint: DEFAULT_ORDER_HINT.to_string(),
        }
    }
}

/// Create payload of a reminder task. The description is set afterwards.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewReminderTask {
    pub plan_id: PlanId,
    pub bucket_id: BucketId,
    pub title: String,
    /// Keyed by the assignee's user id.
    pub assignments: BTreeMap<String, TaskAssignment>,
    #[serde(serialize_with = "serialize_due_date")]
    pub due_date_time: DateTime<Utc>,
}

impl NewReminderTask {
    pub fn for_lead(
        target: &ReminderTarget,
        lead_title: &LeadTitle,
        assignee: &UserId,
        due: DateTime<Utc>,
    ) -> Self {
        let mut assignments = BTreeMap::new();
        assignments.insert(assignee.as_str().to_string(), TaskAssignment::default());

        Self {
            plan_id: target.plan_id.clone(),
            bucket_id: target.bucket_id.clone(),
            title: reminder_title(lead_title),
            assignments,
            due_date_time: due,
        }
    }
}

pub fn reminder_title(lead_title: &LeadTitle) -> String {
    format!("Review lead {lead_title}")
}

/// Task detail record; the version tag gates every update of the details.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TaskDetails {
    pub id: TaskId,
    #[serde(rename = "@odata.etag")]
    pub version: VersionTag,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TaskDetailsPatch {
    pub description: String,
}

/// The lead a reminder session was opened for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderLead {
    pub lead_id: String,
    pub title: LeadTitle,
    /// Written into the task description as a link back to the lead.
    pub context_url: ContextUrl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const USER: &str = "6e7b768e-07e2-4810-8459-485f84f8f204";

    fn target() -> ReminderTarget {
        ReminderTarget {
            group_id: GroupId::new("group-1").unwrap(),
            plan_id: PlanId::new("plan-1").unwrap(),
            bucket_id: BucketId::new("bucket-1").unwrap(),
        }
    }

    #[test]
    fn task_payload_matches_planner_shape() {
        let task = NewReminderTask::for_lead(
            &target(),
            &LeadTitle::new("Acme Renewal").unwrap(),
            &UserId::new(USER).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        );

        let payload = serde_json::to_value(&task).unwrap();

        assert_eq!(
            payload,
            json!({
                "planId": "plan-1",
                "bucketId": "bucket-1",
                "title": "Review lead Acme Renewal",
                "assignments": {
                    USER: {
                        "@odata.type": "#microsoft.graph.plannerAssignment",
                        "orderHint": " !"
                    }
                },
                "dueDateTime": "2024-06-01T00:00:00.000Z"
            })
        );
    }

    #[test]
    fn group_payload_is_unified_and_owned() {
        let group = NewGroup::unified(
            ResourceName::new(SALES_GROUP_NAME).unwrap(),
            UserId::new(USER).unwrap(),
        );

        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({
                "displayName": "Sales",
                "owners": [USER],
                "groupTypes": ["Unified"],
                "mailEnabled": true,
                "mailNickname": "sales",
                "securityEnabled": true
            })
        );
    }

    #[test]
    fn plan_and_bucket_payloads_reference_parent() {
        let plan = NewPlan {
            owner: GroupId::new("group-1").unwrap(),
            title: ResourceName::new(SALES_PLAN_NAME).unwrap(),
        };
        let bucket = NewBucket {
            plan_id: PlanId::new("plan-1").unwrap(),
            name: ResourceName::new(TODO_BUCKET_NAME).unwrap(),
        };

        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({"owner": "group-1", "title": "Sales"})
        );
        assert_eq!(
            serde_json::to_value(&bucket).unwrap(),
            json!({"planId": "plan-1", "name": "To do"})
        );
    }

    #[test]
    fn task_details_read_the_etag() {
        let details: TaskDetails = serde_json::from_value(json!({
            "@odata.etag": "W/\"JzEtVGFzayAgQEBAQEBAQEBAQEBAQEBAWCc=\"",
            "id": "task-1",
            "description": ""
        }))
        .unwrap();

        assert_eq!(details.id.as_str(), "task-1");
        assert_eq!(
            details.version.as_str(),
            "W/\"JzEtVGFzayAgQEBAQEBAQEBAQEBAQEBAWCc=\""
        );
    }

    #[test]
    fn due_date_keeps_milliseconds() {
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 13, 5, 9).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(format_due_date(&due), "2024-06-01T13:05:09.250Z");
    }
}
