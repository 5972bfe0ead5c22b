use async_trait::async_trait;

use crate::domain::lead::Lead;
use crate::lead_source::{LeadSource, LeadSourceError, LeadSourceResult, decode_leads};

const SAMPLE_LEADS: &str = r#"[
  {
    "id": "1",
    "title": "Contoso Fleet Renewal",
    "account": "Contoso",
    "description": "Renewal of the vehicle tracking subscription for 120 trucks.",
    "createdOn": "2024-04-02T08:15:00Z",
    "percentComplete": 70,
    "requiresAttention": false,
    "createdBy": { "name": "Megan Bowen", "email": "meganb@example.com" },
    "comments": [
      {
        "comment": "Procurement asked for a three year option.",
        "date": "2024-04-10T10:00:00Z",
        "createdBy": { "name": "Alex Wilber", "email": "alexw@example.com" }
      },
      {
        "comment": "Sent the revised quote.",
        "date": "2024-04-18T14:30:00Z",
        "createdBy": { "name": "Megan Bowen", "email": "meganb@example.com" }
      }
    ],
    "change": 0.12
  },
  {
    "id": "2",
    "title": "Fabrikam Warehouse Expansion",
    "account": "Fabrikam",
    "description": "Scanners and handhelds for the new distribution center.",
    "createdOn": "2024-04-20T12:00:00Z",
    "percentComplete": 35,
    "requiresAttention": true,
    "createdBy": { "name": "Alex Wilber", "email": "alexw@example.com" },
    "comments": [
      {
        "comment": "Competitor offered a lower price, need approval for a discount.",
        "date": "2024-05-02T09:45:00Z",
        "createdBy": { "name": "Lee Gu", "email": "leeg@example.com" }
      }
    ],
    "change": -0.05
  },
  {
    "id": "3",
    "title": "Northwind Pilot",
    "account": "Northwind Traders",
    "createdOn": "2024-03-11T16:20:00Z",
    "percentComplete": 90,
    "requiresAttention": false,
    "createdBy": { "name": "Lee Gu", "email": "leeg@example.com" },
    "comments": [],
    "change": 0.3
  },
  {
    "id": "4",
    "title": "Tailspin Support Contract",
    "account": "Tailspin Toys",
    "description": "Extended support for the store terminals.",
    "createdOn": "2024-05-06T07:00:00Z",
    "percentComplete": 10,
    "requiresAttention": true,
    "createdBy": { "name": "Megan Bowen", "email": "meganb@example.com" },
    "comments": [
      {
        "comment": "Waiting for the inventory of installed devices.",
        "date": "2024-05-07T11:10:00Z",
        "createdBy": { "name": "Lee Gu", "email": "leeg@example.com" }
      },
      {
        "comment": "Inventory received, 48 terminals.",
        "date": "2024-05-09T15:25:00Z",
        "createdBy": { "name": "Alex Wilber", "email": "alexw@example.com" }
      }
    ],
    "change": 0.0
  }
]"#;

/// Built-in leads served in demo mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleLeadSource;

#[async_trait]
impl LeadSource for SampleLeadSource {
    async fn list_leads(&self) -> LeadSourceResult<Vec<Lead>> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(SAMPLE_LEADS)
            .map_err(|e| LeadSourceError::Decode(e.to_string()))?;
        Ok(decode_leads(entries))
    }
}
