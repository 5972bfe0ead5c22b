use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::types::{LeadTitle, Percent, TypeConstraintError};

/// Lead author or commenter. The email is the identity used for deduplication.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeadComment {
    pub comment: String,
    pub date: DateTime<Utc>,
    pub created_by: Person,
}

/// Sales lead as delivered by the lead management system.
///
/// Comments are kept in the order received, which is chronological.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub title: LeadTitle,
    pub account: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_on: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_percent")]
    pub percent_complete: Percent,
    #[serde(default)]
    pub requires_attention: bool,
    pub created_by: Person,
    #[serde(default)]
    pub comments: Vec<LeadComment>,
    #[serde(default)]
    pub change: f64,
}

/// The feed reports completion as any JSON number.
fn deserialize_percent<'de, D>(deserializer: D) -> Result<Percent, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(Percent::saturating_from_f64)
}

impl Lead {
    /// Date of the most recent comment, or the epoch for leads without comments.
    pub fn last_comment_date(&self) -> DateTime<Utc> {
        self.comments
            .last()
            .map(|c| c.date)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Comment authors other than the lead creator, each listed once.
    pub fn distinct_contributors(&self) -> Vec<&Person> {
        let mut contributors: Vec<&Person> = Vec::new();

        for comment in &self.comments {
            let author = &comment.created_by;
            if author.email == self.created_by.email {
                continue;
            }
            if contributors.iter().any(|p| p.email == author.email) {
                continue;
            }
            contributors.push(author);
        }

        contributors
    }

    pub fn comments_newest_first(&self) -> impl Iterator<Item = &LeadComment> {
        self.comments.iter().rev()
    }
}

/// Presentation of the lead list.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LeadView {
    #[default]
    New,
    MostProbable,
    RecentComments,
    RequireAttention,
}

impl LeadView {
    /// Orders or filters a freshly fetched lead list for this view.
    pub fn apply(self, mut leads: Vec<Lead>) -> Vec<Lead> {
        match self {
            LeadView::New => leads.sort_by(|a, b| b.created_on.cmp(&a.created_on)),
            LeadView::MostProbable => {
                leads.sort_by(|a, b| b.percent_complete.cmp(&a.percent_complete))
            }
            LeadView::RecentComments => {
                leads.sort_by_key(|l| std::cmp::Reverse(l.last_comment_date()))
            }
            LeadView::RequireAttention => leads.retain(|l| l.requires_attention),
        }
        leads
    }
}

impl Display for LeadView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeadView::New => write!(f, "new"),
            LeadView::MostProbable => write!(f, "mostProbable"),
            LeadView::RecentComments => write!(f, "recentComments"),
            LeadView::RequireAttention => write!(f, "requireAttention"),
        }
    }
}

impl FromStr for LeadView {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadView::New),
            "mostProbable" => Ok(LeadView::MostProbable),
            "recentComments" => Ok(LeadView::RecentComments),
            "requireAttention" => Ok(LeadView::RequireAttention),
            "" => Err(TypeConstraintError::EmptyString),
            _ => Err(TypeConstraintError::InvalidValue(format!("unknown view {s}"))),
        }
    }
}
