//! Where leads come from: the lead management API or built-in demo data.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::lead::Lead;

pub mod sample;

pub use sample::SampleLeadSource;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LeadSourceError {
    #[error("Lead feed returned status {0}")]
    Status(u16),

    #[error("Lead feed request failed: {0}")]
    Transport(String),

    #[error("Cannot decode lead feed: {0}")]
    Decode(String),
}

pub type LeadSourceResult<T> = Result<T, LeadSourceError>;

#[async_trait]
pub trait LeadSource: Send + Sync {
    /// Every lead in the order the feed delivers them.
    async fn list_leads(&self) -> LeadSourceResult<Vec<Lead>>;
}

#[async_trait]
impl<T: LeadSource + ?Sized> LeadSource for Arc<T> {
    async fn list_leads(&self) -> LeadSourceResult<Vec<Lead>> {
        (**self).list_leads().await
    }
}

/// Decodes feed entries one by one, skipping those that are not valid leads.
pub fn decode_leads(entries: Vec<Value>) -> Vec<Lead> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Lead>(entry) {
            Ok(lead) => Some(lead),
            Err(e) => {
                log::warn!("Skipping malformed lead at position {index}: {e}");
                None
            }
        })
        .collect()
}

/// Reads leads as JSON from a configured endpoint.
pub struct HttpLeadSource {
    client: reqwest::Client,
    url: String,
}

impl HttpLeadSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl From<reqwest::Error> for LeadSourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LeadSourceError::Decode(err.to_string())
        } else {
            LeadSourceError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl LeadSource for HttpLeadSource {
    async fn list_leads(&self) -> LeadSourceResult<Vec<Lead>> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            log::error!("Lead feed {} answered {status}", self.url);
            return Err(LeadSourceError::Status(status.as_u16()));
        }

        let entries: Vec<Value> = response.json().await?;
        let leads = decode_leads(entries);
        log::debug!("Loaded {} leads from {}", leads.len(), self.url);
        Ok(leads)
    }
}
