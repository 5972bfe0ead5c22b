use crate::domain::lead::{Lead, LeadView};
use crate::lead_source::LeadSource;
use crate::services::{ServiceError, ServiceResult};

fn configured<S: LeadSource + ?Sized>(source: Option<&S>) -> ServiceResult<&S> {
    source.ok_or_else(|| {
        ServiceError::NotConfigured(
            "set leads_api_url or enable demo mode to load leads".to_string(),
        )
    })
}

/// Loads every lead and arranges it for `view`.
pub async fn list_leads<S>(source: Option<&S>, view: LeadView) -> ServiceResult<Vec<Lead>>
where
    S: LeadSource + ?Sized,
{
    let leads = configured(source)?.list_leads().await?;
    Ok(view.apply(leads))
}

/// Finds a single lead by id in the current feed.
pub async fn find_lead<S>(source: Option<&S>, lead_id: &str) -> ServiceResult<Lead>
where
    S: LeadSource + ?Sized,
{
    configured(source)?
        .list_leads()
        .await?
        .into_iter()
        .find(|lead| lead.id == lead_id)
        .ok_or(ServiceError::NotFound)
}
