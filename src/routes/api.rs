use actix_web::{HttpResponse, get, post, web};
use log::error;

use crate::AppState;
use crate::dto::api::{LeadsQuery, ReminderRequest, ReminderResponse};
use crate::services::ServiceError;
use crate::services::api::schedule_reminder;
use crate::services::leads::list_leads;

#[get("/v1/leads")]
pub async fn api_v1_leads(
    params: web::Query<LeadsQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let view = params.into_inner().view;

    match list_leads(state.leads.as_deref(), view).await {
        Ok(leads) => Ok(HttpResponse::Ok().json(leads)),
        Err(e) => {
            error!("Failed to list leads: {e}");
            Err(e)
        }
    }
}

#[post("/v1/reminders")]
pub async fn api_v1_reminders(
    request: web::Json<ReminderRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let request = request.into_inner();
    let lead_id = request.lead_id.clone();

    match schedule_reminder(
        state.planner.clone(),
        state.leads.as_deref(),
        &state.leads_page_url,
        request,
    )
    .await
    {
        Ok(task_id) => Ok(HttpResponse::Created().json(ReminderResponse::succeeded(task_id))),
        Err(e) => {
            error!("Failed to create reminder for lead {lead_id}: {e}");
            Err(e)
        }
    }
}
