use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::dto::api::ErrorResponse;
use crate::services::{ReminderError, ServiceError};

pub mod api;

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::TypeConstraint(_) => StatusCode::BAD_REQUEST,
            ServiceError::LeadSource(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Reminder(err) => match err {
                ReminderError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ReminderError::ConcurrencyConflict { .. } | ReminderError::InvalidSession(_) => {
                    StatusCode::CONFLICT
                }
                ReminderError::ProvisioningFailed { .. }
                | ReminderError::TaskCreationFailed(_)
                | ReminderError::AnnotationFailed { .. } => StatusCode::BAD_GATEWAY,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let conflict = matches!(self, ServiceError::Reminder(err) if err.is_conflict());
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            status: "failed",
            error: self.to_string(),
            conflict,
        })
    }
}
