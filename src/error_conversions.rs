//! Error conversion glue between the domain and the layers built on it.
//!
//! The domain layer must not depend on gateway or service error types, so the
//! conversions from [`TypeConstraintError`] live here.

use crate::domain::types::TypeConstraintError;
use crate::planner::errors::PlannerError;
use crate::services::errors::{ReminderError, ServiceError};

impl From<TypeConstraintError> for ServiceError {
    fn from(val: TypeConstraintError) -> Self {
        ServiceError::TypeConstraint(val.to_string())
    }
}

impl From<TypeConstraintError> for ReminderError {
    fn from(val: TypeConstraintError) -> Self {
        ReminderError::InvalidInput(val.to_string())
    }
}

impl From<TypeConstraintError> for PlannerError {
    fn from(val: TypeConstraintError) -> Self {
        PlannerError::Decode(val.to_string())
    }
}
