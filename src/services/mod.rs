pub mod api;
pub mod errors;
pub mod leads;
pub mod locator;
pub mod provisioning;
pub mod reminder;
pub mod tasks;

pub use errors::{ReminderError, ServiceError, ServiceResult};
