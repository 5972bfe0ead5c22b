//! Domain aggregates exposed by the leads service layer.

pub mod lead;
pub mod reminder;
pub mod types;
