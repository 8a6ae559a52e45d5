//! Services and collaborator capabilities.

pub mod lobby;
pub mod notify;
pub mod translate;
