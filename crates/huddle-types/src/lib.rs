//! Shared domain types for Huddle.
//!
//! Identifiers, identity and session outcome types, mailbox batches,
//! configuration, and the error enums shared by the store and its callers.
//!
//! Zero infrastructure dependencies -- only serde, uuid, thiserror.

pub mod config;
pub mod error;
pub mod identity;
pub mod ids;
pub mod mailbox;
pub mod session;
