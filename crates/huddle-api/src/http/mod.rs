//! HTTP layer for the web channel.
//!
//! Thin axum handlers over the coordinator and the store, with the paths and
//! form fields the browser client already uses.

pub mod error;
pub mod handlers;
pub mod router;
