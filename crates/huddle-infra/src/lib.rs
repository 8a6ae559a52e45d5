//! Infrastructure layer for Huddle.
//!
//! Contains implementations of the ports defined in `huddle-core`: the SQLite
//! session and identity store, configuration loading, TOML translation
//! tables, and a log-only chat notifier for running without a chat client.

pub mod config;
pub mod i18n;
pub mod notify;
pub mod sqlite;
