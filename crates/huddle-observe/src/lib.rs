//! Logging and trace export setup for Huddle binaries.

pub mod tracing_setup;
