//! Store ports, collaborator traits and session coordination for Huddle.
//!
//! This crate defines the "ports" (repository traits) that the infrastructure
//! layer implements, plus the capabilities consumed from the chat client and
//! the translation tables. It depends only on `huddle-types` -- never on
//! `huddle-infra` or any database/IO crate.

pub mod repository;
pub mod service;
