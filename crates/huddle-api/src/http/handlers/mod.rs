//! HTTP request handlers.

pub mod web;
