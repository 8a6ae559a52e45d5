//! SQLite storage layer.
//!
//! One `SqliteStore` owns the connection pool and the gate that serializes
//! every call. Repository implementations are split per entity family.

pub mod guest;
pub mod identity;
pub mod mailbox;
pub mod pool;
pub mod role;
pub mod schema;
pub mod session;
pub mod store;
