// Public API for integration tests and the binary

pub mod chat;
pub mod config;
pub mod contest;
pub mod messages;
pub mod schedule;
pub mod store;
pub mod types;
