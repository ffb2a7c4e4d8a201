pub mod auth;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod remote_store;
pub mod task_store;
