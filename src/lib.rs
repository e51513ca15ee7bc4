//! Rollcall - attendance sign-up backend
//!
//! HTTP backend for a group/activity/task sign-up application: account
//! registration and token login, group membership, activity and task
//! management, asset serving. MongoDB persistence with an in-memory
//! fallback for development.

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod pipeline;
pub mod relation;
pub mod routes;
pub mod server;
pub mod status;
pub mod token;
pub mod types;
pub mod wx;

pub use config::Args;
pub use server::{run, AppState};
pub use status::Status;
pub use types::{Result, RollcallError};
