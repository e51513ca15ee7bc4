//! HTTP server and shared application state

mod http;

pub use http::{run, AppState};
