//! Liveness probe.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde_json::json;

use crate::server::AppState;

/// `/health`: returns 200 whenever the process is serving.
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let body = json!({
        "status": "ok",
        "service": "rollcall",
        "version": env!("CARGO_PKG_VERSION"),
        "dev_mode": state.args.dev_mode,
        "live_tokens": state.tokens.len(),
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
