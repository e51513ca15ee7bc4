//! `/asset/get.do`: static file retrieval from the configured asset
//! directory.
//!
//! Any failure, including traversal attempts and unreadable files, collapses
//! into a 404 `E_ASSET_NOT_FOUND` envelope so the response never leaks
//! filesystem detail.

use std::path::{Component, Path};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::debug;

use crate::pipeline::RequestContext;
use crate::routes::envelope_response;
use crate::server::AppState;
use crate::status::Status;

pub(super) async fn get_asset(state: &AppState, ctx: &RequestContext) -> Response<Full<Bytes>> {
    let Some(rel) = ctx.param("path") else {
        return not_found();
    };
    if !is_safe_relative(rel) {
        debug!("asset: rejected path {:?}", rel);
        return not_found();
    }

    let full = Path::new(&state.args.asset_dir).join(rel);
    match tokio::fs::read(&full).await {
        Ok(bytes) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", content_type_for(rel))
            .body(Full::new(Bytes::from(bytes)))
            .unwrap(),
        Err(e) => {
            debug!("asset: {} unreadable: {}", full.display(), e);
            not_found()
        }
    }
}

fn not_found() -> Response<Full<Bytes>> {
    envelope_response(StatusCode::NOT_FOUND, Status::AssetNotFound, None)
}

/// Only plain relative paths are served: no root, no `..`, no drive prefix.
fn is_safe_relative(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

fn content_type_for(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("html") => "text/html",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_rejected() {
        assert!(is_safe_relative("logo.png"));
        assert!(is_safe_relative("icons/small/logo.png"));
        assert!(!is_safe_relative(""));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative("../secret"));
        assert!(!is_safe_relative("icons/../../secret"));
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
