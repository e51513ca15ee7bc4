//! Route table and handler dispatch
//!
//! Every endpoint is a GET with query-string parameters and answers with the
//! JSON envelope `{"status": {...}, "data": ...}`. The table below declares
//! each route's pipeline requirements; the server runs the pipeline and only
//! then hands the populated context to [`dispatch`].

mod activity_routes;
mod asset;
mod group_routes;
mod health;
mod user_routes;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde_json::Value;

use crate::pipeline::{RequestContext, RouteSpec, RoutineKind};
use crate::server::AppState;
use crate::status::{envelope, Status};

pub use health::health_check;

/// Pipeline requirements for a path, or `None` when the path is unknown.
pub fn route_spec(path: &str) -> Option<RouteSpec> {
    let spec = match path {
        "/usr/reg" | "/usr/login" | "/usr/search_groups" | "/usr/get_nearby_groups" => {
            RouteSpec::PUBLIC
        }
        "/usr/logout" | "/usr/info" | "/usr/get_attended_groups" => RouteSpec::AUTH,
        "/usr/create_group" | "/usr/remove_group" | "/usr/get_created_groups" => RouteSpec::MANAGER,

        "/group/attend"
        | "/group/quit"
        | "/group/add_member"
        | "/group/remove_member"
        | "/group/create_activity"
        | "/group/remove_activity"
        | "/group/update_info" => RouteSpec::AUTH.resolving(RoutineKind::Group),
        "/group/get_members" | "/group/get_activities" | "/group/info" => {
            RouteSpec::PUBLIC.resolving(RoutineKind::Group)
        }

        "/activity/create_task" | "/activity/remove_task" => {
            RouteSpec::MANAGER.resolving(RoutineKind::Activity)
        }
        "/activity/get_tasks" | "/activity/info" => {
            RouteSpec::PUBLIC.resolving(RoutineKind::Activity)
        }

        "/asset/get.do" => RouteSpec::PUBLIC,
        _ => return None,
    };
    Some(spec)
}

/// Invoke the handler for `path` with a pipeline-populated context.
///
/// The asset route answers with raw bytes; everything else produces the
/// JSON envelope.
pub async fn dispatch(
    state: &AppState,
    path: &str,
    mut ctx: RequestContext,
) -> Response<Full<Bytes>> {
    if path == "/asset/get.do" {
        return asset::get_asset(state, &ctx).await;
    }

    let (status, data) = match path {
        "/usr/reg" => user_routes::register(state, &ctx).await,
        "/usr/login" => user_routes::login(state, &ctx).await,
        "/usr/logout" => user_routes::logout(state, &ctx).await,
        "/usr/info" => user_routes::info(&ctx),
        "/usr/create_group" => user_routes::create_group(state, &mut ctx).await,
        "/usr/remove_group" => user_routes::remove_group(state, &mut ctx).await,
        "/usr/get_created_groups" => user_routes::get_created_groups(state, &ctx).await,
        "/usr/get_attended_groups" => user_routes::get_attended_groups(state, &ctx).await,
        "/usr/search_groups" => user_routes::search_groups(state, &ctx).await,
        "/usr/get_nearby_groups" => user_routes::get_nearby_groups(state, &ctx).await,

        "/group/attend" => group_routes::attend(state, &mut ctx).await,
        "/group/quit" => group_routes::quit(state, &mut ctx).await,
        "/group/add_member" => group_routes::add_member(state, &mut ctx).await,
        "/group/remove_member" => group_routes::remove_member(state, &mut ctx).await,
        "/group/get_members" => group_routes::get_members(state, &ctx).await,
        "/group/create_activity" => group_routes::create_activity(state, &mut ctx).await,
        "/group/remove_activity" => group_routes::remove_activity(state, &mut ctx).await,
        "/group/get_activities" => group_routes::get_activities(state, &ctx).await,
        "/group/update_info" => group_routes::update_info(state, &mut ctx).await,
        "/group/info" => group_routes::info(&ctx),

        "/activity/create_task" => activity_routes::create_task(state, &mut ctx).await,
        "/activity/remove_task" => activity_routes::remove_task(state, &mut ctx).await,
        "/activity/get_tasks" => activity_routes::get_tasks(state, &ctx).await,
        "/activity/info" => activity_routes::info(&ctx),

        // route_spec() and dispatch() must agree on the path set.
        _ => (Status::Fault, None),
    };

    envelope_response(StatusCode::OK, status, data)
}

/// Build an envelope response with the given HTTP status.
pub fn envelope_response(
    http: StatusCode,
    status: Status,
    data: Option<Value>,
) -> Response<Full<Bytes>> {
    let body = envelope(status, data).to_string();
    Response::builder()
        .status(http)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Plain 404 for paths outside the route table.
pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
