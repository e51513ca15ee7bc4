//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection. Each request
//! runs the route's pipeline stages first; only a fully-populated context
//! reaches a handler, and every handler outcome is rendered as the JSON
//! envelope, so no handler error escapes the transport layer.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::db::EntityStore;
use crate::pipeline;
use crate::relation::RelationManager;
use crate::routes;
use crate::token::{spawn_cleanup_task, TokenStore};
use crate::types::RollcallError;
use crate::wx::WxClient;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

const TOKEN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn EntityStore>,
    pub tokens: Arc<TokenStore>,
    pub relations: RelationManager,
    /// WeChat login support; present only when both credentials are set
    pub wx: Option<WxClient>,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn EntityStore>) -> Self {
        let tokens = Arc::new(TokenStore::new(args.token_ttl_secs));
        let relations = RelationManager::new(Arc::clone(&store));
        let wx = match (&args.wx_app_id, &args.wx_secret) {
            (Some(app_id), Some(secret)) => Some(WxClient::new(app_id.clone(), secret.clone())),
            _ => None,
        };

        Self {
            args,
            store,
            tokens,
            relations,
            wx,
        }
    }
}

pub async fn run(state: Arc<AppState>) -> Result<(), RollcallError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Rollcall listening on {}", state.args.listen);
    if state.args.dev_mode {
        warn!("Development mode enabled - in-memory store, data is not persisted");
    }
    if state.wx.is_some() {
        info!("WeChat login enabled");
    }

    spawn_cleanup_task(Arc::clone(&state.tokens), TOKEN_SWEEP_INTERVAL);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    if method != Method::GET {
        return Ok(to_boxed(method_not_allowed_response()));
    }

    let response = match path.as_str() {
        "/health" | "/healthz" => routes::health_check(&state),
        p => match routes::route_spec(p) {
            Some(spec) => {
                let query = parse_query(req.uri().query().unwrap_or(""));
                match pipeline::run(&spec, query, &state.tokens, state.store.as_ref()).await {
                    Ok(ctx) => routes::dispatch(&state, p, ctx).await,
                    Err(reject) => routes::envelope_response(reject.http, reject.status, None),
                }
            }
            None => routes::not_found_response(p),
        },
    };

    Ok(to_boxed(response))
}

/// Decode the query string into a flat key/value map. Repeated keys keep the
/// last value.
fn parse_query(raw: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str(raw).unwrap_or_default()
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

fn method_not_allowed_response() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Method Not Allowed",
        "hint": "all endpoints are GET",
    });
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::{Group, Role, User};
    use crate::status::Status;
    use clap::Parser;
    use serde_json::Value;

    fn test_state() -> (Arc<AppState>, Arc<MemoryStore>) {
        let args = Args::parse_from(["rollcall"]);
        let store = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(args, store.clone() as Arc<dyn EntityStore>));
        (state, store)
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn call(state: &Arc<AppState>, path: &str, q: HashMap<String, String>) -> (u16, Value) {
        let spec = routes::route_spec(path).expect("path in route table");
        let response =
            match pipeline::run(&spec, q, &state.tokens, state.store.as_ref()).await {
                Ok(ctx) => routes::dispatch(state, path, ctx).await,
                Err(reject) => routes::envelope_response(reject.http, reject.status, None),
            };
        let http = response.status().as_u16();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (http, serde_json::from_slice(&bytes).unwrap())
    }

    async fn seed_user(store: &MemoryStore, open_id: &str, role: Role) {
        let user = User::new(
            open_id.into(),
            "code".into(),
            open_id.into(),
            role,
            crate::auth::hash_password("pw").unwrap(),
            "".into(),
        );
        store.put_user(&user).await.unwrap();
    }

    #[test]
    fn test_parse_query() {
        let q = parse_query("openid=abc&name=Chess%20Club");
        assert_eq!(q.get("openid").map(String::as_str), Some("abc"));
        assert_eq!(q.get("name").map(String::as_str), Some("Chess Club"));
        assert!(parse_query("").is_empty());
    }

    #[tokio::test]
    async fn test_register_then_login_flow() {
        let (state, _store) = test_state();

        let (http, body) = call(
            &state,
            "/usr/reg",
            query(&[
                ("openid", "alice"),
                ("type", "0"),
                ("code", "2019001"),
                ("real_name", "Alice"),
                ("password", "pw"),
            ]),
        )
        .await;
        assert_eq!(http, 200);
        assert_eq!(body["status"]["code"], Status::Ok.code());

        // Duplicate registration
        let (_, body) = call(
            &state,
            "/usr/reg",
            query(&[
                ("openid", "alice"),
                ("type", "0"),
                ("code", "2019001"),
                ("real_name", "Alice"),
                ("password", "pw"),
            ]),
        )
        .await;
        assert_eq!(body["status"]["code"], Status::UserExisting.code());

        // Wrong password
        let (_, body) = call(
            &state,
            "/usr/login",
            query(&[("openid", "alice"), ("code", "2019001"), ("password", "no")]),
        )
        .await;
        assert_eq!(body["status"]["code"], Status::PasswordInvalid.code());

        // Good login yields a working token
        let (_, body) = call(
            &state,
            "/usr/login",
            query(&[("openid", "alice"), ("code", "2019001"), ("password", "pw")]),
        )
        .await;
        assert_eq!(body["status"]["code"], Status::Ok.code());
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (_, body) = call(&state, "/usr/info", query(&[("token", &token)])).await;
        assert_eq!(body["data"]["openId"], "alice");
    }

    #[tokio::test]
    async fn test_unknown_group_never_reaches_handler() {
        let (state, store) = test_state();
        seed_user(&store, "alice", Role::Attendee).await;
        let token = state.tokens.create_token("alice");

        let (http, body) = call(
            &state,
            "/group/attend",
            query(&[("token", &token), ("uid", "missing")]),
        )
        .await;
        assert_eq!(http, 404);
        assert_eq!(body["status"]["code"], Status::GroupNonExisting.code());

        // The handler never ran: nothing was written through the store.
        let alice = store.get_user("alice").await.unwrap().unwrap();
        assert!(alice.attended_groups.is_empty());
    }

    #[tokio::test]
    async fn test_ownership_denial_leaves_group_unchanged() {
        let (state, store) = test_state();
        seed_user(&store, "owner", Role::Manager).await;
        seed_user(&store, "mallory", Role::Attendee).await;

        let group = Group::new("Chess".into(), "".into(), "owner".into(), "".into());
        store.put_group(&group).await.unwrap();

        let token = state.tokens.create_token("mallory");
        let (http, body) = call(
            &state,
            "/group/update_info",
            query(&[("token", &token), ("uid", &group.uid), ("name", "Stolen")]),
        )
        .await;
        assert_eq!(http, 200);
        assert_eq!(body["status"]["code"], Status::PermissionDenied.code());

        let loaded = store.get_group(&group.uid).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Chess");
    }

    #[tokio::test]
    async fn test_full_group_lifecycle_over_http_surface() {
        let (state, store) = test_state();
        seed_user(&store, "boss", Role::Manager).await;
        seed_user(&store, "alice", Role::Attendee).await;
        let boss = state.tokens.create_token("boss");
        let alice = state.tokens.create_token("alice");

        let (_, body) = call(
            &state,
            "/usr/create_group",
            query(&[("token", &boss), ("name", "Chess"), ("place", "North")]),
        )
        .await;
        assert_eq!(body["status"]["code"], Status::Ok.code());
        let uid = body["data"]["uid"].as_str().unwrap().to_string();

        let (_, body) = call(
            &state,
            "/group/attend",
            query(&[("token", &alice), ("uid", &uid)]),
        )
        .await;
        assert_eq!(body["status"]["code"], Status::Ok.code());

        let (_, body) = call(&state, "/group/get_members", query(&[("uid", &uid)])).await;
        assert_eq!(body["data"]["members"][0]["openId"], "alice");

        let (_, body) = call(
            &state,
            "/usr/get_nearby_groups",
            query(&[("place", "North")]),
        )
        .await;
        assert_eq!(body["data"]["groups"][0]["uid"], uid.as_str());

        let (_, body) = call(
            &state,
            "/usr/remove_group",
            query(&[("token", &boss), ("uid", &uid)]),
        )
        .await;
        assert_eq!(body["status"]["code"], Status::Ok.code());
        assert!(store.get_group(&uid).await.unwrap().is_none());
        let member = store.get_user("alice").await.unwrap().unwrap();
        assert!(member.attended_groups.is_empty());
    }

    #[tokio::test]
    async fn test_attendee_cannot_create_group() {
        let (state, store) = test_state();
        seed_user(&store, "alice", Role::Attendee).await;
        let token = state.tokens.create_token("alice");

        let (http, body) = call(
            &state,
            "/usr/create_group",
            query(&[("token", &token), ("name", "Chess")]),
        )
        .await;
        assert_eq!(http, 401);
        assert_eq!(body["status"]["code"], Status::PermissionDenied.code());
    }
}
