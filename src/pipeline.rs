//! Request pipeline
//!
//! Staged pre-processing that runs before any handler: token authentication
//! (with optional role requirement) followed by routine resolution (loading
//! the Group/Activity/Task named by the `uid` query parameter). Each route
//! declares what it needs in a [`RouteSpec`]; the pipeline either produces a
//! fully-populated [`RequestContext`] or rejects the request with an HTTP
//! status and a wire [`Status`] before the handler is reached.

use std::collections::HashMap;

use hyper::StatusCode;
use tracing::warn;

use crate::db::EntityStore;
use crate::domain::{Activity, Group, Role, Task, User};
use crate::status::Status;
use crate::token::TokenStore;

/// What kind of routine a route resolves from its `uid` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Group,
    Activity,
    Task,
}

/// A resolved routine, attached to the context before the handler runs.
#[derive(Debug, Clone)]
pub enum Routine {
    Group(Group),
    Activity(Activity),
    Task(Task),
}

/// Per-route pipeline requirements, declared statically in the route table.
#[derive(Debug, Clone, Copy)]
pub struct RouteSpec {
    pub requires_auth: bool,
    pub required_role: Option<Role>,
    pub resolves: Option<RoutineKind>,
}

impl RouteSpec {
    pub const PUBLIC: RouteSpec = RouteSpec {
        requires_auth: false,
        required_role: None,
        resolves: None,
    };

    pub const AUTH: RouteSpec = RouteSpec {
        requires_auth: true,
        required_role: None,
        resolves: None,
    };

    pub const MANAGER: RouteSpec = RouteSpec {
        requires_auth: true,
        required_role: Some(Role::Manager),
        resolves: None,
    };

    pub const fn resolving(self, kind: RoutineKind) -> RouteSpec {
        RouteSpec {
            resolves: Some(kind),
            ..self
        }
    }
}

/// Pipeline rejection: the HTTP status to answer with and the wire status
/// carried in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reject {
    pub http: StatusCode,
    pub status: Status,
}

impl Reject {
    fn unauthorized(status: Status) -> Self {
        Self {
            http: StatusCode::UNAUTHORIZED,
            status,
        }
    }

    fn not_found(status: Status) -> Self {
        Self {
            http: StatusCode::NOT_FOUND,
            status,
        }
    }

    fn fault() -> Self {
        Self {
            http: StatusCode::INTERNAL_SERVER_ERROR,
            status: Status::Fault,
        }
    }
}

/// Everything a handler may consume: parsed query parameters plus whatever
/// the pipeline stages attached.
///
/// The `current_*` accessors panic when the value is absent. A handler only
/// ever calls them when its route declared the matching requirement, so a
/// missing value is a wiring bug that must fail loudly, not an input error.
#[derive(Debug)]
pub struct RequestContext {
    query: HashMap<String, String>,
    user: Option<User>,
    routine: Option<Routine>,
}

impl RequestContext {
    pub fn new(query: HashMap<String, String>) -> Self {
        Self {
            query,
            user: None,
            routine: None,
        }
    }

    /// Query parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    pub fn current_user(&self) -> &User {
        self.user.as_ref().expect("route did not require auth")
    }

    pub fn current_user_mut(&mut self) -> &mut User {
        self.user.as_mut().expect("route did not require auth")
    }

    pub fn current_group(&self) -> &Group {
        match &self.routine {
            Some(Routine::Group(g)) => g,
            _ => panic!("route did not resolve a group"),
        }
    }

    pub fn current_group_mut(&mut self) -> &mut Group {
        match &mut self.routine {
            Some(Routine::Group(g)) => g,
            _ => panic!("route did not resolve a group"),
        }
    }

    /// Both halves of a membership mutation at once. Split over the two
    /// context fields so the borrows do not collide.
    pub fn current_user_and_group_mut(&mut self) -> (&mut User, &mut Group) {
        let user = self.user.as_mut().expect("route did not require auth");
        let group = match &mut self.routine {
            Some(Routine::Group(g)) => g,
            _ => panic!("route did not resolve a group"),
        };
        (user, group)
    }

    pub fn current_activity(&self) -> &Activity {
        match &self.routine {
            Some(Routine::Activity(a)) => a,
            _ => panic!("route did not resolve an activity"),
        }
    }

    pub fn current_activity_mut(&mut self) -> &mut Activity {
        match &mut self.routine {
            Some(Routine::Activity(a)) => a,
            _ => panic!("route did not resolve an activity"),
        }
    }

    pub fn current_task(&self) -> &Task {
        match &self.routine {
            Some(Routine::Task(t)) => t,
            _ => panic!("route did not resolve a task"),
        }
    }
}

/// Run the pipeline stages for one request.
///
/// Stage order is fixed: authentication, then routine resolution. A stage
/// that rejects stops the pipeline; the handler never observes a partially
/// populated context.
pub async fn run(
    spec: &RouteSpec,
    query: HashMap<String, String>,
    tokens: &TokenStore,
    store: &dyn EntityStore,
) -> Result<RequestContext, Reject> {
    let mut ctx = RequestContext::new(query);

    if spec.requires_auth {
        let Some(token) = ctx.param("token").map(str::to_owned) else {
            return Err(Reject::unauthorized(Status::TokenAuth));
        };
        if !tokens.auth_token(&token) {
            return Err(Reject::unauthorized(Status::TokenAuth));
        }
        // auth_token succeeded, so the token parses.
        let open_id = TokenStore::open_id_of(&token).unwrap_or_default();

        let user = match store.get_user(open_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(Reject::unauthorized(Status::TokenAuth)),
            Err(e) => {
                warn!("auth stage: load user: {}", e);
                return Err(Reject::fault());
            }
        };

        if let Some(required) = spec.required_role {
            if user.role != required {
                return Err(Reject::unauthorized(Status::PermissionDenied));
            }
        }

        ctx.user = Some(user);
    }

    if let Some(kind) = spec.resolves {
        let uid = ctx.param("uid").unwrap_or_default().to_owned();
        let missing = match kind {
            RoutineKind::Group => Status::GroupNonExisting,
            RoutineKind::Activity => Status::ActivityNonExisting,
            RoutineKind::Task => Status::TaskNonExisting,
        };

        let routine = match kind {
            RoutineKind::Group => match store.get_group(&uid).await {
                Ok(Some(g)) => Routine::Group(g),
                Ok(None) => return Err(Reject::not_found(missing)),
                Err(e) => {
                    warn!("resolution stage: load group: {}", e);
                    return Err(Reject::fault());
                }
            },
            RoutineKind::Activity => match store.get_activity(&uid).await {
                Ok(Some(a)) => Routine::Activity(a),
                Ok(None) => return Err(Reject::not_found(missing)),
                Err(e) => {
                    warn!("resolution stage: load activity: {}", e);
                    return Err(Reject::fault());
                }
            },
            RoutineKind::Task => match store.get_task(&uid).await {
                Ok(Some(t)) => Routine::Task(t),
                Ok(None) => return Err(Reject::not_found(missing)),
                Err(e) => {
                    warn!("resolution stage: load task: {}", e);
                    return Err(Reject::fault());
                }
            },
        };

        ctx.routine = Some(routine);
    }

    Ok(ctx)
}
