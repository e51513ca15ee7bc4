//! `/usr/*` handlers: registration, login, profile, group ownership and
//! discovery.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::auth::{hash_password, verify_password};
use crate::domain::{Group, Role, User};
use crate::pipeline::RequestContext;
use crate::server::AppState;
use crate::status::Status;
use crate::types::RollcallError;

fn fault(context: &str, err: RollcallError) -> (Status, Option<Value>) {
    warn!("{}: {}", context, err);
    (Status::Fault, None)
}

/// `/usr/reg`: create a user account. The role is fixed here and cannot be
/// changed later.
pub(super) async fn register(state: &AppState, ctx: &RequestContext) -> (Status, Option<Value>) {
    let (Some(open_id), Some(code), Some(real_name), Some(password)) = (
        ctx.param("openid"),
        ctx.param("code"),
        ctx.param("real_name"),
        ctx.param("password"),
    ) else {
        return (Status::Fault, None);
    };
    let Some(role) = ctx
        .param("type")
        .and_then(|t| t.parse::<i64>().ok())
        .and_then(Role::from_wire)
    else {
        return (Status::Fault, None);
    };

    match state.store.get_user(open_id).await {
        Ok(Some(_)) => return (Status::UserExisting, None),
        Ok(None) => {}
        Err(e) => return fault("reg: lookup", e),
    }

    let password_hash = match hash_password(password) {
        Ok(h) => h,
        Err(e) => return fault("reg: hash", e),
    };

    let user = User::new(
        open_id.to_string(),
        code.to_string(),
        real_name.to_string(),
        role,
        password_hash,
        ctx.param("place").unwrap_or_default().to_string(),
    );
    if let Err(e) = state.store.put_user(&user).await {
        return fault("reg: persist", e);
    }

    info!("Registered {} as {:?}", open_id, role);
    (Status::Ok, None)
}

/// `/usr/login`: two variants: credentials (`openid`, `code`, `password`)
/// or a WeChat login code (`wxcode`) exchanged for the openid upstream.
/// Success issues a token, invalidating any previous one.
pub(super) async fn login(state: &AppState, ctx: &RequestContext) -> (Status, Option<Value>) {
    let open_id = if let Some(wxcode) = ctx.param("wxcode") {
        let Some(wx) = &state.wx else {
            warn!("login: wxcode given but no wx credentials configured");
            return (Status::Fault, None);
        };
        match wx.code_to_open_id(wxcode).await {
            Ok(open_id) => open_id,
            Err(e) => return fault("login: wx exchange", e),
        }
    } else {
        match ctx.param("openid") {
            Some(open_id) => open_id.to_string(),
            None => return (Status::Fault, None),
        }
    };

    let user = match state.store.get_user(&open_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return (Status::UserNonExisting, None),
        Err(e) => return fault("login: lookup", e),
    };

    // The credentials variant also checks code and password; the wx variant
    // trusts the upstream identity.
    if ctx.param("wxcode").is_none() {
        if ctx.param("code") != Some(user.code.as_str()) {
            return (Status::UserNonExisting, None);
        }
        let Some(password) = ctx.param("password") else {
            return (Status::PasswordInvalid, None);
        };
        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return (Status::PasswordInvalid, None),
            Err(e) => return fault("login: verify", e),
        }
    }

    let token = state.tokens.create_token(&open_id);
    info!("Login for {}", open_id);
    (
        Status::Ok,
        Some(json!({ "token": token, "user": user.basic_info() })),
    )
}

/// `/usr/logout`: revoke the caller's token.
pub(super) async fn logout(state: &AppState, ctx: &RequestContext) -> (Status, Option<Value>) {
    state.tokens.deauth_token(&ctx.current_user().open_id);
    (Status::Ok, None)
}

/// `/usr/info`: the caller's full profile.
pub(super) fn info(ctx: &RequestContext) -> (Status, Option<Value>) {
    (Status::Ok, Some(ctx.current_user().full_info()))
}

/// `/usr/create_group`: managers only. Duplicate name among the caller's
/// own groups is rejected.
pub(super) async fn create_group(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    let Some(name) = ctx.param("name") else {
        return (Status::Fault, None);
    };
    let group = Group::new(
        name.to_string(),
        ctx.param("desc").unwrap_or_default().to_string(),
        ctx.current_user().open_id.clone(),
        ctx.param("place").unwrap_or_default().to_string(),
    );

    let rc = state
        .relations
        .create_group(ctx.current_user_mut(), &group)
        .await;
    if rc.failed() {
        return (rc, None);
    }
    (Status::Ok, Some(json!({ "uid": group.uid })))
}

/// `/usr/remove_group`: managers only; the caller must own the group.
pub(super) async fn remove_group(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    let uid = ctx.param("uid").unwrap_or_default().to_string();
    let group = match state.store.get_group(&uid).await {
        Ok(Some(g)) => g,
        Ok(None) => return (Status::GroupNonExisting, None),
        Err(e) => return fault("remove_group: lookup", e),
    };
    if group.creator_open_id != ctx.current_user().open_id {
        return (Status::PermissionDenied, None);
    }

    (
        state
            .relations
            .delete_group(ctx.current_user_mut(), &group)
            .await,
        None,
    )
}

/// `/usr/get_created_groups`: managers only.
pub(super) async fn get_created_groups(
    state: &AppState,
    ctx: &RequestContext,
) -> (Status, Option<Value>) {
    collect_groups(state, &ctx.current_user().created_groups).await
}

/// `/usr/get_attended_groups`
pub(super) async fn get_attended_groups(
    state: &AppState,
    ctx: &RequestContext,
) -> (Status, Option<Value>) {
    collect_groups(state, &ctx.current_user().attended_groups).await
}

async fn collect_groups(state: &AppState, uids: &[String]) -> (Status, Option<Value>) {
    let mut groups = Vec::with_capacity(uids.len());
    for uid in uids {
        match state.store.get_group(uid).await {
            Ok(Some(g)) => groups.push(g.info()),
            // Dangling references are tolerated in listings.
            Ok(None) => debug!("group list: {} no longer exists", uid),
            Err(e) => return fault("group list: lookup", e),
        }
    }
    (Status::Ok, Some(json!({ "groups": groups })))
}

/// `/usr/search_groups`: public name-substring search.
pub(super) async fn search_groups(
    state: &AppState,
    ctx: &RequestContext,
) -> (Status, Option<Value>) {
    let name = ctx.param("name").unwrap_or_default();
    match state.store.find_groups_by_name(name).await {
        Ok(groups) => {
            let infos: Vec<Value> = groups.iter().map(Group::info).collect();
            (Status::Ok, Some(json!({ "groups": infos })))
        }
        Err(e) => fault("search_groups", e),
    }
}

/// `/usr/get_nearby_groups`: public place lookup.
pub(super) async fn get_nearby_groups(
    state: &AppState,
    ctx: &RequestContext,
) -> (Status, Option<Value>) {
    let place = ctx.param("place").unwrap_or_default();
    match state.store.find_groups_by_place(place).await {
        Ok(groups) => {
            let infos: Vec<Value> = groups.iter().map(Group::info).collect();
            (Status::Ok, Some(json!({ "groups": infos })))
        }
        Err(e) => fault("get_nearby_groups", e),
    }
}
