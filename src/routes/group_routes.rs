//! `/group/*` handlers: membership, activities, group info.
//!
//! Every route here resolves the group from the `uid` query parameter before
//! the handler runs, so `ctx.current_group()` is always populated.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::Activity;
use crate::pipeline::RequestContext;
use crate::server::AppState;
use crate::status::Status;
use crate::types::RollcallError;

fn fault(context: &str, err: RollcallError) -> (Status, Option<Value>) {
    warn!("{}: {}", context, err);
    (Status::Fault, None)
}

fn owner_only(ctx: &RequestContext) -> Option<Status> {
    if ctx.current_group().creator_open_id != ctx.current_user().open_id {
        return Some(Status::PermissionDenied);
    }
    None
}

/// `/group/attend`: the caller joins the group.
pub(super) async fn attend(state: &AppState, ctx: &mut RequestContext) -> (Status, Option<Value>) {
    let (user, group) = ctx.current_user_and_group_mut();
    (state.relations.attend_group(user, group).await, None)
}

/// `/group/quit`: the caller leaves the group.
pub(super) async fn quit(state: &AppState, ctx: &mut RequestContext) -> (Status, Option<Value>) {
    let (user, group) = ctx.current_user_and_group_mut();
    (state.relations.quit_group(user, group).await, None)
}

/// `/group/add_member`: the owner enrolls another user by `openid`.
pub(super) async fn add_member(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    if let Some(denied) = owner_only(ctx) {
        return (denied, None);
    }
    let mut target = match state.store.get_user(ctx.param("openid").unwrap_or_default()).await {
        Ok(Some(u)) => u,
        Ok(None) => return (Status::UserNonExisting, None),
        Err(e) => return fault("add_member: lookup", e),
    };
    (
        state
            .relations
            .add_group_member(&mut target, ctx.current_group_mut())
            .await,
        None,
    )
}

/// `/group/remove_member`: the owner removes a user by `openid`.
pub(super) async fn remove_member(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    if let Some(denied) = owner_only(ctx) {
        return (denied, None);
    }
    let mut target = match state.store.get_user(ctx.param("openid").unwrap_or_default()).await {
        Ok(Some(u)) => u,
        Ok(None) => return (Status::UserNonExisting, None),
        Err(e) => return fault("remove_member: lookup", e),
    };
    (
        state
            .relations
            .remove_group_member(&mut target, ctx.current_group_mut())
            .await,
        None,
    )
}

/// `/group/get_members`: public member roster, basic profiles only.
pub(super) async fn get_members(
    state: &AppState,
    ctx: &RequestContext,
) -> (Status, Option<Value>) {
    let mut members = Vec::with_capacity(ctx.current_group().members.len());
    for open_id in &ctx.current_group().members {
        match state.store.get_user(open_id).await {
            Ok(Some(u)) => members.push(u.basic_info()),
            Ok(None) => debug!("member roster: {} no longer exists", open_id),
            Err(e) => return fault("get_members: lookup", e),
        }
    }
    (Status::Ok, Some(json!({ "members": members })))
}

/// `/group/create_activity`: owner only.
pub(super) async fn create_activity(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    if let Some(denied) = owner_only(ctx) {
        return (denied, None);
    }
    let Some(name) = ctx.param("name") else {
        return (Status::Fault, None);
    };
    let activity = Activity::new(
        name.to_string(),
        ctx.param("where").unwrap_or_default().to_string(),
        ctx.param("host").unwrap_or_default().to_string(),
        ctx.param("timeexp").unwrap_or_default().to_string(),
        ctx.current_user().open_id.clone(),
    );

    let rc = state
        .relations
        .create_activity(ctx.current_group_mut(), &activity)
        .await;
    if rc.failed() {
        return (rc, None);
    }
    (Status::Ok, Some(json!({ "uid": activity.uid })))
}

/// `/group/remove_activity`: owner only; `activity_uid` names the child.
pub(super) async fn remove_activity(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    if let Some(denied) = owner_only(ctx) {
        return (denied, None);
    }
    let uid = ctx.param("activity_uid").unwrap_or_default().to_string();
    let activity = match state.store.get_activity(&uid).await {
        Ok(Some(a)) => a,
        Ok(None) => return (Status::ActivityNonExisting, None),
        Err(e) => return fault("remove_activity: lookup", e),
    };
    (
        state
            .relations
            .delete_activity(ctx.current_group_mut(), &activity)
            .await,
        None,
    )
}

/// `/group/get_activities`: public activity listing.
pub(super) async fn get_activities(
    state: &AppState,
    ctx: &RequestContext,
) -> (Status, Option<Value>) {
    let mut activities = Vec::with_capacity(ctx.current_group().activities.len());
    for uid in &ctx.current_group().activities {
        match state.store.get_activity(uid).await {
            Ok(Some(a)) => activities.push(a.info()),
            Ok(None) => debug!("activity list: {} no longer exists", uid),
            Err(e) => return fault("get_activities: lookup", e),
        }
    }
    (Status::Ok, Some(json!({ "activities": activities })))
}

/// `/group/update_info`: owner only; updates name and/or desc.
pub(super) async fn update_info(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    if let Some(denied) = owner_only(ctx) {
        return (denied, None);
    }
    let name = ctx.param("name").map(str::to_owned);
    let desc = ctx.param("desc").map(str::to_owned);

    let group = ctx.current_group_mut();
    if let Some(name) = name {
        group.name = name;
    }
    if let Some(desc) = desc {
        group.desc = desc;
    }
    if let Err(e) = state.store.put_group(group).await {
        return fault("update_info: persist", e);
    }
    (Status::Ok, None)
}

/// `/group/info`: public group profile.
pub(super) fn info(ctx: &RequestContext) -> (Status, Option<Value>) {
    (Status::Ok, Some(ctx.current_group().info()))
}
