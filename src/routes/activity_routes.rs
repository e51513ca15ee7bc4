//! `/activity/*` handlers: task management under a resolved activity.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::Task;
use crate::pipeline::RequestContext;
use crate::server::AppState;
use crate::status::Status;
use crate::types::RollcallError;

fn fault(context: &str, err: RollcallError) -> (Status, Option<Value>) {
    warn!("{}: {}", context, err);
    (Status::Fault, None)
}

/// `/activity/create_task`: managers only.
pub(super) async fn create_task(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    let Some(name) = ctx.param("name") else {
        return (Status::Fault, None);
    };
    let task = Task::new(
        name.to_string(),
        ctx.param("place").unwrap_or_default().to_string(),
        ctx.param("host").unwrap_or_default().to_string(),
        ctx.current_user().open_id.clone(),
    );

    let rc = state
        .relations
        .create_task(ctx.current_activity_mut(), &task)
        .await;
    if rc.failed() {
        return (rc, None);
    }
    (Status::Ok, Some(json!({ "uid": task.uid })))
}

/// `/activity/remove_task`: managers only; `task_uid` names the child.
pub(super) async fn remove_task(
    state: &AppState,
    ctx: &mut RequestContext,
) -> (Status, Option<Value>) {
    let uid = ctx.param("task_uid").unwrap_or_default().to_string();
    let task = match state.store.get_task(&uid).await {
        Ok(Some(t)) => t,
        Ok(None) => return (Status::TaskNonExisting, None),
        Err(e) => return fault("remove_task: lookup", e),
    };
    (
        state
            .relations
            .delete_task(ctx.current_activity_mut(), &task)
            .await,
        None,
    )
}

/// `/activity/get_tasks`: public task listing.
pub(super) async fn get_tasks(state: &AppState, ctx: &RequestContext) -> (Status, Option<Value>) {
    let mut tasks = Vec::with_capacity(ctx.current_activity().tasks.len());
    for uid in &ctx.current_activity().tasks {
        match state.store.get_task(uid).await {
            Ok(Some(t)) => tasks.push(t.basic_info()),
            Ok(None) => debug!("task list: {} no longer exists", uid),
            Err(e) => return fault("get_tasks: lookup", e),
        }
    }
    (Status::Ok, Some(json!({ "tasks": tasks })))
}

/// `/activity/info`: public activity profile.
pub(super) fn info(ctx: &RequestContext) -> (Status, Option<Value>) {
    (Status::Ok, Some(ctx.current_activity().info()))
}
