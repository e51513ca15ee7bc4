//! Relationship manager
//!
//! Keeps the denormalized User/Group/Activity/Task reference graph
//! consistent over a store that only offers per-document atomic writes.
//!
//! Every membership edge is a pair of id-lists, one on each side, mutated
//! by a two-phase discipline with a fixed order: edge A is the child/member
//! side (the Group's member list), edge B the owner/attendee side (the
//! User's attended list). Both sides are mutated in memory first; if B is
//! rejected, A is reversed in memory and nothing is persisted. Cascading
//! deletes abort on the first failed step and do not undo completed steps.
//!
//! Store failures never escape as errors: they are logged and folded into
//! `Status::Fault`.

use std::sync::Arc;

use tracing::warn;

use crate::db::EntityStore;
use crate::domain::{Activity, Group, Role, Task, User};
use crate::status::Status;
use crate::types::RollcallError;

/// Mutates both sides of every ownership/membership edge and persists them.
#[derive(Clone)]
pub struct RelationManager {
    store: Arc<dyn EntityStore>,
}

impl RelationManager {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Create a group owned by `user`.
    ///
    /// A manager may not own two groups with the same name; the check scans
    /// the groups referenced by the user's created list.
    pub async fn create_group(&self, user: &mut User, group: &Group) -> Status {
        for uid in &user.created_groups {
            match self.store.get_group(uid).await {
                Ok(Some(existing)) if existing.name == group.name => {
                    return Status::GroupExisting;
                }
                Ok(_) => {}
                Err(e) => return fault("create_group: owned-group scan", e),
            }
        }

        let rc = user.add_created_group(&group.uid);
        if rc.failed() {
            return rc;
        }

        if let Err(e) = self.store.put_user(user).await {
            user.remove_created_group(&group.uid);
            return fault("create_group: persist user", e);
        }
        if let Err(e) = self.store.put_group(group).await {
            return fault("create_group: persist group", e);
        }

        Status::Ok
    }

    /// Delete a group owned by `user`, cascading into members, activities
    /// and tasks.
    ///
    /// Completed steps are not rolled back when a later step fails; the
    /// first failure is surfaced as-is.
    pub async fn delete_group(&self, user: &mut User, group: &Group) -> Status {
        let rc = user.remove_created_group(&group.uid);
        if rc.failed() {
            return rc;
        }

        // Quit every member. The owner may also be a member; in that case
        // the mutation must land on the already-loaded `user` so the single
        // save below carries both list removals.
        for member_id in &group.members {
            if member_id == &user.open_id {
                let rc = user.remove_attended_group(&group.uid);
                if rc.failed() {
                    return rc;
                }
            } else {
                let mut member = match self.store.get_user(member_id).await {
                    Ok(Some(m)) => m,
                    Ok(None) => return Status::UserNonExisting,
                    Err(e) => return fault("delete_group: load member", e),
                };
                let rc = member.remove_attended_group(&group.uid);
                if rc.failed() {
                    return rc;
                }
                if let Err(e) = self.store.put_user(&member).await {
                    return fault("delete_group: persist member", e);
                }
            }
        }

        if let Err(e) = self.store.put_user(user).await {
            return fault("delete_group: persist owner", e);
        }

        // Cascade into child activities, aborting on the first failure.
        let mut group = group.clone();
        for activity_id in group.activities.clone() {
            let activity = match self.store.get_activity(&activity_id).await {
                Ok(Some(a)) => a,
                Ok(None) => return Status::ActivityNonExisting,
                Err(e) => return fault("delete_group: load activity", e),
            };
            let rc = self.delete_activity(&mut group, &activity).await;
            if rc.failed() {
                return rc;
            }
        }

        if let Err(e) = self.store.delete_group(&group.uid).await {
            return fault("delete_group: delete document", e);
        }

        Status::Ok
    }

    /// Attend: add `user` to the group's member list and the group to the
    /// user's attended list.
    pub async fn attend_group(&self, user: &mut User, group: &mut Group) -> Status {
        // Edge A: member side.
        let rc = group.add_member(&user.open_id);
        if rc.failed() {
            return rc;
        }
        // Edge B: attendee side. On rejection, reverse A in memory;
        // nothing has been persisted yet.
        let rc = user.add_attended_group(&group.uid);
        if rc.failed() {
            group.remove_member(&user.open_id);
            return rc;
        }

        self.persist_edge(user, group).await
    }

    /// Quit: the inverse of [`attend_group`], same two-phase discipline.
    pub async fn quit_group(&self, user: &mut User, group: &mut Group) -> Status {
        let rc = group.remove_member(&user.open_id);
        if rc.failed() {
            return rc;
        }
        let rc = user.remove_attended_group(&group.uid);
        if rc.failed() {
            group.add_member(&user.open_id);
            return rc;
        }

        self.persist_edge(user, group).await
    }

    /// Add a member on the member's behalf. Only attendees can be ordinary
    /// members; managers are rejected.
    pub async fn add_group_member(&self, target: &mut User, group: &mut Group) -> Status {
        if target.role != Role::Attendee {
            return Status::PermissionDenied;
        }
        self.attend_group(target, group).await
    }

    /// Remove a member on the member's behalf.
    pub async fn remove_group_member(&self, target: &mut User, group: &mut Group) -> Status {
        if target.role != Role::Attendee {
            return Status::PermissionDenied;
        }
        self.quit_group(target, group).await
    }

    /// Create an activity under `group`: persist the child, then the parent
    /// holding the new reference.
    pub async fn create_activity(&self, group: &mut Group, activity: &Activity) -> Status {
        let rc = group.add_activity(&activity.uid);
        if rc.failed() {
            return rc;
        }

        if let Err(e) = self.store.put_activity(activity).await {
            group.remove_activity(&activity.uid);
            return fault("create_activity: persist activity", e);
        }
        if let Err(e) = self.store.put_group(group).await {
            return fault("create_activity: persist group", e);
        }

        Status::Ok
    }

    /// Delete an activity from `group`, cascading into its tasks.
    pub async fn delete_activity(&self, group: &mut Group, activity: &Activity) -> Status {
        let rc = group.remove_activity(&activity.uid);
        if rc.failed() {
            return rc;
        }

        // Cascade into child tasks, aborting on the first failure.
        let mut activity = activity.clone();
        for task_id in activity.tasks.clone() {
            let task = match self.store.get_task(&task_id).await {
                Ok(Some(t)) => t,
                Ok(None) => return Status::TaskNonExisting,
                Err(e) => return fault("delete_activity: load task", e),
            };
            let rc = self.delete_task(&mut activity, &task).await;
            if rc.failed() {
                return rc;
            }
        }

        if let Err(e) = self.store.put_group(group).await {
            return fault("delete_activity: persist group", e);
        }
        if let Err(e) = self.store.delete_activity(&activity.uid).await {
            return fault("delete_activity: delete document", e);
        }

        Status::Ok
    }

    /// Create a task under `activity`: persist the child, then the parent.
    pub async fn create_task(&self, activity: &mut Activity, task: &Task) -> Status {
        let rc = activity.add_task(&task.uid);
        if rc.failed() {
            return rc;
        }

        if let Err(e) = self.store.put_task(task).await {
            activity.remove_task(&task.uid);
            return fault("create_task: persist task", e);
        }
        if let Err(e) = self.store.put_activity(activity).await {
            return fault("create_task: persist activity", e);
        }

        Status::Ok
    }

    /// Delete a task from `activity`.
    pub async fn delete_task(&self, activity: &mut Activity, task: &Task) -> Status {
        let rc = activity.remove_task(&task.uid);
        if rc.failed() {
            return rc;
        }

        if let Err(e) = self.store.put_activity(activity).await {
            return fault("delete_task: persist activity", e);
        }
        if let Err(e) = self.store.delete_task(&task.uid).await {
            return fault("delete_task: delete document", e);
        }

        Status::Ok
    }

    /// Persist both sides of a completed edge mutation: member side first,
    /// attendee side second.
    async fn persist_edge(&self, user: &User, group: &Group) -> Status {
        if let Err(e) = self.store.put_group(group).await {
            return fault("edge: persist group", e);
        }
        if let Err(e) = self.store.put_user(user).await {
            return fault("edge: persist user", e);
        }
        Status::Ok
    }
}

fn fault(context: &str, err: RollcallError) -> Status {
    warn!("{}: {}", context, err);
    Status::Fault
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn manager() -> User {
        User::new(
            "boss".into(),
            "m-1".into(),
            "Boss".into(),
            Role::Manager,
            "hash".into(),
            "".into(),
        )
    }

    fn attendee(open_id: &str) -> User {
        User::new(
            open_id.into(),
            format!("a-{}", open_id),
            open_id.into(),
            Role::Attendee,
            "hash".into(),
            "".into(),
        )
    }

    fn group(name: &str) -> Group {
        Group::new(name.into(), "".into(), "boss".into(), "".into())
    }

    async fn seeded() -> (RelationManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let relations = RelationManager::new(store.clone());
        (relations, store)
    }

    #[tokio::test]
    async fn test_create_group_links_both_sides() {
        let (relations, store) = seeded().await;
        let mut user = manager();
        let g = group("Chess");

        assert_eq!(relations.create_group(&mut user, &g).await, Status::Ok);
        assert!(user.created_groups.contains(&g.uid));

        let loaded = store.get_group(&g.uid).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Chess");
        let loaded_user = store.get_user("boss").await.unwrap().unwrap();
        assert!(loaded_user.created_groups.contains(&g.uid));
    }

    #[tokio::test]
    async fn test_create_group_duplicate_name_rejected() {
        let (relations, store) = seeded().await;
        let mut user = manager();

        let first = group("Chess");
        assert_eq!(relations.create_group(&mut user, &first).await, Status::Ok);

        let second = group("Chess");
        assert_eq!(
            relations.create_group(&mut user, &second).await,
            Status::GroupExisting
        );
        assert_eq!(user.created_groups.len(), 1);
        assert!(store.get_group(&second.uid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attend_then_quit_round_trip() {
        let (relations, store) = seeded().await;
        let mut user = attendee("alice");
        let mut g = group("Chess");
        store.put_user(&user).await.unwrap();
        store.put_group(&g).await.unwrap();

        assert_eq!(relations.attend_group(&mut user, &mut g).await, Status::Ok);
        assert!(g.members.contains(&"alice".to_string()));
        assert!(user.attended_groups.contains(&g.uid));

        assert_eq!(relations.quit_group(&mut user, &mut g).await, Status::Ok);
        assert!(g.members.is_empty());
        assert!(user.attended_groups.is_empty());

        let loaded = store.get_group(&g.uid).await.unwrap().unwrap();
        assert!(loaded.members.is_empty());
        let loaded_user = store.get_user("alice").await.unwrap().unwrap();
        assert!(loaded_user.attended_groups.is_empty());
    }

    #[tokio::test]
    async fn test_attend_twice_rejected_without_mutation() {
        let (relations, _store) = seeded().await;
        let mut user = attendee("alice");
        let mut g = group("Chess");

        assert_eq!(relations.attend_group(&mut user, &mut g).await, Status::Ok);
        assert_eq!(
            relations.attend_group(&mut user, &mut g).await,
            Status::UserExisting
        );
        assert_eq!(g.members.len(), 1);
        assert_eq!(user.attended_groups.len(), 1);
    }

    #[tokio::test]
    async fn test_add_member_rejects_managers() {
        let (relations, _store) = seeded().await;
        let mut target = manager();
        let mut g = group("Chess");

        assert_eq!(
            relations.add_group_member(&mut target, &mut g).await,
            Status::PermissionDenied
        );
        assert!(g.members.is_empty());
    }

    #[tokio::test]
    async fn test_quit_without_attend_rejected() {
        let (relations, _store) = seeded().await;
        let mut user = attendee("alice");
        let mut g = group("Chess");

        assert_eq!(
            relations.quit_group(&mut user, &mut g).await,
            Status::UserNonExisting
        );
    }

    /// Edge B (the attended list) already holds the group id, so attend must
    /// reverse edge A and leave the store untouched.
    #[tokio::test]
    async fn test_attend_compensates_on_second_step_failure() {
        let (relations, store) = seeded().await;
        let mut user = attendee("alice");
        let mut g = group("Chess");
        // Poison edge B: the attended list already references the group.
        user.attended_groups.push(g.uid.clone());

        assert_eq!(
            relations.attend_group(&mut user, &mut g).await,
            Status::GroupExisting
        );
        // Edge A was reversed in memory...
        assert!(g.members.is_empty());
        // ...and no partial group persist occurred.
        assert!(store.get_group(&g.uid).await.unwrap().is_none());
    }

    /// Store wrapper that fails user writes on demand, for exercising the
    /// persist half of the edge discipline.
    struct FailingUserWrites {
        inner: MemoryStore,
        fail_user_puts: AtomicBool,
    }

    #[async_trait]
    impl EntityStore for FailingUserWrites {
        async fn get_user(&self, open_id: &str) -> crate::types::Result<Option<User>> {
            self.inner.get_user(open_id).await
        }
        async fn put_user(&self, user: &User) -> crate::types::Result<()> {
            if self.fail_user_puts.load(Ordering::SeqCst) {
                return Err(RollcallError::Database("injected write failure".into()));
            }
            self.inner.put_user(user).await
        }
        async fn delete_user(&self, open_id: &str) -> crate::types::Result<()> {
            self.inner.delete_user(open_id).await
        }
        async fn get_group(&self, uid: &str) -> crate::types::Result<Option<Group>> {
            self.inner.get_group(uid).await
        }
        async fn put_group(&self, group: &Group) -> crate::types::Result<()> {
            self.inner.put_group(group).await
        }
        async fn delete_group(&self, uid: &str) -> crate::types::Result<()> {
            self.inner.delete_group(uid).await
        }
        async fn get_activity(&self, uid: &str) -> crate::types::Result<Option<Activity>> {
            self.inner.get_activity(uid).await
        }
        async fn put_activity(&self, activity: &Activity) -> crate::types::Result<()> {
            self.inner.put_activity(activity).await
        }
        async fn delete_activity(&self, uid: &str) -> crate::types::Result<()> {
            self.inner.delete_activity(uid).await
        }
        async fn get_task(&self, uid: &str) -> crate::types::Result<Option<Task>> {
            self.inner.get_task(uid).await
        }
        async fn put_task(&self, task: &Task) -> crate::types::Result<()> {
            self.inner.put_task(task).await
        }
        async fn delete_task(&self, uid: &str) -> crate::types::Result<()> {
            self.inner.delete_task(uid).await
        }
        async fn find_groups_by_name(&self, fragment: &str) -> crate::types::Result<Vec<Group>> {
            self.inner.find_groups_by_name(fragment).await
        }
        async fn find_groups_by_place(&self, place: &str) -> crate::types::Result<Vec<Group>> {
            self.inner.find_groups_by_place(place).await
        }
    }

    #[tokio::test]
    async fn test_edge_persist_failure_maps_to_fault() {
        let store = Arc::new(FailingUserWrites {
            inner: MemoryStore::new(),
            fail_user_puts: AtomicBool::new(true),
        });
        let relations = RelationManager::new(store);
        let mut user = attendee("alice");
        let mut g = group("Chess");

        assert_eq!(
            relations.attend_group(&mut user, &mut g).await,
            Status::Fault
        );
    }

    #[tokio::test]
    async fn test_create_activity_and_task_chain() {
        let (relations, store) = seeded().await;
        let mut g = group("Chess");
        store.put_group(&g).await.unwrap();

        let mut a = Activity::new(
            "Tournament".into(),
            "Hall A".into(),
            "boss".into(),
            "sat 9am".into(),
            "boss".into(),
        );
        assert_eq!(relations.create_activity(&mut g, &a).await, Status::Ok);
        assert_eq!(
            relations.create_activity(&mut g, &a).await,
            Status::ActivityExisting
        );

        let t = Task::new("Check-in".into(), "Door".into(), "boss".into(), "boss".into());
        assert_eq!(relations.create_task(&mut a, &t).await, Status::Ok);
        assert_eq!(
            relations.create_task(&mut a, &t).await,
            Status::TaskExisting
        );

        let loaded = store.get_activity(&a.uid).await.unwrap().unwrap();
        assert!(loaded.tasks.contains(&t.uid));
    }

    #[tokio::test]
    async fn test_delete_group_cascades_fully() {
        let (relations, store) = seeded().await;
        let mut owner = manager();
        let mut member = attendee("alice");
        store.put_user(&member).await.unwrap();

        let mut g = group("Chess");
        assert_eq!(relations.create_group(&mut owner, &g).await, Status::Ok);
        assert_eq!(
            relations.attend_group(&mut member, &mut g).await,
            Status::Ok
        );

        // Two activities, one task each.
        let mut task_uids = Vec::new();
        let mut activity_uids = Vec::new();
        for i in 0..2 {
            let mut a = Activity::new(
                format!("act-{}", i),
                "".into(),
                "".into(),
                "".into(),
                "boss".into(),
            );
            assert_eq!(relations.create_activity(&mut g, &a).await, Status::Ok);
            let t = Task::new(format!("task-{}", i), "".into(), "".into(), "boss".into());
            assert_eq!(relations.create_task(&mut a, &t).await, Status::Ok);
            activity_uids.push(a.uid);
            task_uids.push(t.uid);
        }
        // Re-load the group so it carries the activity references.
        let g = store.get_group(&g.uid).await.unwrap().unwrap();

        assert_eq!(relations.delete_group(&mut owner, &g).await, Status::Ok);

        assert!(store.get_group(&g.uid).await.unwrap().is_none());
        for uid in &activity_uids {
            assert!(store.get_activity(uid).await.unwrap().is_none());
        }
        for uid in &task_uids {
            assert!(store.get_task(uid).await.unwrap().is_none());
        }
        assert!(!owner.created_groups.contains(&g.uid));
        let alice = store.get_user("alice").await.unwrap().unwrap();
        assert!(!alice.attended_groups.contains(&g.uid));
    }

    #[tokio::test]
    async fn test_delete_group_owner_as_member_single_save() {
        let (relations, store) = seeded().await;
        let mut owner = manager();

        let mut g = group("Chess");
        assert_eq!(relations.create_group(&mut owner, &g).await, Status::Ok);
        assert_eq!(relations.attend_group(&mut owner, &mut g).await, Status::Ok);

        let g = store.get_group(&g.uid).await.unwrap().unwrap();
        assert_eq!(relations.delete_group(&mut owner, &g).await, Status::Ok);

        let loaded = store.get_user("boss").await.unwrap().unwrap();
        assert!(!loaded.created_groups.contains(&g.uid));
        assert!(!loaded.attended_groups.contains(&g.uid));
    }
}
