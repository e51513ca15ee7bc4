//! In-memory entity store
//!
//! Backs dev mode when MongoDB is unreachable, and the unit tests for the
//! relationship manager and pipeline. Same per-document semantics as the
//! MongoDB store: each put/delete is atomic, nothing spans documents.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::store::EntityStore;
use crate::domain::{Activity, Group, Task, User};
use crate::types::Result;

/// DashMap-backed entity store.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    groups: DashMap<String, Group>,
    activities: DashMap<String, Activity>,
    tasks: DashMap<String, Task>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_user(&self, open_id: &str) -> Result<Option<User>> {
        Ok(self.users.get(open_id).map(|u| u.value().clone()))
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        self.users.insert(user.open_id.clone(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, open_id: &str) -> Result<()> {
        self.users.remove(open_id);
        Ok(())
    }

    async fn get_group(&self, uid: &str) -> Result<Option<Group>> {
        Ok(self.groups.get(uid).map(|g| g.value().clone()))
    }

    async fn put_group(&self, group: &Group) -> Result<()> {
        self.groups.insert(group.uid.clone(), group.clone());
        Ok(())
    }

    async fn delete_group(&self, uid: &str) -> Result<()> {
        self.groups.remove(uid);
        Ok(())
    }

    async fn get_activity(&self, uid: &str) -> Result<Option<Activity>> {
        Ok(self.activities.get(uid).map(|a| a.value().clone()))
    }

    async fn put_activity(&self, activity: &Activity) -> Result<()> {
        self.activities.insert(activity.uid.clone(), activity.clone());
        Ok(())
    }

    async fn delete_activity(&self, uid: &str) -> Result<()> {
        self.activities.remove(uid);
        Ok(())
    }

    async fn get_task(&self, uid: &str) -> Result<Option<Task>> {
        Ok(self.tasks.get(uid).map(|t| t.value().clone()))
    }

    async fn put_task(&self, task: &Task) -> Result<()> {
        self.tasks.insert(task.uid.clone(), task.clone());
        Ok(())
    }

    async fn delete_task(&self, uid: &str) -> Result<()> {
        self.tasks.remove(uid);
        Ok(())
    }

    async fn find_groups_by_name(&self, fragment: &str) -> Result<Vec<Group>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .groups
            .iter()
            .filter(|g| g.name.to_lowercase().contains(&needle))
            .map(|g| g.value().clone())
            .collect())
    }

    async fn find_groups_by_place(&self, place: &str) -> Result<Vec<Group>> {
        Ok(self
            .groups
            .iter()
            .filter(|g| g.place == place)
            .map(|g| g.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    #[tokio::test]
    async fn test_user_round_trip() {
        let store = MemoryStore::new();
        let user = User::new(
            "oid-1".into(),
            "c1".into(),
            "Alice".into(),
            Role::Attendee,
            "hash".into(),
            "".into(),
        );

        store.put_user(&user).await.unwrap();
        let loaded = store.get_user("oid-1").await.unwrap().unwrap();
        assert_eq!(loaded.real_name, "Alice");

        store.delete_user("oid-1").await.unwrap();
        assert!(store.get_user("oid-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_group_discovery_filters() {
        let store = MemoryStore::new();
        let mut g1 = Group::new("Chess Club".into(), "".into(), "o".into(), "North".into());
        let g2 = Group::new("Running".into(), "".into(), "o".into(), "South".into());
        g1.desc = "weekly".into();
        store.put_group(&g1).await.unwrap();
        store.put_group(&g2).await.unwrap();

        let by_name = store.find_groups_by_name("chess").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].uid, g1.uid);

        let by_place = store.find_groups_by_place("South").await.unwrap();
        assert_eq!(by_place.len(), 1);
        assert_eq!(by_place[0].uid, g2.uid);
    }
}
