//! Entity store gateway
//!
//! CRUD access to User/Group/Activity/Task documents keyed by identifier.
//! The store offers per-document atomic writes only; nothing here spans
//! documents. [`MongoStore`] is the production backend, `MemoryStore`
//! (dev mode, tests) lives in [`crate::db::memory`].

use async_trait::async_trait;
use bson::doc;

use crate::db::mongo::MongoClient;
use crate::domain::{
    Activity, Group, Task, User, ACTIVITY_COLLECTION, GROUP_COLLECTION, TASK_COLLECTION,
    USER_COLLECTION,
};
use crate::types::Result;

/// Gateway to the entity document store.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_user(&self, open_id: &str) -> Result<Option<User>>;
    async fn put_user(&self, user: &User) -> Result<()>;
    async fn delete_user(&self, open_id: &str) -> Result<()>;

    async fn get_group(&self, uid: &str) -> Result<Option<Group>>;
    async fn put_group(&self, group: &Group) -> Result<()>;
    async fn delete_group(&self, uid: &str) -> Result<()>;

    async fn get_activity(&self, uid: &str) -> Result<Option<Activity>>;
    async fn put_activity(&self, activity: &Activity) -> Result<()>;
    async fn delete_activity(&self, uid: &str) -> Result<()>;

    async fn get_task(&self, uid: &str) -> Result<Option<Task>>;
    async fn put_task(&self, task: &Task) -> Result<()>;
    async fn delete_task(&self, uid: &str) -> Result<()>;

    /// Groups whose name contains the given fragment.
    async fn find_groups_by_name(&self, fragment: &str) -> Result<Vec<Group>>;

    /// Groups created at the given place.
    async fn find_groups_by_place(&self, place: &str) -> Result<Vec<Group>>;
}

/// MongoDB-backed entity store.
#[derive(Clone)]
pub struct MongoStore {
    mongo: MongoClient,
}

impl MongoStore {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }
}

#[async_trait]
impl EntityStore for MongoStore {
    async fn get_user(&self, open_id: &str) -> Result<Option<User>> {
        let collection = self.mongo.collection::<User>(USER_COLLECTION).await?;
        collection.find_one(doc! { "open_id": open_id }).await
    }

    async fn put_user(&self, user: &User) -> Result<()> {
        let collection = self.mongo.collection::<User>(USER_COLLECTION).await?;
        collection
            .upsert(doc! { "open_id": &user.open_id }, user)
            .await
    }

    async fn delete_user(&self, open_id: &str) -> Result<()> {
        let collection = self.mongo.collection::<User>(USER_COLLECTION).await?;
        collection.delete_one(doc! { "open_id": open_id }).await
    }

    async fn get_group(&self, uid: &str) -> Result<Option<Group>> {
        let collection = self.mongo.collection::<Group>(GROUP_COLLECTION).await?;
        collection.find_one(doc! { "uid": uid }).await
    }

    async fn put_group(&self, group: &Group) -> Result<()> {
        let collection = self.mongo.collection::<Group>(GROUP_COLLECTION).await?;
        collection.upsert(doc! { "uid": &group.uid }, group).await
    }

    async fn delete_group(&self, uid: &str) -> Result<()> {
        let collection = self.mongo.collection::<Group>(GROUP_COLLECTION).await?;
        collection.delete_one(doc! { "uid": uid }).await
    }

    async fn get_activity(&self, uid: &str) -> Result<Option<Activity>> {
        let collection = self
            .mongo
            .collection::<Activity>(ACTIVITY_COLLECTION)
            .await?;
        collection.find_one(doc! { "uid": uid }).await
    }

    async fn put_activity(&self, activity: &Activity) -> Result<()> {
        let collection = self
            .mongo
            .collection::<Activity>(ACTIVITY_COLLECTION)
            .await?;
        collection
            .upsert(doc! { "uid": &activity.uid }, activity)
            .await
    }

    async fn delete_activity(&self, uid: &str) -> Result<()> {
        let collection = self
            .mongo
            .collection::<Activity>(ACTIVITY_COLLECTION)
            .await?;
        collection.delete_one(doc! { "uid": uid }).await
    }

    async fn get_task(&self, uid: &str) -> Result<Option<Task>> {
        let collection = self.mongo.collection::<Task>(TASK_COLLECTION).await?;
        collection.find_one(doc! { "uid": uid }).await
    }

    async fn put_task(&self, task: &Task) -> Result<()> {
        let collection = self.mongo.collection::<Task>(TASK_COLLECTION).await?;
        collection.upsert(doc! { "uid": &task.uid }, task).await
    }

    async fn delete_task(&self, uid: &str) -> Result<()> {
        let collection = self.mongo.collection::<Task>(TASK_COLLECTION).await?;
        collection.delete_one(doc! { "uid": uid }).await
    }

    async fn find_groups_by_name(&self, fragment: &str) -> Result<Vec<Group>> {
        let collection = self.mongo.collection::<Group>(GROUP_COLLECTION).await?;
        let escaped = regex_escape(fragment);
        collection
            .find_many(doc! { "name": { "$regex": escaped, "$options": "i" } })
            .await
    }

    async fn find_groups_by_place(&self, place: &str) -> Result<Vec<Group>> {
        let collection = self.mongo.collection::<Group>(GROUP_COLLECTION).await?;
        collection.find_many(doc! { "place": place }).await
    }
}

/// Escape a user-supplied fragment for use inside a $regex filter.
fn regex_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if ".^$*+?()[]{}|\\".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
