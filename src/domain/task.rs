//! Task document schema
//!
//! Leaf entity: tasks have no children, so deleting one never cascades.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::IntoIndexes;
use crate::domain::random_uid;

/// Collection name for tasks
pub const TASK_COLLECTION: &str = "tasks";

/// Task document stored in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Task {
    /// Generated opaque identifier
    pub uid: String,

    /// Main title
    pub name: String,

    /// Place where the task is held
    #[serde(default)]
    pub place: String,

    /// Who hosts or manages the task
    #[serde(default)]
    pub host: String,

    /// openId of the creating manager
    pub creator_open_id: String,
}

impl Task {
    /// Create a task with a freshly allocated uid.
    pub fn new(name: String, place: String, host: String, creator_open_id: String) -> Self {
        Self {
            uid: random_uid(),
            name,
            place,
            host,
            creator_open_id,
        }
    }

    pub fn basic_info(&self) -> Value {
        json!({
            "uid": self.uid,
            "name": self.name,
            "place": self.place,
            "host": self.host,
        })
    }
}

impl IntoIndexes for Task {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "uid": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("uid_unique".to_string())
                    .build(),
            ),
        )]
    }
}
