//! Activity document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::IntoIndexes;
use crate::domain::random_uid;
use crate::status::Status;

/// Collection name for activities
pub const ACTIVITY_COLLECTION: &str = "activities";

/// Activity document stored in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Activity {
    /// Generated opaque identifier
    pub uid: String,

    /// Main title
    pub name: String,

    /// Place where the activity is held
    #[serde(default, rename = "where")]
    pub where_: String,

    /// Who hosts or manages the activity
    #[serde(default)]
    pub host: String,

    /// Time expression (free-form, interpreted by the client)
    #[serde(default)]
    pub time_exp: String,

    /// openId of the creating manager
    pub creator_open_id: String,

    /// uids of child tasks
    #[serde(default)]
    pub tasks: Vec<String>,
}

impl Activity {
    /// Create an activity with a freshly allocated uid.
    pub fn new(
        name: String,
        where_: String,
        host: String,
        time_exp: String,
        creator_open_id: String,
    ) -> Self {
        Self {
            uid: random_uid(),
            name,
            where_,
            host,
            time_exp,
            creator_open_id,
            tasks: Vec::new(),
        }
    }

    /// JSON view of the activity as returned by the info and listing endpoints.
    pub fn info(&self) -> Value {
        json!({
            "uid": self.uid,
            "name": self.name,
            "where": self.where_,
            "host": self.host,
            "timeExp": self.time_exp,
            "taskCount": self.tasks.len(),
        })
    }

    pub fn add_task(&mut self, task_id: &str) -> Status {
        if self.tasks.iter().any(|t| t == task_id) {
            return Status::TaskExisting;
        }
        self.tasks.push(task_id.to_string());
        Status::Ok
    }

    pub fn remove_task(&mut self, task_id: &str) -> Status {
        match self.tasks.iter().position(|t| t == task_id) {
            Some(idx) => {
                self.tasks.remove(idx);
                Status::Ok
            }
            None => Status::TaskNonExisting,
        }
    }
}

impl IntoIndexes for Activity {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_duplicate_rejected() {
        let mut activity =
            Activity::new("a".into(), "".into(), "".into(), "".into(), "owner".into());
        assert_eq!(activity.add_task("t1"), Status::Ok);
        assert_eq!(activity.add_task("t1"), Status::TaskExisting);
        assert_eq!(activity.tasks.len(), 1);
    }

    #[test]
    fn test_remove_missing_task_rejected() {
        let mut activity =
            Activity::new("a".into(), "".into(), "".into(), "".into(), "owner".into());
        assert_eq!(activity.remove_task("t1"), Status::TaskNonExisting);
    }
}
