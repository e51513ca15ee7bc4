//! Group document schema
//!
//! Members and activities are id-lists: openIds of attending users and uids
//! of child activities. The creator owns the group but is not automatically
//! a member.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::IntoIndexes;
use crate::domain::random_uid;
use crate::status::Status;

/// Collection name for groups
pub const GROUP_COLLECTION: &str = "groups";

/// Group document stored in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Group {
    /// Generated opaque identifier
    pub uid: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub desc: String,

    /// openId of the creating manager
    pub creator_open_id: String,

    /// Place where the group was created
    #[serde(default)]
    pub place: String,

    /// openIds of attending members
    #[serde(default)]
    pub members: Vec<String>,

    /// uids of child activities
    #[serde(default)]
    pub activities: Vec<String>,
}

impl Group {
    /// Create a group with a freshly allocated uid.
    pub fn new(name: String, desc: String, creator_open_id: String, place: String) -> Self {
        Self {
            uid: random_uid(),
            name,
            desc,
            creator_open_id,
            place,
            members: Vec::new(),
            activities: Vec::new(),
        }
    }

    pub fn add_member(&mut self, open_id: &str) -> Status {
        if self.members.iter().any(|m| m == open_id) {
            return Status::UserExisting;
        }
        self.members.push(open_id.to_string());
        Status::Ok
    }

    pub fn remove_member(&mut self, open_id: &str) -> Status {
        match self.members.iter().position(|m| m == open_id) {
            Some(idx) => {
                self.members.remove(idx);
                Status::Ok
            }
            None => Status::UserNonExisting,
        }
    }

    /// JSON view of the group as returned by the info and listing endpoints.
    pub fn info(&self) -> Value {
        json!({
            "uid": self.uid,
            "name": self.name,
            "desc": self.desc,
            "creatorOpenId": self.creator_open_id,
            "place": self.place,
            "memberCount": self.members.len(),
        })
    }

    pub fn add_activity(&mut self, activity_id: &str) -> Status {
        if self.activities.iter().any(|a| a == activity_id) {
            return Status::ActivityExisting;
        }
        self.activities.push(activity_id.to_string());
        Status::Ok
    }

    pub fn remove_activity(&mut self, activity_id: &str) -> Status {
        match self.activities.iter().position(|a| a == activity_id) {
            Some(idx) => {
                self.activities.remove(idx);
                Status::Ok
            }
            None => Status::ActivityNonExisting,
        }
    }
}

impl IntoIndexes for Group {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "uid": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("uid_unique".to_string())
                        .build(),
                ),
            ),
            // Discovery queries filter on name and place
            (
                doc! { "name": 1 },
                Some(IndexOptions::builder().name("name_index".to_string()).build()),
            ),
            (
                doc! { "place": 1 },
                Some(IndexOptions::builder().name("place_index".to_string()).build()),
            ),
        ]
    }
}
