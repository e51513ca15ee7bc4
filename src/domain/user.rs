//! User document schema
//!
//! A user is identified by its external `open_id` (issued by the identity
//! provider) rather than a generated uid. The role is fixed at registration.

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::db::mongo::IntoIndexes;
use crate::status::Status;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User role, immutable after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Ordinary member of groups.
    #[default]
    Attendee,
    /// Organizer; may create and own groups.
    Manager,
}

impl Role {
    /// Decode the numeric wire form used by `/usr/reg` (0 = attendee, 1 = manager).
    pub fn from_wire(value: i64) -> Option<Role> {
        match value {
            0 => Some(Role::Attendee),
            1 => Some(Role::Manager),
            _ => None,
        }
    }
}

/// User document stored in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct User {
    /// External identifier, fixed after registration
    pub open_id: String,

    /// Secondary ID code (e.g. student number)
    pub code: String,

    /// Real name
    pub real_name: String,

    /// Role, immutable after registration
    #[serde(default)]
    pub role: Role,

    /// Argon2 PHC hash of the password
    pub password_hash: String,

    /// Place recorded at registration
    #[serde(default)]
    pub place: String,

    /// uids of groups this user created (managers only)
    #[serde(default)]
    pub created_groups: Vec<String>,

    /// uids of groups this user attends
    #[serde(default)]
    pub attended_groups: Vec<String>,
}

impl User {
    pub fn new(
        open_id: String,
        code: String,
        real_name: String,
        role: Role,
        password_hash: String,
        place: String,
    ) -> Self {
        Self {
            open_id,
            code,
            real_name,
            role,
            password_hash,
            place,
            created_groups: Vec::new(),
            attended_groups: Vec::new(),
        }
    }

    pub fn add_created_group(&mut self, group_id: &str) -> Status {
        if self.created_groups.iter().any(|g| g == group_id) {
            return Status::GroupExisting;
        }
        self.created_groups.push(group_id.to_string());
        Status::Ok
    }

    pub fn remove_created_group(&mut self, group_id: &str) -> Status {
        match self.created_groups.iter().position(|g| g == group_id) {
            Some(idx) => {
                self.created_groups.remove(idx);
                Status::Ok
            }
            None => Status::GroupNonExisting,
        }
    }

    pub fn add_attended_group(&mut self, group_id: &str) -> Status {
        if self.attended_groups.iter().any(|g| g == group_id) {
            return Status::GroupExisting;
        }
        self.attended_groups.push(group_id.to_string());
        Status::Ok
    }

    pub fn remove_attended_group(&mut self, group_id: &str) -> Status {
        match self.attended_groups.iter().position(|g| g == group_id) {
            Some(idx) => {
                self.attended_groups.remove(idx);
                Status::Ok
            }
            None => Status::GroupNonExisting,
        }
    }

    /// Public subset of the user record, safe to show other members.
    pub fn basic_info(&self) -> Value {
        json!({
            "openId": self.open_id,
            "realName": self.real_name,
        })
    }

    /// Full profile returned to the user itself by `/usr/info`.
    pub fn full_info(&self) -> Value {
        json!({
            "openId": self.open_id,
            "code": self.code,
            "realName": self.real_name,
            "role": self.role,
            "place": self.place,
            "createdGroups": self.created_groups,
            "attendedGroups": self.attended_groups,
        })
    }
}

impl IntoIndexes for User {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "open_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("open_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}
