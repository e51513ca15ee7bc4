//! Domain entities
//!
//! Users, groups, activities, and tasks as stored in the document store.
//! Relationships between entities are denormalized id-lists maintained on
//! both sides; the list operations here enforce the no-duplicates invariant
//! and report violations as wire status codes. Cross-document consistency
//! is the job of [`crate::relation`].

pub mod activity;
pub mod group;
pub mod task;
pub mod user;

pub use activity::{Activity, ACTIVITY_COLLECTION};
pub use group::{Group, GROUP_COLLECTION};
pub use task::{Task, TASK_COLLECTION};
pub use user::{Role, User, USER_COLLECTION};

/// Allocate a fresh opaque entity identifier.
pub fn random_uid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_uid_unique_and_opaque() {
        let a = random_uid();
        let b = random_uid();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(!a.contains('_'));
    }
}
