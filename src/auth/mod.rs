//! Authentication primitives
//!
//! Password hashing lives here; token issuance/validation is in
//! [`crate::token`] and the per-request stages in [`crate::pipeline`].

pub mod password;

pub use password::{hash_password, verify_password};
