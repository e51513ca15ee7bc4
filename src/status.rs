//! Wire status codes
//!
//! Closed enumeration of result codes returned by every endpoint. Each code
//! maps to an integer ordinal and a symbolic name, serialized as
//! `{"code": N, "msg": "E_*"}` inside the response envelope.

use serde::Serialize;
use serde_json::{json, Value};

/// Operation status code.
///
/// Ordinals 0-13 are fixed by the existing client wire contract;
/// `PasswordInvalid` was appended later and takes the next free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    Fault = 1,
    ServerFault = 2,
    TokenAuth = 3,
    UserExisting = 4,
    UserNonExisting = 5,
    PermissionDenied = 6,
    GroupExisting = 7,
    GroupNonExisting = 8,
    ActivityExisting = 9,
    ActivityNonExisting = 10,
    TaskExisting = 11,
    TaskNonExisting = 12,
    AssetNotFound = 13,
    PasswordInvalid = 14,
}

impl Status {
    /// Integer ordinal sent on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Symbolic name sent on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "E_OK",
            Status::Fault => "E_FAULT",
            Status::ServerFault => "E_SERVER_FAULT",
            Status::TokenAuth => "E_TOKEN_AUTH",
            Status::UserExisting => "E_USER_EXISTING",
            Status::UserNonExisting => "E_USER_NON_EXISTING",
            Status::PermissionDenied => "E_PERMISSION_DENIED",
            Status::GroupExisting => "E_GROUP_EXISTING",
            Status::GroupNonExisting => "E_GROUP_NON_EXISTING",
            Status::ActivityExisting => "E_ACTIVITY_EXISTING",
            Status::ActivityNonExisting => "E_ACTIVITY_NON_EXISTING",
            Status::TaskExisting => "E_TASK_EXISTING",
            Status::TaskNonExisting => "E_TASK_NON_EXISTING",
            Status::AssetNotFound => "E_ASSET_NOT_FOUND",
            Status::PasswordInvalid => "E_PASSWORD_INVALID",
        }
    }

    pub fn succeeded(self) -> bool {
        self == Status::Ok
    }

    pub fn failed(self) -> bool {
        !self.succeeded()
    }

    /// Wire representation of this status alone.
    pub fn to_wire(self) -> Value {
        json!({ "code": self.code(), "msg": self.name() })
    }
}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_wire().serialize(serializer)
    }
}

/// Build the response envelope `{"status": {...}, "data": ...}`.
pub fn envelope(status: Status, data: Option<Value>) -> Value {
    json!({
        "status": status.to_wire(),
        "data": data,
    })
}
