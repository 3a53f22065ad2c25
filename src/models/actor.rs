//! Actor identity for finance operations.
//!
//! Identity itself is established upstream (the gateway authenticates the
//! caller); the finance service only needs the uid and marketplace role to
//! scope queries and enforce ownership rules.

use serde::{Deserialize, Serialize};

/// Marketplace role of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Carrier,
    Driver,
    Shipper,
    Broker,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Carrier => "carrier",
            UserRole::Driver => "driver",
            UserRole::Shipper => "shipper",
            UserRole::Broker => "broker",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "carrier" => Some(UserRole::Carrier),
            "driver" => Some(UserRole::Driver),
            "shipper" => Some(UserRole::Shipper),
            "broker" => Some(UserRole::Broker),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Authenticated caller performing a finance operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub uid: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(uid: impl Into<String>, role: UserRole) -> Self {
        Self {
            uid: uid.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
