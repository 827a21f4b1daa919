use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ReservationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Owner,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            other => Err(ReservationError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

/// A customer or owner record as returned by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: Uuid,
    pub role: Role,
    pub display_name: String,
}

impl Party {
    pub fn new(id: Uuid, role: Role, display_name: &str) -> Self {
        Self { id, role, display_name: display_name.to_string() }
    }
}
