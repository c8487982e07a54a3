use async_graphql::{Enum, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    Success,
    Failed,
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    User,
    Admin,
}

impl RoleType {
    pub fn rank(self) -> u8 {
        match self {
            RoleType::User => 1,
            RoleType::Admin => 2,
        }
    }
}

/// Event kinds carried by subscription payloads.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Created,
    Updated,
    Assigned,
    Claimed,
    Completed,
    Closed,
    Deleted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbAddress {
    pub street: String,
    pub unit: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub county: Option<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Address {
    pub street: String,
    pub unit: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub county: Option<String>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct AddressInput {
    pub street: String,
    pub unit: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub county: Option<String>,
}

impl From<AddressInput> for DbAddress {
    fn from(input: AddressInput) -> Self {
        DbAddress {
            street: input.street,
            unit: input.unit,
            city: input.city,
            state: input.state,
            zip: input.zip,
            county: input.county,
        }
    }
}

impl From<DbAddress> for Address {
    fn from(db: DbAddress) -> Self {
        Address {
            street: db.street,
            unit: db.unit,
            city: db.city,
            state: db.state,
            zip: db.zip,
            county: db.county,
        }
    }
}

/// Plain `{ message, status }` answer for mutations without a payload.
#[derive(SimpleObject, Debug, Clone)]
pub struct VoidResponse {
    pub message: String,
    pub status: StatusType,
}

impl VoidResponse {
    pub fn success(message: String) -> Self {
        VoidResponse { message, status: StatusType::Success }
    }

    pub fn failed(message: String) -> Self {
        VoidResponse { message, status: StatusType::Failed }
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Treats empty and whitespace-only strings as absent.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
