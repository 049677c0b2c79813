//! Read permissions on fields, and the user they are checked against.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everyone, including logged-out users.
pub const GUESTS_GROUP: &str = "guests";
/// Every logged-in user.
pub const MEMBERS_GROUP: &str = "members";
/// Users with the admin flag.
pub const ADMINS_GROUP: &str = "admins";

/// A single read permission check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ReadPermission {
    /// Membership of a user group.
    Group(String),
    /// A named check on the user.
    Predicate { predicate: PermissionPredicate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPredicate {
    LoggedIn,
    Admin,
}

/// The user a query is compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
}
