use serde::{Deserialize, Serialize};

use super::RecordStatus;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Admin => "Administrator",
            UserRole::User => "User",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default)]
    pub company_id: Option<i64>,
    /// Only sent on creation; never returned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User with display labels resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormattedUser {
    #[serde(flatten)]
    pub user: User,
    pub role_label: &'static str,
    pub status_label: &'static str,
}

impl From<User> for FormattedUser {
    fn from(user: User) -> Self {
        Self {
            role_label: user.role.label(),
            status_label: user.status.label(),
            user,
        }
    }
}
