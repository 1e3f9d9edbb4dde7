use serde::{Deserialize, Serialize};

use super::RecordStatus;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    /// Brazilian tax id. Stored digits-only; masks are a display concern.
    #[serde(default)]
    pub cnpj: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl Company {
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}
