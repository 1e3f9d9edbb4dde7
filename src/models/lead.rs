use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::flexible_timestamp;

/// A contact inside a validation list. Field names follow the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "numero")]
    pub number: String,
    pub exists: bool,
    #[serde(default)]
    pub jid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<i64>,
}

/// A contact that has not been checked against the messaging network yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadInput {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "numero")]
    pub number: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationList {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub company_id: Option<i64>,
    pub total_leads: u32,
    pub valid_leads: u32,
    pub invalid_leads: u32,
    #[serde(with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ValidationList {
    /// Share of valid leads, rounded half up. Zero for empty lists.
    pub fn valid_leads_percentage(&self) -> u32 {
        if self.total_leads == 0 {
            return 0;
        }
        let total = u64::from(self.total_leads);
        ((u64::from(self.valid_leads) * 200 + total) / (2 * total)) as u32
    }

    pub fn counts_consistent(&self) -> bool {
        u64::from(self.valid_leads) + u64::from(self.invalid_leads) == u64::from(self.total_leads)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormattedList {
    #[serde(flatten)]
    pub list: ValidationList,
    pub valid_leads_percentage: u32,
}

impl From<ValidationList> for FormattedList {
    fn from(list: ValidationList) -> Self {
        let valid_leads_percentage = list.valid_leads_percentage();
        Self {
            list,
            valid_leads_percentage,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Valid,
    Invalid,
}

impl LeadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::Valid => "Valid",
            LeadStatus::Invalid => "Invalid",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormattedLead {
    #[serde(flatten)]
    pub lead: Lead,
    pub status: LeadStatus,
}

impl From<Lead> for FormattedLead {
    fn from(lead: Lead) -> Self {
        let status = if lead.exists {
            LeadStatus::Valid
        } else {
            LeadStatus::Invalid
        };
        Self { lead, status }
    }
}

/// Data needed to persist a checked list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewValidationList {
    pub name: String,
    pub leads: Vec<Lead>,
    pub company_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(total: u32, valid: u32, invalid: u32) -> ValidationList {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "March leads",
            "total_leads": total,
            "valid_leads": valid,
            "invalid_leads": invalid,
            "created_at": "2024-03-01 12:00:00"
        }))
        .unwrap()
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(list(3, 2, 1).valid_leads_percentage(), 67);
        assert_eq!(list(8, 1, 7).valid_leads_percentage(), 13);
        assert_eq!(list(2, 1, 1).valid_leads_percentage(), 50);
        assert_eq!(list(0, 0, 0).valid_leads_percentage(), 0);
    }

    #[test]
    fn detects_inconsistent_counts() {
        assert!(list(3, 2, 1).counts_consistent());
        assert!(!list(5, 2, 1).counts_consistent());
    }

    #[test]
    fn lead_uses_backend_field_names() {
        let lead: Lead = serde_json::from_value(serde_json::json!({
            "nome": "Ana",
            "numero": "5511999990000",
            "exists": true,
            "jid": "5511999990000@s.whatsapp.net"
        }))
        .unwrap();
        assert_eq!(lead.name, "Ana");
        assert_eq!(FormattedLead::from(lead).status, LeadStatus::Valid);
    }

    #[test]
    fn negative_counts_do_not_decode() {
        let result: Result<ValidationList, _> = serde_json::from_value(serde_json::json!({
            "id": 2,
            "name": "broken",
            "total_leads": -1,
            "valid_leads": 0,
            "invalid_leads": 0,
            "created_at": "2024-03-01"
        }));
        assert!(result.is_err());
    }
}
