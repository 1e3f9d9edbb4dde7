use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationType {
    /// Self-hosted messaging instance.
    #[default]
    Evolution,
    /// Managed business messaging API.
    Business,
}

/// Reference to an approved template on the business API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessTemplateRef {
    pub template_id: String,
    pub name: String,
    pub language: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub template_name: String,
    #[serde(default)]
    pub template_message: String,
    #[serde(default)]
    pub template_connection: Option<String>,
    #[serde(default)]
    pub template_list_id: Option<i64>,
    #[serde(default)]
    pub template_list_name: Option<String>,
    #[serde(default)]
    pub integration_type: IntegrationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_template: Option<BusinessTemplateRef>,
    #[serde(default)]
    pub custom_fields: Vec<Value>,
    #[serde(default)]
    pub ai_responses: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Template {
    /// Business templates are sent by reference, so the reference must exist.
    pub fn check_integration(&self) -> Result<(), String> {
        match (self.integration_type, &self.business_template) {
            (IntegrationType::Business, None) => Err(format!(
                "template '{}' targets the business API but has no business template",
                self.template_name
            )),
            _ => Ok(()),
        }
    }
}

/// Approved template as listed by the business API for one connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub components: Vec<Value>,
}
