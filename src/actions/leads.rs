use std::sync::Arc;

use super::{quietly, report};
use crate::app_state::AppState;
use crate::models::{FormattedLead, FormattedList, Lead, LeadInput, NewValidationList};
use crate::services::notifier::Notifier;
use crate::stores::ValidationStore;

pub struct LeadActions {
    store: Arc<ValidationStore>,
    notifier: Arc<dyn Notifier>,
}

impl LeadActions {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.validation),
            notifier: Arc::clone(&state.notifier),
        }
    }

    pub fn validation_lists(&self) -> Vec<FormattedList> {
        self.store.formatted_lists()
    }

    pub fn leads(&self) -> Vec<FormattedLead> {
        self.store.formatted_leads()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.store.error()
    }

    pub async fn fetch_validation_lists(&self) -> bool {
        quietly(
            self.notifier.as_ref(),
            self.store.fetch_lists().await,
            "Failed to load validation lists",
        )
        .is_some()
    }

    pub async fn validate_leads(&self, leads: &[LeadInput]) -> Option<Vec<Lead>> {
        let checked = quietly(
            self.notifier.as_ref(),
            self.store.validate_leads(leads).await,
            "Failed to validate numbers",
        )?;
        let valid = checked.iter().filter(|lead| lead.exists).count();
        self.notifier
            .success(&format!("{} of {} numbers are valid", valid, checked.len()));
        Some(checked)
    }

    pub async fn save_validation_list(&self, list: &NewValidationList) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.save_list(list).await,
            "List saved",
            "Failed to save list",
        )
    }

    pub async fn validate_list(&self, id: i64) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.validate_list(id).await,
            "List validation started",
            "Failed to validate list",
        )
    }

    pub async fn delete_validation_list(&self, id: i64) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.delete_list(id).await,
            "List deleted",
            "Failed to delete list",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifier::Level;
    use crate::testing::{harness, url};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn validate_then_save_flow() {
        let h = harness();
        h.transport.respond(
            Method::POST,
            &url("validation"),
            200,
            json!([
                { "success": true, "data": [{ "exists": true, "jid": "551199990001@s.whatsapp.net" }] },
                { "success": false }
            ]),
        );
        h.transport.respond(Method::POST, &url("validation/save"), 200, json!({ "id": 8 }));
        h.transport.respond(Method::GET, &url("validation/list"), 200, json!([{ "leads": [] }, { "lists": [] }]));
        let actions = LeadActions::new(&h.state);

        let input = vec![
            LeadInput {
                name: "Ana".to_string(),
                number: "551199990001".to_string(),
            },
            LeadInput {
                name: "Bia".to_string(),
                number: "551199990002".to_string(),
            },
        ];
        let checked = actions.validate_leads(&input).await.unwrap();
        assert_eq!(h.notifier.drain()[0].message, "1 of 2 numbers are valid");

        let saved = actions
            .save_validation_list(&NewValidationList {
                name: "May".to_string(),
                leads: checked,
                company_id: None,
            })
            .await;

        assert!(saved);
        let sent = h.transport.last_body(Method::POST, &url("validation/save")).unwrap();
        assert_eq!(sent["valid_leads"], 1);
        assert!(sent.get("company_id").is_none());
        assert_eq!(h.notifier.drain()[0].level, Level::Success);
    }
}
