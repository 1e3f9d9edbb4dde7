use serde_json::Value;
use std::sync::Arc;

use super::{quietly, report};
use crate::app_state::AppState;
use crate::models::{BusinessTemplate, Template};
use crate::services::notifier::Notifier;
use crate::stores::{TemplateStore, ValidationStore};

pub struct TemplateActions {
    store: Arc<TemplateStore>,
    lists: Arc<ValidationStore>,
    notifier: Arc<dyn Notifier>,
}

impl TemplateActions {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.templates),
            lists: Arc::clone(&state.validation),
            notifier: Arc::clone(&state.notifier),
        }
    }

    pub fn templates(&self) -> Vec<Template> {
        self.store.templates()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.store.error()
    }

    pub async fn fetch(&self) -> bool {
        quietly(self.notifier.as_ref(), self.store.fetch().await, "Failed to load templates").is_some()
    }

    pub async fn create(&self, template: &Template) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.create(template).await,
            "Template created",
            "Failed to create template",
        )
    }

    pub async fn update(&self, template: &Template) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.update(template).await,
            "Template updated",
            "Failed to update template",
        )
    }

    pub async fn delete(&self, id: i64) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.delete(id).await,
            "Template deleted",
            "Failed to delete template",
        )
    }

    /// Sends the template to its list. The list details come from the
    /// validation lists already loaded.
    pub async fn execute(&self, template: &Template) -> Option<Value> {
        let list = template.template_list_id.and_then(|id| self.lists.find(id));
        if template.template_list_id.is_some() && list.is_none() {
            self.notifier
                .warning("Template list is not loaded; sending without list details");
        }
        let body = quietly(
            self.notifier.as_ref(),
            self.store.execute(template, list.as_ref()).await,
            "Failed to execute template",
        )?;
        self.notifier.success("Template sent for execution");
        Some(body)
    }

    pub async fn fetch_business_templates(&self, connection: &str) -> Option<Vec<BusinessTemplate>> {
        quietly(
            self.notifier.as_ref(),
            self.store.fetch_business_templates(connection).await,
            "Failed to load business templates",
        )
    }
}
