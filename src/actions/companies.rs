use std::sync::Arc;

use super::{quietly, report};
use crate::app_state::AppState;
use crate::models::Company;
use crate::services::notifier::Notifier;
use crate::stores::CompanyStore;

pub struct CompanyActions {
    store: Arc<CompanyStore>,
    notifier: Arc<dyn Notifier>,
}

impl CompanyActions {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.companies),
            notifier: Arc::clone(&state.notifier),
        }
    }

    pub fn companies(&self) -> Vec<Company> {
        self.store.companies()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.store.error()
    }

    pub async fn fetch(&self) -> bool {
        quietly(self.notifier.as_ref(), self.store.fetch().await, "Failed to load companies").is_some()
    }

    pub async fn fetch_one(&self, id: i64) -> Option<Company> {
        quietly(self.notifier.as_ref(), self.store.fetch_one(id).await, "Failed to load company")
    }

    pub async fn create(&self, company: &Company) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.create(company).await,
            "Company created",
            "Failed to create company",
        )
    }

    pub async fn update(&self, company: &Company) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.update(company).await,
            "Company updated",
            "Failed to update company",
        )
    }

    pub async fn delete(&self, id: i64) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.delete(id).await,
            "Company deleted",
            "Failed to delete company",
        )
    }
}
