use futures_util::future::join3;
use std::sync::Arc;

use super::{quietly, report};
use crate::app_state::AppState;
use crate::models::{CompanyConnection, ConnectPayload, ConnectionState, ConnectionView, NewConnection};
use crate::services::notifier::Notifier;
use crate::stores::{CompanyStore, ConnectionStore};

pub struct ConnectionActions {
    store: Arc<ConnectionStore>,
    companies: Arc<CompanyStore>,
    notifier: Arc<dyn Notifier>,
}

impl ConnectionActions {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.connections),
            companies: Arc::clone(&state.companies),
            notifier: Arc::clone(&state.notifier),
        }
    }

    /// Connections joined with the name of their company.
    pub fn connections(&self) -> Vec<ConnectionView> {
        self.store.with_companies(&self.companies.companies())
    }

    pub fn links(&self) -> Vec<CompanyConnection> {
        self.store.links()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.store.error()
    }

    /// Loads companies, connections and their links together.
    pub async fn fetch(&self) -> bool {
        let (companies, connections, links) =
            join3(self.companies.fetch(), self.store.fetch(), self.store.fetch_links()).await;

        let notifier = self.notifier.as_ref();
        let loaded = quietly(notifier, companies, "Failed to load companies").is_some()
            & quietly(notifier, connections, "Failed to load connections").is_some()
            & quietly(notifier, links, "Failed to load company connections").is_some();

        if loaded && !self.store.unlinked().is_empty() {
            notifier.warning("Some connections are not linked to a company");
        }
        loaded
    }

    pub async fn fetch_links(&self) -> bool {
        let loaded = quietly(
            self.notifier.as_ref(),
            self.store.fetch_links().await,
            "Failed to load company connections",
        )
        .is_some();
        if loaded && self.store.links().is_empty() {
            self.notifier.warning("No company connections found");
        }
        loaded
    }

    pub async fn create(&self, connection: &NewConnection) -> bool {
        let success = if connection.company_id.is_some() {
            "Connection created and linked to company"
        } else {
            "Connection created"
        };
        report(
            self.notifier.as_ref(),
            self.store.create(connection).await,
            success,
            "Failed to create connection",
        )
    }

    pub async fn link_company(&self, connection_id: i64, company_id: i64) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.link_company(connection_id, company_id).await,
            "Connection company updated",
            "Failed to update connection company",
        )
    }

    pub async fn connect(&self, name: &str) -> Option<ConnectPayload> {
        let payload = quietly(self.notifier.as_ref(), self.store.connect(name).await, "Failed to connect instance")?;
        self.notifier.success("Instance connection requested");
        Some(payload)
    }

    pub async fn state(&self, name: &str) -> Option<ConnectionState> {
        let state = quietly(self.notifier.as_ref(), self.store.state(name).await, "Failed to read connection state")?;
        if !state.is_open() {
            self.notifier
                .info(&format!("Connection {} is not open ({})", name, state.state));
        }
        Some(state)
    }

    pub async fn delete(&self, id: i64) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.delete(id).await,
            "Connection removed",
            "Failed to remove connection",
        )
    }
}
