use serde_json::{Value, json};

use crate::config::{CompanyConnectionEndpoints, ConnectionEndpoints};
use crate::errors::AppError;
use crate::models::{Company, CompanyConnection, ConnectPayload, Connection, ConnectionState, ConnectionView, NewConnection};
use crate::services::envelope::{decode_collection, decode_object, single_object};
use crate::services::http_client::ApiClient;
use crate::services::request_guard::{FetchOutcome, GuardedState, Operation};
use crate::services::retry::{Backoff, retry_with_backoff};
use crate::services::validation::{require_id, require_text};

pub struct ConnectionStore {
    client: ApiClient,
    endpoints: ConnectionEndpoints,
    link_endpoints: CompanyConnectionEndpoints,
    backoff: Backoff,
    state: GuardedState<Vec<Connection>>,
    links: GuardedState<Vec<CompanyConnection>>,
}

impl ConnectionStore {
    pub fn new(
        client: ApiClient,
        endpoints: ConnectionEndpoints,
        link_endpoints: CompanyConnectionEndpoints,
        backoff: Backoff,
    ) -> Self {
        Self {
            client,
            endpoints,
            link_endpoints,
            backoff,
            state: GuardedState::new(),
            links: GuardedState::new(),
        }
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.state.snapshot()
    }

    pub fn links(&self) -> Vec<CompanyConnection> {
        self.links.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading() || self.links.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.error().or_else(|| self.links.error())
    }

    pub async fn fetch(&self) -> Result<FetchOutcome, AppError> {
        let client = self.client.clone();
        let url = self.endpoints.list.clone();
        self.state
            .fetch_with(|_| async move {
                let body = client.get(&url).await?;
                Ok(decode_collection::<Connection>(body, &["connections"], "connection").items)
            })
            .await
    }

    pub async fn fetch_links(&self) -> Result<FetchOutcome, AppError> {
        let client = self.client.clone();
        let url = self.link_endpoints.list.clone();
        self.links
            .fetch_with(|_| async move {
                let body = client.get(&url).await?;
                Ok(decode_collection::<CompanyConnection>(body, &["links", "companies_connections"], "company connection").items)
            })
            .await
    }

    /// Creates the instance and, when a company is given, links it.
    /// Returns the id of the new connection.
    pub async fn create(&self, connection: &NewConnection) -> Result<i64, AppError> {
        let id = self
            .state
            .track_mutation(Operation::Create, async {
                require_text(&connection.name, "Connection name")?;
                let body = self.client.post(&self.endpoints.create, connection).await?;
                let id = single_object(body)?
                    .get("id")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| AppError::Payload("connection id missing from create response".to_string()))?;

                if let Some(company_id) = connection.company_id {
                    self.post_link(company_id, id).await?;
                }
                Ok(id)
            })
            .await?;
        log::info!("Created connection {} ({})", connection.name, id);
        self.refetch().await;
        Ok(id)
    }

    /// Points an existing connection at another company.
    pub async fn link_company(&self, connection_id: i64, company_id: i64) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Link, async {
                if !self.state.read(|all| all.iter().any(|c| c.id == connection_id)) {
                    return Err(AppError::NotFound(format!("Connection {} not found", connection_id)));
                }
                self.post_link(company_id, connection_id).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    pub async fn update_link(&self, link: &CompanyConnection) -> Result<Value, AppError> {
        let body = self
            .links
            .track_mutation(Operation::Update, async {
                require_id(link.id, "Company connection")?;
                self.client.put(&self.link_endpoints.update, link).await
            })
            .await?;
        self.refetch_links().await;
        Ok(body)
    }

    pub async fn delete_link(&self, link_id: i64) -> Result<Value, AppError> {
        let body = self
            .links
            .track_mutation(Operation::Delete, async {
                self.client
                    .delete(&self.link_endpoints.delete, &json!({ "id": link_id }))
                    .await
            })
            .await?;
        self.refetch_links().await;
        Ok(body)
    }

    /// Asks the provider to (re)connect the instance, retrying while it is
    /// not ready.
    pub async fn connect(&self, name: &str) -> Result<ConnectPayload, AppError> {
        let payload = self
            .state
            .track_mutation(Operation::Connect, async {
                require_text(name, "Connection name")?;
                let label = format!("Connecting instance {}", name);
                let payload = json!({ "name": name });
                let body = retry_with_backoff(self.backoff, &label, |_| {
                    self.client.post(&self.endpoints.connect, &payload)
                })
                .await?;
                if body.is_null() {
                    return Ok(ConnectPayload::default());
                }
                decode_object::<ConnectPayload>(body, None)
            })
            .await?;
        self.refetch().await;
        Ok(payload)
    }

    pub async fn state(&self, name: &str) -> Result<ConnectionState, AppError> {
        require_text(name, "Connection name")?;
        let body = self
            .client
            .get_with_query(&self.endpoints.state, &[("name", name)])
            .await?;
        decode_object::<ConnectionState>(body, Some("instance"))
    }

    pub async fn delete(&self, id: i64) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Delete, async {
                self.client.delete(&self.endpoints.delete, &json!({ "id": id })).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    /// Company a connection belongs to, from the record itself or the link table.
    pub fn company_of(&self, connection: &Connection) -> Option<i64> {
        connection.company_id.or_else(|| {
            self.links.read(|links| {
                links
                    .iter()
                    .find(|link| link.connection_id == connection.id)
                    .map(|link| link.company_id)
            })
        })
    }

    pub fn unlinked(&self) -> Vec<Connection> {
        self.connections()
            .into_iter()
            .filter(|connection| self.company_of(connection).is_none())
            .collect()
    }

    pub fn with_companies(&self, companies: &[Company]) -> Vec<ConnectionView> {
        self.connections()
            .into_iter()
            .map(|connection| {
                let linked_company_id = self.company_of(&connection);
                let company_name = linked_company_id
                    .and_then(|id| companies.iter().find(|c| c.id == Some(id)))
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| "N/A".to_string());
                ConnectionView {
                    connection,
                    linked_company_id,
                    company_name,
                }
            })
            .collect()
    }

    async fn post_link(&self, company_id: i64, connection_id: i64) -> Result<Value, AppError> {
        let link = CompanyConnection {
            id: None,
            company_id,
            connection_id,
        };
        self.client.post(&self.link_endpoints.create, &link).await
    }

    async fn refetch(&self) {
        if let Err(err) = self.fetch().await {
            log::error!("Failed to refresh connections after mutation: {}", err);
        }
        if let Err(err) = self.fetch_links().await {
            log::error!("Failed to refresh company connections after mutation: {}", err);
        }
    }

    async fn refetch_links(&self) {
        if let Err(err) = self.fetch_links().await {
            log::error!("Failed to refresh company connections after mutation: {}", err);
        }
    }
}
