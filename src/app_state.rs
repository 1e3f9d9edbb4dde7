use std::sync::Arc;

use crate::config::{Config, Endpoints};
use crate::errors::AppError;
use crate::router::{Navigator, Route};
use crate::services::http_client::{ApiClient, ReqwestTransport, Transport};
use crate::services::notifier::Notifier;
use crate::services::retry::Backoff;
use crate::services::session::{FileStorage, SessionHandle};
use crate::stores::{AuthStore, CompanyStore, ConnectionStore, TemplateStore, UserStore, ValidationStore};

/// Everything a front end needs: the stores, the session and the
/// notification sink, all sharing one client.
#[derive(Clone)]
pub struct AppState {
    pub client: ApiClient,
    pub session: SessionHandle,
    pub navigator: Navigator,
    pub notifier: Arc<dyn Notifier>,
    pub companies: Arc<CompanyStore>,
    pub connections: Arc<ConnectionStore>,
    pub validation: Arc<ValidationStore>,
    pub templates: Arc<TemplateStore>,
    pub users: Arc<UserStore>,
    pub auth: Arc<AuthStore>,
}

impl AppState {
    pub fn assemble(
        endpoints: Endpoints,
        transport: Arc<dyn Transport>,
        session: SessionHandle,
        notifier: Arc<dyn Notifier>,
        backoff: Backoff,
    ) -> Self {
        let initial = if session.is_authenticated() { Route::Home } else { Route::Login };
        let navigator = Navigator::new(initial);
        let client = ApiClient::new(
            transport,
            session.clone(),
            navigator.clone(),
            endpoints.public_allow_list(),
        );

        let Endpoints {
            companies,
            company_connections,
            connections,
            validation,
            templates,
            users,
            auth,
        } = endpoints;

        Self {
            companies: Arc::new(CompanyStore::new(client.clone(), companies)),
            connections: Arc::new(ConnectionStore::new(client.clone(), connections, company_connections, backoff)),
            validation: Arc::new(ValidationStore::new(client.clone(), validation)),
            templates: Arc::new(TemplateStore::new(client.clone(), templates)),
            users: Arc::new(UserStore::new(client.clone(), users)),
            auth: Arc::new(AuthStore::new(client.clone(), auth)),
            client,
            session,
            navigator,
            notifier,
        }
    }

    /// Production wiring: reqwest transport and a session persisted on disk.
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        let endpoints = Endpoints::resolve(config)?;
        let transport = ReqwestTransport::new(config.effective_request_timeout())?;
        let session = SessionHandle::load(Arc::new(FileStorage::new(config.effective_session_file())));
        let backoff = Backoff {
            max_attempts: config.effective_connect_max_attempts(),
            base_delay: config.effective_connect_base_delay(),
        };
        Ok(Self::assemble(endpoints, Arc::new(transport), session, notifier, backoff))
    }
}
