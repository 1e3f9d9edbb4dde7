use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::AuthEndpoints;
use crate::errors::AppError;
use crate::models::{Company, User};
use crate::router::Route;
use crate::services::envelope::single_object;
use crate::services::http_client::ApiClient;
use crate::services::session::{AuthSession, SessionHandle};
use crate::services::validation::{require_text, validate_email};

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    company: Option<Company>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    company: Option<Company>,
}

pub struct AuthStore {
    client: ApiClient,
    endpoints: AuthEndpoints,
}

impl AuthStore {
    pub fn new(client: ApiClient, endpoints: AuthEndpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn session(&self) -> &SessionHandle {
        self.client.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.session().is_admin()
    }

    pub fn is_company_user(&self) -> bool {
        self.session().is_company_user()
    }

    pub fn user(&self) -> Option<User> {
        self.session().user()
    }

    pub fn company(&self) -> Option<Company> {
        self.session().company()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        if !validate_email(email) {
            return Err(AppError::InvalidInput(format!("'{}' is not a valid email", email)));
        }
        require_text(password, "Password")?;

        let body = self
            .client
            .post(&self.endpoints.login, &json!({ "email": email.trim(), "password": password }))
            .await?;
        let response: LoginResponse = serde_json::from_value(Value::Object(single_object(body)?))?;

        let Some(token) = response.token.filter(|t| !t.is_empty()) else {
            let reason = response.message.unwrap_or_else(|| "no token in login response".to_string());
            return Err(AppError::Domain(reason));
        };

        let session = AuthSession {
            token,
            user: response.user,
            company: response.company,
        };
        self.session().establish(session.clone())?;
        log::info!("Logged in as {}", email.trim());
        self.client.navigator().redirect(Route::Home);
        Ok(session)
    }

    /// Tells the backend the session is over. Local state is cleared even
    /// when that call fails.
    pub async fn logout(&self) {
        if let Some(token) = self.session().token() {
            if let Err(err) = self.client.post(&self.endpoints.logout, &json!({ "token": token })).await {
                log::warn!("Logout notification failed: {}", err);
            }
        }
        self.session().clear();
        self.client.navigator().redirect(Route::Login);
    }

    /// Checks the stored token with the backend. A rejected token or a failed
    /// check ends the session.
    pub async fn verify(&self) -> Result<bool, AppError> {
        let Some(token) = self.session().token() else {
            return Ok(false);
        };

        let checked = self
            .client
            .post(&self.endpoints.verify, &json!({ "token": token }))
            .await
            .and_then(|body| Ok(serde_json::from_value::<VerifyResponse>(Value::Object(single_object(body)?))?));

        match checked {
            Ok(response) if response.valid => {
                let current = self.session().current();
                let session = AuthSession {
                    token,
                    user: response.user.or_else(|| current.as_ref().and_then(|s| s.user.clone())),
                    company: response.company.or_else(|| current.and_then(|s| s.company)),
                };
                self.session().establish(session)?;
                Ok(true)
            }
            Ok(_) => {
                log::info!("Stored session was rejected by the backend");
                self.session().clear();
                self.client.navigator().redirect(Route::Login);
                Ok(false)
            }
            Err(err) => {
                log::error!("Session verification failed: {}", err);
                self.session().clear();
                self.client.navigator().redirect(Route::Login);
                Err(err)
            }
        }
    }
}
