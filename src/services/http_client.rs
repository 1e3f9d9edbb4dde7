use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, header};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::errors::AppError;
use crate::router::{Navigator, Route};
use crate::services::session::SessionHandle;

#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub request_id: String,
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Parsed JSON body; `Null` when empty, a string when not JSON.
    pub body: Value,
}

/// Sends one request and returns whatever the server answered, without
/// interpreting the status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, AppError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, AppError> {
        let mut request_builder = self.client.request(request.method, &request.url);

        if let Some(token) = &request.bearer {
            request_builder = request_builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            request_builder = request_builder.json(body);
        }

        let response = request_builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ApiResponse { status, body })
    }
}

/// The one client every store talks through. Attaches the session token,
/// turns non-2xx answers into errors and ends the session on 401.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: SessionHandle,
    navigator: Navigator,
    public_endpoints: Arc<Vec<String>>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: SessionHandle,
        navigator: Navigator,
        public_endpoints: Vec<String>,
    ) -> Self {
        Self {
            transport,
            session,
            navigator,
            public_endpoints: Arc::new(public_endpoints),
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub async fn get(&self, url: &str) -> Result<Value, AppError> {
        self.send(Method::GET, url, None).await
    }

    pub async fn get_with_query(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, AppError> {
        let mut parsed = Url::parse(url)
            .map_err(|e| AppError::InvalidInput(format!("Invalid endpoint {}: {}", url, e)))?;
        parsed.query_pairs_mut().extend_pairs(query);
        self.send(Method::GET, parsed.as_str(), None).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Value, AppError> {
        self.send(Method::POST, url, Some(serde_json::to_value(body)?)).await
    }

    pub async fn put<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Value, AppError> {
        self.send(Method::PUT, url, Some(serde_json::to_value(body)?)).await
    }

    pub async fn delete<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<Value, AppError> {
        self.send(Method::DELETE, url, Some(serde_json::to_value(body)?)).await
    }

    fn is_public(&self, url: &str) -> bool {
        let without_query = url.split('?').next().unwrap_or(url);
        self.public_endpoints.iter().any(|endpoint| endpoint == without_query)
    }

    async fn send(&self, method: Method, url: &str, body: Option<Value>) -> Result<Value, AppError> {
        let bearer = if self.is_public(url) {
            None
        } else {
            self.session.token()
        };
        let authenticated = bearer.is_some();

        let request = ApiRequest {
            request_id: Uuid::new_v4().to_string(),
            method,
            url: url.to_string(),
            bearer,
            body,
        };
        log::debug!("request_id={} {} {}", request.request_id, request.method, request.url);
        let request_id = request.request_id.clone();

        let response = self.transport.execute(request).await?;

        if response.status == StatusCode::UNAUTHORIZED && authenticated {
            log::warn!("request_id={} rejected with 401, ending session", request_id);
            self.session.clear();
            self.navigator.redirect(Route::Login);
            return Err(AppError::Unauthorized);
        }

        if !response.status.is_success() {
            let message = error_message(&response);
            log::error!("request_id={} failed on {}: {} - {}", request_id, url, response.status, message);
            return Err(AppError::Status {
                status: response.status,
                message,
            });
        }

        Ok(response.body)
    }
}

fn error_message(response: &ApiResponse) -> String {
    let from_body = match &response.body {
        Value::Object(map) => ["message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    };
    from_body.unwrap_or_else(|| {
        response
            .status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session::AuthSession;
    use crate::testing::ScriptedTransport;
    use httpmock::MockServer;
    use serde_json::json;

    fn logged_in() -> SessionHandle {
        let session = SessionHandle::in_memory();
        session
            .establish(AuthSession {
                token: "jwt-abc".to_string(),
                user: None,
                company: None,
            })
            .unwrap();
        session
    }

    #[tokio::test]
    async fn sends_bearer_header_over_the_wire() {
        let server = MockServer::start_async().await;
        let private = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .path("/companies/list")
                    .header("authorization", "Bearer jwt-abc");
                then.status(200).json_body(json!([]));
            })
            .await;

        let client = ApiClient::new(
            Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
            logged_in(),
            Navigator::default(),
            Vec::new(),
        );

        client.get(&server.url("/companies/list")).await.unwrap();

        private.assert_async().await;
    }

    #[tokio::test]
    async fn public_endpoints_go_out_without_bearer() {
        let transport = Arc::new(ScriptedTransport::new());
        let login = "https://n8n.test/auth/login";
        transport.respond(Method::GET, "https://n8n.test/companies/list", 200, json!([]));
        transport.respond(Method::POST, login, 200, json!({ "token": "new" }));

        let client = ApiClient::new(transport.clone(), logged_in(), Navigator::default(), vec![login.to_string()]);
        client.get("https://n8n.test/companies/list").await.unwrap();
        client.post(login, &json!({ "email": "a@b.co" })).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].bearer.as_deref(), Some("jwt-abc"));
        assert!(calls[1].bearer.is_none());
    }

    #[tokio::test]
    async fn unauthorized_clears_session_and_redirects_to_login() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/users/list");
                then.status(401).json_body(json!({ "message": "jwt expired" }));
            })
            .await;

        let session = logged_in();
        let navigator = Navigator::default();
        let client = ApiClient::new(
            Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap()),
            session.clone(),
            navigator.clone(),
            Vec::new(),
        );

        let err = client.get(&server.url("/users/list")).await.unwrap_err();

        assert!(matches!(err, AppError::Unauthorized));
        assert!(!session.is_authenticated());
        assert_eq!(navigator.current(), Route::Login);
    }

    #[tokio::test]
    async fn unauthorized_on_public_endpoint_keeps_routing() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::POST, "https://n8n.test/auth/login", 401, json!({ "message": "bad password" }));

        let navigator = Navigator::default();
        let client = ApiClient::new(
            transport,
            SessionHandle::in_memory(),
            navigator.clone(),
            vec!["https://n8n.test/auth/login".to_string()],
        );

        let err = client
            .post("https://n8n.test/auth/login", &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Status { .. }));
        assert!(err.to_string().contains("bad password"));
        assert_eq!(navigator.current(), Route::Home);
    }

    #[tokio::test]
    async fn query_parameters_are_encoded() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::GET, "https://n8n.test/business/templates?connection=Sales+Team", 200, json!([]));

        let client = ApiClient::new(transport.clone(), SessionHandle::in_memory(), Navigator::default(), Vec::new());
        client
            .get_with_query("https://n8n.test/business/templates", &[("connection", "Sales Team")])
            .await
            .unwrap();

        assert_eq!(transport.calls_to(Method::GET, "https://n8n.test/business/templates?connection=Sales+Team"), 1);
    }

    #[test]
    fn error_message_prefers_backend_text() {
        let response = ApiResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "error": "workflow failed" }),
        };
        assert_eq!(error_message(&response), "workflow failed");

        let response = ApiResponse {
            status: StatusCode::NOT_FOUND,
            body: Value::Null,
        };
        assert_eq!(error_message(&response), "Not Found");
    }
}
