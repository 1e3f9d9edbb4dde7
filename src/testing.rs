//! In-process transport used by the unit tests.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::app_state::AppState;
use crate::config::{Config, Endpoints};
use crate::errors::AppError;
use crate::services::http_client::{ApiRequest, ApiResponse, Transport};
use crate::services::notifier::RecordingNotifier;
use crate::services::retry::Backoff;
use crate::services::session::SessionHandle;

pub const BASE: &str = "https://n8n.test/webhook/";

#[derive(Clone)]
struct Scripted {
    status: u16,
    body: Value,
    delay: Duration,
}

#[derive(Default)]
struct Script {
    queue: VecDeque<Scripted>,
    served: Option<Scripted>,
}

impl Script {
    fn next(&mut self) -> Option<Scripted> {
        if let Some(scripted) = self.queue.pop_front() {
            self.served = Some(scripted);
        }
        self.served.clone()
    }
}

/// Answers requests from per-endpoint queues. Once an endpoint's queue runs
/// dry its last answer is repeated until a new one is queued.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<(Method, String), Script>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, url: &str, status: u16, body: Value) {
        self.respond_after(method, url, Duration::ZERO, status, body);
    }

    pub fn respond_after(&self, method: Method, url: &str, delay: Duration, status: u16, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry((method, url.to_string()))
            .or_default()
            .queue
            .push_back(Scripted { status, body, delay });
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: Method, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method && call.url == url)
            .count()
    }

    pub fn last_body(&self, method: Method, url: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|call| call.method == method && call.url == url)
            .and_then(|call| call.body.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, AppError> {
        self.calls.lock().unwrap().push(request.clone());

        let scripted = {
            let mut responses = self.responses.lock().unwrap();
            responses
                .get_mut(&(request.method.clone(), request.url.clone()))
                .and_then(Script::next)
        };

        let Some(scripted) = scripted else {
            return Ok(ApiResponse {
                status: StatusCode::NOT_FOUND,
                body: Value::String(format!("no scripted response for {} {}", request.method, request.url)),
            });
        };

        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }

        Ok(ApiResponse {
            status: StatusCode::from_u16(scripted.status).unwrap(),
            body: scripted.body,
        })
    }
}

pub fn endpoints() -> Endpoints {
    Endpoints::resolve(&Config::with_base_url(BASE)).unwrap()
}

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

pub struct Harness {
    pub state: AppState,
    pub transport: Arc<ScriptedTransport>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness() -> Harness {
    harness_with_session(SessionHandle::in_memory())
}

pub fn harness_with_session(session: SessionHandle) -> Harness {
    let transport = Arc::new(ScriptedTransport::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::assemble(
        endpoints(),
        transport.clone(),
        session,
        notifier.clone(),
        Backoff::default(),
    );
    Harness {
        state,
        transport,
        notifier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(method: Method, url: &str) -> ApiRequest {
        ApiRequest {
            request_id: "test".to_string(),
            method,
            url: url.to_string(),
            bearer: None,
            body: None,
        }
    }

    #[tokio::test]
    async fn answer_queued_after_a_call_replaces_the_repeated_one() {
        let transport = ScriptedTransport::new();
        let list = url("companies/list");
        transport.respond(Method::GET, &list, 200, json!(["first"]));

        let first = transport.execute(request(Method::GET, &list)).await.unwrap();
        let repeated = transport.execute(request(Method::GET, &list)).await.unwrap();
        transport.respond(Method::GET, &list, 500, json!("down"));
        let replaced = transport.execute(request(Method::GET, &list)).await.unwrap();
        let again = transport.execute(request(Method::GET, &list)).await.unwrap();

        assert_eq!(first.body, json!(["first"]));
        assert_eq!(repeated.body, json!(["first"]));
        assert_eq!(replaced.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(again.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unscripted_endpoint_answers_not_found() {
        let transport = ScriptedTransport::new();
        let response = transport.execute(request(Method::GET, &url("users/list"))).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
