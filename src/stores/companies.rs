use serde_json::{Value, json};

use crate::config::CompanyEndpoints;
use crate::errors::AppError;
use crate::models::Company;
use crate::services::envelope::{decode_collection, decode_items, normalize_collection};
use crate::services::http_client::ApiClient;
use crate::services::request_guard::{FetchOutcome, GuardedState, Operation};
use crate::services::validation::{digits_only, digits_only_opt, require_id, require_text};

pub struct CompanyStore {
    client: ApiClient,
    endpoints: CompanyEndpoints,
    state: GuardedState<Vec<Company>>,
}

impl CompanyStore {
    pub fn new(client: ApiClient, endpoints: CompanyEndpoints) -> Self {
        Self {
            client,
            endpoints,
            state: GuardedState::new(),
        }
    }

    pub fn companies(&self) -> Vec<Company> {
        self.state.snapshot()
    }

    pub fn find(&self, id: i64) -> Option<Company> {
        self.state
            .read(|companies| companies.iter().find(|c| c.id == Some(id)).cloned())
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.error()
    }

    pub async fn fetch(&self) -> Result<FetchOutcome, AppError> {
        let client = self.client.clone();
        let url = self.endpoints.list.clone();
        self.state
            .fetch_with(|token| async move {
                log::debug!("Fetching companies (request {})", token.id());
                let body = client.get(&url).await?;
                Ok(decode_collection::<Company>(body, &["companies"], "company").items)
            })
            .await
    }

    /// Loads one company without touching the cached collection.
    pub async fn fetch_one(&self, id: i64) -> Result<Company, AppError> {
        let id_param = id.to_string();
        let body = self
            .client
            .get_with_query(&self.endpoints.list_one, &[("id", id_param.as_str())])
            .await?;

        let candidates = if body.get("id").is_some() {
            vec![body]
        } else {
            normalize_collection(body, &["company", "companies"]).1
        };
        decode_items::<Company>(candidates, "company")
            .into_iter()
            .find(|company| company.id == Some(id))
            .ok_or_else(|| AppError::NotFound(format!("Company with id {} not found", id)))
    }

    pub async fn create(&self, company: &Company) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Create, async {
                require_text(&company.name, "Company name")?;
                let payload = Company {
                    id: None,
                    ..normalized(company)
                };
                log::debug!("Creating company {}", payload.name);
                self.client.post(&self.endpoints.create, &payload).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    pub async fn update(&self, company: &Company) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Update, async {
                let id = require_id(company.id, "Company")?;
                require_text(&company.name, "Company name")?;
                log::debug!("Updating company {}", id);
                self.client.post(&self.endpoints.update, &normalized(company)).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    pub async fn delete(&self, id: i64) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Delete, async {
                log::debug!("Deleting company {}", id);
                self.client.post(&self.endpoints.delete, &json!({ "id": id })).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    async fn refetch(&self) {
        if let Err(err) = self.fetch().await {
            log::error!("Failed to refresh companies after mutation: {}", err);
        }
    }
}

fn normalized(company: &Company) -> Company {
    Company {
        name: company.name.trim().to_string(),
        cnpj: digits_only(&company.cnpj),
        phone: digits_only_opt(company.phone.as_deref()),
        email: company.email.as_ref().map(|e| e.trim().to_string()),
        ..company.clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::AppError;
    use crate::models::Company;
    use crate::services::request_guard::FetchOutcome;
    use crate::testing::{harness, url};
    use futures_util::future::join;
    use reqwest::Method;
    use serde_json::json;
    use std::time::Duration;

    fn acme() -> Company {
        Company {
            name: "Acme".to_string(),
            cnpj: "12.345.678/0001-90".to_string(),
            phone: Some("(11) 3333-4444".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fetch_accepts_result_envelope() {
        let h = harness();
        h.transport.respond(
            Method::GET,
            &url("companies/list"),
            200,
            json!({ "result": [{ "id": 1, "name": "Acme", "cnpj": "12345678000190" }] }),
        );

        h.state.companies.fetch().await.unwrap();

        let companies = h.state.companies.companies();
        assert_eq!(companies.len(), 1);
        assert!(companies[0].is_active());
        assert!(!h.state.companies.is_loading());
    }

    #[tokio::test]
    async fn slower_older_fetch_cannot_overwrite_newer_result() {
        let h = harness();
        h.transport.respond_after(
            Method::GET,
            &url("companies/list"),
            Duration::from_millis(80),
            200,
            json!([{ "id": 1, "name": "Stale" }]),
        );
        h.transport.respond(Method::GET, &url("companies/list"), 200, json!([{ "id": 2, "name": "Fresh" }]));

        let store = &h.state.companies;
        let (older, newer) = join(store.fetch(), store.fetch()).await;

        assert_eq!(older.unwrap(), FetchOutcome::Superseded);
        assert_eq!(newer.unwrap(), FetchOutcome::Applied);
        assert_eq!(store.companies()[0].name, "Fresh");
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn create_strips_masks_and_refetches_once() {
        let h = harness();
        h.transport.respond(Method::POST, &url("companies/create"), 200, json!({ "id": 9 }));
        h.transport.respond(Method::GET, &url("companies/list"), 200, json!([{ "id": 9, "name": "Acme" }]));

        let body = h.state.companies.create(&acme()).await.unwrap();

        assert_eq!(body, json!({ "id": 9 }));
        let sent = h.transport.last_body(Method::POST, &url("companies/create")).unwrap();
        assert_eq!(sent["cnpj"], "12345678000190");
        assert_eq!(sent["phone"], "1133334444");
        assert!(sent.get("id").is_none());
        assert_eq!(h.transport.calls_to(Method::GET, &url("companies/list")), 1);
        assert_eq!(h.state.companies.companies()[0].id, Some(9));
    }

    #[tokio::test]
    async fn update_without_id_fails_before_any_request() {
        let h = harness();

        let err = h.state.companies.update(&acme()).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(h.transport.calls().is_empty());
        assert!(h.state.companies.error().unwrap().contains("Company id is required"));
    }

    #[tokio::test]
    async fn update_strips_masks_and_refetches_once() {
        let h = harness();
        h.transport.respond(Method::POST, &url("companies/update"), 200, json!({ "id": 9 }));
        h.transport.respond(Method::GET, &url("companies/list"), 200, json!([{ "id": 9, "name": "Acme" }]));

        h.state
            .companies
            .update(&Company {
                id: Some(9),
                ..acme()
            })
            .await
            .unwrap();

        let sent = h.transport.last_body(Method::POST, &url("companies/update")).unwrap();
        assert_eq!(sent["id"], 9);
        assert_eq!(sent["cnpj"], "12345678000190");
        assert_eq!(sent["phone"], "1133334444");
        assert_eq!(h.transport.calls_to(Method::GET, &url("companies/list")), 1);
    }

    #[tokio::test]
    async fn abandoned_create_does_not_leave_store_loading() {
        let h = harness();
        h.transport.respond_after(
            Method::POST,
            &url("companies/create"),
            Duration::from_millis(200),
            200,
            json!({ "id": 9 }),
        );
        h.transport.respond(Method::GET, &url("companies/list"), 200, json!([]));

        let store = &h.state.companies;
        let timed_out = tokio::time::timeout(Duration::from_millis(10), store.create(&acme())).await;
        assert!(timed_out.is_err());
        assert!(!store.is_loading());

        store.fetch().await.unwrap();
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn failed_delete_keeps_collection_and_skips_refetch() {
        let h = harness();
        h.transport.respond(Method::GET, &url("companies/list"), 200, json!([{ "id": 1, "name": "Acme" }]));
        h.state.companies.fetch().await.unwrap();
        h.transport.respond(Method::POST, &url("companies/delete"), 500, json!({ "message": "boom" }));

        let err = h.state.companies.delete(1).await.unwrap_err();

        assert!(err.to_string().contains("boom"));
        assert_eq!(h.state.companies.companies().len(), 1);
        assert_eq!(h.transport.calls_to(Method::GET, &url("companies/list")), 1);
    }

    #[tokio::test]
    async fn fetch_one_reads_single_object() {
        let h = harness();
        h.transport.respond(
            Method::GET,
            &url("companies/listone?id=3"),
            200,
            json!({ "id": 3, "name": "Beta", "status": "inactive" }),
        );

        let company = h.state.companies.fetch_one(3).await.unwrap();
        assert_eq!(company.name, "Beta");
        assert!(!company.is_active());
        assert!(h.state.companies.companies().is_empty());
    }

    #[tokio::test]
    async fn fetch_one_reports_missing_company() {
        let h = harness();
        h.transport.respond(Method::GET, &url("companies/listone?id=4"), 200, json!([]));

        let err = h.state.companies.fetch_one(4).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
