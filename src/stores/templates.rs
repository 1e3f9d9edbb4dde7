use serde::Serialize;
use serde_json::{Value, json};

use crate::config::TemplateEndpoints;
use crate::errors::AppError;
use crate::models::{BusinessTemplate, Template, ValidationList};
use crate::services::envelope::decode_collection;
use crate::services::http_client::ApiClient;
use crate::services::request_guard::{FetchOutcome, GuardedState, Operation};
use crate::services::validation::{require_id, require_text};

/// Body sent to the execute webhook: the template plus the list it targets.
#[derive(Serialize)]
struct ExecutePayload<'a> {
    template_id: Option<i64>,
    template_name: &'a str,
    template_message: &'a str,
    template_connection: Option<&'a str>,
    template_list_id: Option<i64>,
    template_list_name: Option<&'a str>,
    #[serde(rename = "validationList")]
    validation_list: Option<&'a ValidationList>,
    #[serde(rename = "totalLeads")]
    total_leads: u32,
    #[serde(rename = "aiResponses")]
    ai_responses: &'a [Value],
    #[serde(rename = "customFields")]
    custom_fields: &'a [Value],
    created_at: Option<&'a str>,
    updated_at: Option<&'a str>,
}

pub struct TemplateStore {
    client: ApiClient,
    endpoints: TemplateEndpoints,
    state: GuardedState<Vec<Template>>,
}

impl TemplateStore {
    pub fn new(client: ApiClient, endpoints: TemplateEndpoints) -> Self {
        Self {
            client,
            endpoints,
            state: GuardedState::new(),
        }
    }

    pub fn templates(&self) -> Vec<Template> {
        self.state.snapshot()
    }

    pub fn find(&self, id: i64) -> Option<Template> {
        self.state
            .read(|templates| templates.iter().find(|t| t.id == Some(id)).cloned())
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
            .fetch_with(|_| async move {
                let body = client.get(&url).await?;
                Ok(decode_collection::<Template>(body, &["templates"], "template").items)
            })
            .await
    }

    pub async fn create(&self, template: &Template) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Create, async {
                check(template)?;
                let payload = Template {
                    id: None,
                    ..template.clone()
                };
                self.client.post(&self.endpoints.create, &payload).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    pub async fn update(&self, template: &Template) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Update, async {
                require_id(template.id, "Template")?;
                check(template)?;
                self.client.put(&self.endpoints.update, template).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
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

    /// Triggers a send of `template` to the leads of `list`.
    pub async fn execute(&self, template: &Template, list: Option<&ValidationList>) -> Result<Value, AppError> {
        self.state
            .track_mutation(Operation::Execute, async {
                check(template)?;
                let payload = ExecutePayload {
                    template_id: template.id,
                    template_name: &template.template_name,
                    template_message: &template.template_message,
                    template_connection: template.template_connection.as_deref(),
                    template_list_id: template.template_list_id.or(list.map(|l| l.id)),
                    template_list_name: template
                        .template_list_name
                        .as_deref()
                        .or(list.map(|l| l.name.as_str())),
                    validation_list: list,
                    total_leads: list.map_or(0, |l| l.total_leads),
                    ai_responses: &template.ai_responses,
                    custom_fields: &template.custom_fields,
                    created_at: template.created_at.as_deref(),
                    updated_at: template.updated_at.as_deref(),
                };
                log::info!("Executing template {}", template.template_name);
                self.client.post(&self.endpoints.execute, &payload).await
            })
            .await
    }

    /// Approved templates of the business API for one connection. Read only,
    /// not cached.
    pub async fn fetch_business_templates(&self, connection: &str) -> Result<Vec<BusinessTemplate>, AppError> {
        require_text(connection, "Connection")?;
        let body = self
            .client
            .get_with_query(&self.endpoints.business, &[("connection", connection)])
            .await?;
        Ok(decode_collection::<BusinessTemplate>(body, &["templates"], "business template").items)
    }

    async fn refetch(&self) {
        if let Err(err) = self.fetch().await {
            log::error!("Failed to refresh templates after mutation: {}", err);
        }
    }
}

fn check(template: &Template) -> Result<(), AppError> {
    require_text(&template.template_name, "Template name")?;
    template.check_integration().map_err(AppError::InvalidInput)
}
