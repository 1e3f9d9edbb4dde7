use serde::Serialize;
use serde_json::{Value, json};

use crate::config::ValidationEndpoints;
use crate::errors::AppError;
use crate::models::{FormattedLead, FormattedList, Lead, LeadInput, NewValidationList, ValidationList};
use crate::services::envelope::decode_items;
use crate::services::http_client::ApiClient;
use crate::services::request_guard::{FetchOutcome, GuardedState, Operation};
use crate::services::validation::{digits_only, require_text};

#[derive(Clone, Debug, Default)]
pub struct ValidationData {
    pub lists: Vec<ValidationList>,
    pub leads: Vec<Lead>,
}

#[derive(Serialize)]
struct SaveListPayload<'a> {
    name: &'a str,
    leads: Vec<Lead>,
    total_leads: u32,
    valid_leads: u32,
    invalid_leads: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_id: Option<i64>,
}

pub struct ValidationStore {
    client: ApiClient,
    endpoints: ValidationEndpoints,
    state: GuardedState<ValidationData>,
}

impl ValidationStore {
    pub fn new(client: ApiClient, endpoints: ValidationEndpoints) -> Self {
        Self {
            client,
            endpoints,
            state: GuardedState::new(),
        }
    }

    pub fn lists(&self) -> Vec<ValidationList> {
        self.state.read(|data| data.lists.clone())
    }

    pub fn leads(&self) -> Vec<Lead> {
        self.state.read(|data| data.leads.clone())
    }

    pub fn formatted_lists(&self) -> Vec<FormattedList> {
        self.lists().into_iter().map(FormattedList::from).collect()
    }

    pub fn formatted_leads(&self) -> Vec<FormattedLead> {
        self.leads().into_iter().map(FormattedLead::from).collect()
    }

    pub fn find(&self, id: i64) -> Option<ValidationList> {
        self.state
            .read(|data| data.lists.iter().find(|list| list.id == id).cloned())
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.error()
    }

    pub fn last_operation(&self) -> Option<Operation> {
        self.state.last_operation()
    }

    /// The list endpoint answers `[{leads: [..]}, {lists: [..]}]`.
    pub async fn fetch_lists(&self) -> Result<FetchOutcome, AppError> {
        let client = self.client.clone();
        let url = self.endpoints.list.clone();
        self.state
            .fetch_with(|_| async move {
                let body = client.get(&url).await?;
                parse_lists(body)
            })
            .await
    }

    pub async fn save_list(&self, list: &NewValidationList) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Save, async {
                require_text(&list.name, "List name")?;
                if list.leads.is_empty() {
                    return Err(AppError::InvalidInput("a list needs at least one lead".to_string()));
                }
                if let Some(lead) = list.leads.iter().find(|lead| digits_only(&lead.number).is_empty()) {
                    return Err(AppError::InvalidInput(format!("lead '{}' has no phone number", lead.name)));
                }

                let leads: Vec<Lead> = list
                    .leads
                    .iter()
                    .map(|lead| Lead {
                        number: digits_only(&lead.number),
                        list_id: None,
                        ..lead.clone()
                    })
                    .collect();
                let valid_leads = leads.iter().filter(|lead| lead.exists).count() as u32;
                let payload = SaveListPayload {
                    name: list.name.trim(),
                    total_leads: leads.len() as u32,
                    valid_leads,
                    invalid_leads: leads.len() as u32 - valid_leads,
                    company_id: list.company_id,
                    leads,
                };

                log::debug!("Saving validation list {} ({} leads)", payload.name, payload.total_leads);
                let body = self.client.post(&self.endpoints.save, &payload).await?;
                if body.is_null() {
                    return Err(AppError::Payload("empty response when saving list".to_string()));
                }
                Ok(body)
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    pub async fn delete_list(&self, id: i64) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Delete, async {
                self.client.delete(&self.endpoints.delete, &json!({ "id": id })).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    /// Re-runs the server side check of a stored list.
    pub async fn validate_list(&self, id: i64) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Validate, async {
                let body = self.client.post(&self.endpoints.validate, &json!({ "id": id })).await?;
                if body.is_null() {
                    return Err(AppError::Payload("empty response when validating list".to_string()));
                }
                Ok(body)
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    /// Checks numbers against the messaging network. Answers are matched to
    /// the submitted leads by position.
    pub async fn validate_leads(&self, leads: &[LeadInput]) -> Result<Vec<Lead>, AppError> {
        if leads.is_empty() {
            return Ok(Vec::new());
        }
        let submitted: Vec<LeadInput> = leads
            .iter()
            .map(|lead| LeadInput {
                name: lead.name.trim().to_string(),
                number: digits_only(&lead.number),
            })
            .collect();

        self.state
            .track_mutation(Operation::Validate, async {
                let body = self
                    .client
                    .post(&self.endpoints.validate, &json!({ "leads": submitted }))
                    .await?;
                let Value::Array(results) = body else {
                    return Err(AppError::Payload("lead validation must answer an array".to_string()));
                };
                if results.len() != submitted.len() {
                    log::warn!(
                        "Lead validation answered {} result(s) for {} lead(s)",
                        results.len(),
                        submitted.len()
                    );
                }
                Ok(submitted
                    .into_iter()
                    .enumerate()
                    .map(|(index, lead)| check_result(lead, results.get(index)))
                    .collect())
            })
            .await
    }

    async fn refetch(&self) {
        if let Err(err) = self.fetch_lists().await {
            log::error!("Failed to refresh validation lists after mutation: {}", err);
        }
    }
}

fn parse_lists(body: Value) -> Result<ValidationData, AppError> {
    let Value::Array(mut parts) = body else {
        return Err(AppError::Payload("validation lists must be a two element array".to_string()));
    };
    if parts.len() < 2 {
        return Err(AppError::Payload(format!(
            "validation lists answered {} element(s), expected 2",
            parts.len()
        )));
    }

    let raw_lists = take_array(&mut parts[1], "lists");
    let raw_leads = take_array(&mut parts[0], "leads");
    let leads = decode_items::<Lead>(raw_leads, "lead");
    let lists = decode_items::<ValidationList>(raw_lists, "validation list");

    for list in lists.iter().filter(|list| !list.counts_consistent()) {
        log::warn!(
            "List {} reports {} valid + {} invalid of {} leads",
            list.id,
            list.valid_leads,
            list.invalid_leads,
            list.total_leads
        );
    }
    Ok(ValidationData { lists, leads })
}

fn take_array(part: &mut Value, key: &str) -> Vec<Value> {
    match part.get_mut(key).map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn check_result(lead: LeadInput, result: Option<&Value>) -> Lead {
    let unresolved = |lead: LeadInput| Lead {
        name: lead.name,
        number: lead.number,
        exists: false,
        jid: None,
        list_id: None,
    };

    let Some(result) = result else {
        log::warn!("No validation result for {}", lead.number);
        return unresolved(lead);
    };
    let succeeded = result.get("success").and_then(Value::as_bool).unwrap_or(false);
    let first = result
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first());

    match first {
        Some(check) if succeeded => Lead {
            exists: check.get("exists").and_then(Value::as_bool).unwrap_or(false),
            jid: check.get("jid").and_then(Value::as_str).map(str::to_string),
            name: lead.name,
            number: lead.number,
            list_id: None,
        },
        _ => unresolved(lead),
    }
}
