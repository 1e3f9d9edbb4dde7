use serde_json::{Value, json};

use crate::config::UserEndpoints;
use crate::errors::AppError;
use crate::models::{FormattedUser, User};
use crate::services::envelope::decode_collection;
use crate::services::http_client::ApiClient;
use crate::services::request_guard::{FetchOutcome, GuardedState, Operation};
use crate::services::validation::{require_id, require_text, validate_email};

pub struct UserStore {
    client: ApiClient,
    endpoints: UserEndpoints,
    state: GuardedState<Vec<User>>,
}

impl UserStore {
    pub fn new(client: ApiClient, endpoints: UserEndpoints) -> Self {
        Self {
            client,
            endpoints,
            state: GuardedState::new(),
        }
    }

    pub fn users(&self) -> Vec<User> {
        self.state.snapshot()
    }

    pub fn formatted_users(&self) -> Vec<FormattedUser> {
        self.users().into_iter().map(FormattedUser::from).collect()
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

    pub async fn fetch(&self) -> Result<FetchOutcome, AppError> {
        let client = self.client.clone();
        let url = self.endpoints.list.clone();
        self.state
            .fetch_with(|_| async move {
                let body = client.get(&url).await?;
                Ok(decode_collection::<User>(body, &["users"], "user").items)
            })
            .await
    }

    pub async fn create(&self, user: &User) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Create, async {
                check(user)?;
                let payload = User {
                    id: None,
                    email: user.email.trim().to_string(),
                    ..user.clone()
                };
                let body = self.client.post(&self.endpoints.create, &payload).await?;
                non_empty(body, "creating user")
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    pub async fn update(&self, user: &User) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Update, async {
                require_id(user.id, "User")?;
                check(user)?;
                let body = self.client.post(&self.endpoints.update, user).await?;
                non_empty(body, "updating user")
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    pub async fn delete(&self, id: i64) -> Result<Value, AppError> {
        let body = self
            .state
            .track_mutation(Operation::Delete, async {
                self.client.post(&self.endpoints.delete, &json!({ "id": id })).await
            })
            .await?;
        self.refetch().await;
        Ok(body)
    }

    /// Asks the backend to issue a new password. The collection is unchanged.
    pub async fn reset_password(&self, id: i64) -> Result<Value, AppError> {
        self.state
            .track_mutation(Operation::ResetPassword, async {
                let body = self
                    .client
                    .post(&self.endpoints.reset_password, &json!({ "id": id }))
                    .await?;
                non_empty(body, "resetting password")
            })
            .await
    }

    async fn refetch(&self) {
        if let Err(err) = self.fetch().await {
            log::error!("Failed to refresh users after mutation: {}", err);
        }
    }
}

fn check(user: &User) -> Result<(), AppError> {
    require_text(&user.name, "User name")?;
    if !validate_email(&user.email) {
        return Err(AppError::InvalidInput(format!("'{}' is not a valid email", user.email)));
    }
    Ok(())
}

fn non_empty(body: Value, action: &str) -> Result<Value, AppError> {
    if body.is_null() {
        return Err(AppError::Payload(format!("empty response when {}", action)));
    }
    Ok(body)
}
