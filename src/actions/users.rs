use std::sync::Arc;

use super::{quietly, report};
use crate::app_state::AppState;
use crate::models::{FormattedUser, User};
use crate::services::notifier::Notifier;
use crate::stores::UserStore;

pub struct UserActions {
    store: Arc<UserStore>,
    notifier: Arc<dyn Notifier>,
}

impl UserActions {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.users),
            notifier: Arc::clone(&state.notifier),
        }
    }

    pub fn users(&self) -> Vec<FormattedUser> {
        self.store.formatted_users()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.store.error()
    }

    pub async fn fetch(&self) -> bool {
        quietly(self.notifier.as_ref(), self.store.fetch().await, "Failed to load users").is_some()
    }

    pub async fn create(&self, user: &User) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.create(user).await,
            "User created",
            "Failed to create user",
        )
    }

    pub async fn update(&self, user: &User) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.update(user).await,
            "User updated",
            "Failed to update user",
        )
    }

    pub async fn delete(&self, id: i64) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.delete(id).await,
            "User deleted",
            "Failed to delete user",
        )
    }

    pub async fn reset_password(&self, id: i64) -> bool {
        report(
            self.notifier.as_ref(),
            self.store.reset_password(id).await,
            "Password reset sent",
            "Failed to reset password",
        )
    }
}
