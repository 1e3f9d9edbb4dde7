use std::sync::Arc;

use super::quietly;
use crate::app_state::AppState;
use crate::models::{Company, User};
use crate::router::{Navigator, Route};
use crate::services::notifier::Notifier;
use crate::stores::AuthStore;

pub struct AuthActions {
    store: Arc<AuthStore>,
    navigator: Navigator,
    notifier: Arc<dyn Notifier>,
}

impl AuthActions {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.auth),
            navigator: state.navigator.clone(),
            notifier: Arc::clone(&state.notifier),
        }
    }

    pub fn user(&self) -> Option<User> {
        self.store.user()
    }

    pub fn company(&self) -> Option<Company> {
        self.store.company()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.store.is_admin()
    }

    pub fn is_company_user(&self) -> bool {
        self.store.is_company_user()
    }

    pub async fn login(&self, email: &str, password: &str) -> bool {
        let Some(session) = quietly(self.notifier.as_ref(), self.store.login(email, password).await, "Login failed")
        else {
            return false;
        };
        let name = session.user.map(|u| u.name).unwrap_or_else(|| email.to_string());
        self.notifier.success(&format!("Welcome, {}", name));
        true
    }

    pub async fn logout(&self) {
        self.store.logout().await;
        self.notifier.success("Logged out");
    }

    pub async fn verify(&self) -> bool {
        let had_session = self.store.is_authenticated();
        match self.store.verify().await {
            Ok(true) => true,
            Ok(false) => {
                if had_session {
                    self.notifier.warning("Session expired, please log in again");
                }
                false
            }
            Err(err) => {
                self.notifier.error(&format!("Could not verify session: {}", err));
                false
            }
        }
    }

    /// Moves to `target`, or wherever the route guard sends the session.
    pub fn navigate(&self, target: Route) -> Route {
        self.navigator.navigate(target, self.store.session())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, url};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn regular_user_is_kept_out_of_admin_routes() {
        let h = harness();
        h.transport.respond(
            Method::POST,
            &url("auth/login"),
            200,
            json!({
                "token": "jwt",
                "user": { "id": 2, "name": "Ana", "email": "ana@acme.com", "role": "user" },
                "company": { "id": 7, "name": "Acme" }
            }),
        );
        let actions = AuthActions::new(&h.state);

        assert_eq!(actions.navigate(Route::Leads), Route::Login);
        assert!(actions.login("ana@acme.com", "secret").await);
        assert_eq!(h.notifier.drain()[0].message, "Welcome, Ana");

        assert_eq!(actions.navigate(Route::Users), Route::Home);
        assert_eq!(actions.navigate(Route::Leads), Route::Leads);
        assert!(actions.is_company_user());
    }
}
