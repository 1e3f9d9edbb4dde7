//! Navigation targets and the guard that protects them.

use std::sync::Arc;
use tokio::sync::watch;

use crate::services::session::SessionHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    /// Landing page; lists templates.
    Home,
    Leads,
    Connections,
    Companies,
    Users,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Home => "/",
            Route::Leads => "/leads",
            Route::Connections => "/connections",
            Route::Companies => "/companies",
            Route::Users => "/users",
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Route::Companies | Route::Users)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(Route),
}

pub fn guard(target: Route, session: &SessionHandle) -> Navigation {
    if target.requires_auth() && !session.is_authenticated() {
        return Navigation::Redirect(Route::Login);
    }
    if target.requires_admin() && !session.is_admin() {
        return Navigation::Redirect(Route::Home);
    }
    if target == Route::Login && session.is_authenticated() {
        return Navigation::Redirect(Route::Home);
    }
    Navigation::Allow
}

/// Publishes the route the application should display.
#[derive(Clone)]
pub struct Navigator {
    sender: Arc<watch::Sender<Route>>,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Route {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.sender.subscribe()
    }

    pub fn redirect(&self, route: Route) {
        log::info!("Redirecting to {}", route);
        self.sender.send_replace(route);
    }

    /// Navigates to `target` unless the guard sends elsewhere; returns the
    /// route actually reached.
    pub fn navigate(&self, target: Route, session: &SessionHandle) -> Route {
        let reached = match guard(target, session) {
            Navigation::Allow => target,
            Navigation::Redirect(other) => other,
        };
        self.sender.send_replace(reached);
        reached
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserRole};
    use crate::services::session::AuthSession;

    fn session_with(role: UserRole) -> SessionHandle {
        let handle = SessionHandle::in_memory();
        handle
            .establish(AuthSession {
                token: "t".to_string(),
                user: Some(User {
                    name: "x".to_string(),
                    email: "x@example.com".to_string(),
                    role,
                    ..Default::default()
                }),
                company: None,
            })
            .unwrap();
        handle
    }

    #[test]
    fn anonymous_users_are_sent_to_login() {
        let session = SessionHandle::in_memory();
        assert_eq!(guard(Route::Leads, &session), Navigation::Redirect(Route::Login));
        assert_eq!(guard(Route::Users, &session), Navigation::Redirect(Route::Login));
        assert_eq!(guard(Route::Login, &session), Navigation::Allow);
    }

    #[test]
    fn regular_users_cannot_reach_admin_routes() {
        let session = session_with(UserRole::User);
        assert_eq!(guard(Route::Connections, &session), Navigation::Allow);
        assert_eq!(guard(Route::Companies, &session), Navigation::Redirect(Route::Home));
    }

    #[test]
    fn admins_reach_everything_but_login() {
        let session = session_with(UserRole::Admin);
        assert_eq!(guard(Route::Users, &session), Navigation::Allow);
        assert_eq!(guard(Route::Login, &session), Navigation::Redirect(Route::Home));
    }

    #[test]
    fn navigator_publishes_guarded_route() {
        let navigator = Navigator::default();
        let mut updates = navigator.subscribe();
        let reached = navigator.navigate(Route::Users, &SessionHandle::in_memory());
        assert_eq!(reached, Route::Login);
        assert!(updates.has_changed().unwrap());
        assert_eq!(*updates.borrow_and_update(), Route::Login);
    }
}
