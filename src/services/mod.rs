pub mod envelope;
pub mod http_client;
pub mod notifier;
pub mod request_guard;
pub mod retry;
pub mod session;
pub mod validation;
