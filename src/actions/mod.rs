//! User-facing operations. Each call reports its outcome through the
//! [`Notifier`] and returns a plain success flag or the data it loaded.

pub mod auth;
pub mod companies;
pub mod connections;
pub mod leads;
pub mod templates;
pub mod users;

pub use auth::AuthActions;
pub use companies::CompanyActions;
pub use connections::ConnectionActions;
pub use leads::LeadActions;
pub use templates::TemplateActions;
pub use users::UserActions;

use crate::errors::AppError;
use crate::services::notifier::Notifier;

/// Turns a store result into a notification and a flag.
pub(crate) fn report<T>(notifier: &dyn Notifier, result: Result<T, AppError>, success: &str, failure: &str) -> bool {
    match result {
        Ok(_) => {
            notifier.success(success);
            true
        }
        Err(err) => {
            notifier.error(&failure_message(failure, &err));
            false
        }
    }
}

/// Like [`report`] without a success notification, keeping the value.
pub(crate) fn quietly<T>(notifier: &dyn Notifier, result: Result<T, AppError>, failure: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            notifier.error(&failure_message(failure, &err));
            None
        }
    }
}

fn failure_message(failure: &str, err: &AppError) -> String {
    log::error!("{} [{}]: {}", failure, err.code(), err);
    format!("{}: {}", failure, err)
}
