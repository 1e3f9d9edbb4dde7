pub mod auth;
pub mod companies;
pub mod connections;
pub mod templates;
pub mod users;
pub mod validation;

pub use auth::AuthStore;
pub use companies::CompanyStore;
pub use connections::ConnectionStore;
pub use templates::TemplateStore;
pub use users::UserStore;
pub use validation::{ValidationData, ValidationStore};
