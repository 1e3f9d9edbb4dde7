pub mod actions;
pub mod app_state;
pub mod config;
pub mod errors;
pub mod models;
pub mod router;
pub mod services;
pub mod stores;

#[cfg(test)]
mod testing;
