use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Request failed with status {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Session expired or invalid")]
    Unauthorized,

    #[error("Unexpected response format: {0}")]
    Payload(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation rejected by backend: {0}")]
    Domain(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ReqwestError(_) => "HTTP_ERROR",
            AppError::JsonError(_) => "JSON_ERROR",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::IoError(_) => "STORAGE_ERROR",
            AppError::Status { .. } => "HTTP_STATUS",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Payload(_) => "PAYLOAD_ERROR",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Domain(_) => "DOMAIN_ERROR",
        }
    }

    /// True for failures raised before any request left the process.
    pub fn is_local(&self) -> bool {
        matches!(self, AppError::InvalidInput(_) | AppError::NotFound(_))
    }
}
