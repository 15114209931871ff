use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{var} not set in environment or .env file")]
    MissingCredential { var: &'static str },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Browser error: {0:#}")]
    Browser(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("No content in model response: {0}")]
    EmptyCompletion(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
