use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Discord API error: {0}")]
    Discord(#[from] serenity::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AI service error: {0}")]
    Ai(String),

    #[error("AI functionality is not configured")]
    AiDisabled,

    #[error("TBA request failed with status {status}")]
    Tba { status: u16 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Invalid(String),
}

impl From<&str> for BotError {
    fn from(s: &str) -> Self {
        BotError::Invalid(s.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
