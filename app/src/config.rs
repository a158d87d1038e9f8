use anyhow::Context as _;
use std::path::PathBuf;

use crate::error::BotError;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-04-17";
pub const DEFAULT_ACTIVITY: &str = "AI-powered FRC Analysis";
pub const DEFAULT_PROFILES_PATH: &str = "data/user_profiles.json";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub tba_api_key: Option<String>,
    pub default_webhook_url: Option<String>,
    pub port: u16,
    pub activity: String,
    pub profiles_path: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let discord_token = std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN not set")?;
        Self::from_lookup(discord_token, |key| std::env::var(key).ok())
            .context("invalid bot configuration")
    }

    fn from_lookup(
        discord_token: String,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, BotError> {
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| BotError::Config(format!("PORT must be a port number, got {raw:?}")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            discord_token,
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tba_api_key: non_empty("TBA_API_KEY"),
            default_webhook_url: non_empty("DEFAULT_WEBHOOK_URL"),
            port,
            activity: non_empty("BOT_ACTIVITY").unwrap_or_else(|| DEFAULT_ACTIVITY.to_string()),
            profiles_path: non_empty("PROFILES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILES_PATH)),
        })
    }

    pub fn warn_missing(&self) {
        if self.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set, AI features are disabled");
        }
        if self.tba_api_key.is_none() {
            tracing::warn!("TBA_API_KEY not set, FRC lookups will be rejected by The Blue Alliance");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn build(vars: &[(&str, &str)]) -> Result<Config, BotError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup("token".into(), |key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = build(&[]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.activity, DEFAULT_ACTIVITY);
        assert_eq!(config.profiles_path, PathBuf::from(DEFAULT_PROFILES_PATH));
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = build(&[("GEMINI_API_KEY", "  "), ("TBA_API_KEY", "abc")]).unwrap();
        assert!(config.gemini_api_key.is_none());
        assert_eq!(config.tba_api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(matches!(build(&[("PORT", "http")]), Err(BotError::Config(_))));
        assert_eq!(build(&[("PORT", "8080")]).unwrap().port, 8080);
    }
}
