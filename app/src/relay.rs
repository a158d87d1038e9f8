use poise::serenity_prelude::{
    self as serenity, CreateAllowedMentions, CreateEmbed, ExecuteWebhook, Http, Webhook,
};
use regex::{Regex, RegexBuilder};

use crate::error::{BotError, Result};

pub const DEFAULT_USERNAME: &str = "Latesh Bot";
pub const DEFAULT_EMBED_COLOR: &str = "0099ff";
pub const HIDDEN_CONTENT: &str = "[Message content hidden - Enable Message Content Intent]";

/// Display name and avatar a webhook post appears under.
#[derive(Debug, Clone)]
pub struct Identity {
    pub username: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(username: Option<String>, avatar_url: Option<String>) -> Self {
        Self {
            username: username
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            avatar_url: avatar_url.filter(|a| !a.trim().is_empty()),
        }
    }

    fn apply(&self, builder: ExecuteWebhook) -> ExecuteWebhook {
        let builder = builder
            .username(&self.username)
            .allowed_mentions(CreateAllowedMentions::new());
        match &self.avatar_url {
            Some(url) => builder.avatar_url(url),
            None => builder,
        }
    }
}

/// A channel whose messages are re-posted through a webhook.
#[derive(Debug, Clone)]
pub struct ForwardRule {
    pub webhook: Webhook,
    pub filter: Option<Regex>,
}

impl ForwardRule {
    pub fn accepts(&self, content: &str) -> bool {
        passes_filter(self.filter.as_ref(), content)
    }
}

/// Messages without content always pass.
pub fn passes_filter(filter: Option<&Regex>, content: &str) -> bool {
    match filter {
        Some(filter) if !content.is_empty() => filter.is_match(content),
        _ => true,
    }
}

pub fn compile_filter(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| BotError::Invalid(format!("Invalid filter pattern: {e}")))
}

pub fn parse_color(hex: &str) -> Result<u32> {
    let trimmed = hex.trim().trim_start_matches('#');
    if trimmed.is_empty() || trimmed.len() > 6 || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BotError::Invalid(format!("Invalid hex color: {hex}")));
    }
    u32::from_str_radix(trimmed, 16).map_err(|_| BotError::Invalid(format!("Invalid hex color: {hex}")))
}

pub fn forward_content(content: &str, attachments: &[String]) -> String {
    let mut out = if content.is_empty() {
        HIDDEN_CONTENT.to_string()
    } else {
        content.to_string()
    };
    if !attachments.is_empty() {
        out.push_str("\n\n**Attachments:**\n");
        out.push_str(&attachments.join("\n"));
    }
    out
}

pub async fn resolve(http: &Http, url: &str) -> Result<Webhook> {
    Ok(Webhook::from_url(http, url).await?)
}

pub async fn send_text(http: &Http, webhook: &Webhook, identity: &Identity, content: &str) -> Result<()> {
    let builder = identity.apply(ExecuteWebhook::new().content(content));
    webhook.execute(http, false, builder).await?;
    Ok(())
}

pub async fn send_embed(
    http: &Http,
    webhook: &Webhook,
    identity: &Identity,
    embed: CreateEmbed,
) -> Result<()> {
    let builder = identity.apply(ExecuteWebhook::new().embed(embed));
    webhook.execute(http, false, builder).await?;
    Ok(())
}

pub async fn forward(http: &Http, rule: &ForwardRule, message: &serenity::Message) -> Result<()> {
    if !rule.accepts(&message.content) {
        return Ok(());
    }

    let attachments: Vec<String> = message.attachments.iter().map(|a| a.url.clone()).collect();
    let identity = Identity::new(
        Some(message.author.global_name.clone().unwrap_or_else(|| message.author.name.clone())),
        Some(message.author.face()),
    );
    send_text(
        http,
        &rule.webhook,
        &identity,
        &forward_content(&message.content, &attachments),
    )
    .await?;
    tracing::info!("Forwarded message from {}", message.author.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_parse_from_hex() {
        assert_eq!(parse_color(DEFAULT_EMBED_COLOR).unwrap(), 0x0099ff);
        assert_eq!(parse_color("#FF0000").unwrap(), 0xff0000);
        assert!(parse_color("zzz").is_err());
        assert!(parse_color("").is_err());
        assert!(parse_color("1234567").is_err());
        assert!(parse_color("+ff000").is_err());
        assert!(parse_color("#+ff00").is_err());
    }

    #[test]
    fn forwarded_content_lists_attachments() {
        let out = forward_content("look", &["https://cdn/a.png".into(), "https://cdn/b.png".into()]);
        assert_eq!(out, "look\n\n**Attachments:**\nhttps://cdn/a.png\nhttps://cdn/b.png");
        assert_eq!(forward_content("", &[]), HIDDEN_CONTENT);
    }

    #[test]
    fn identity_defaults_username() {
        let id = Identity::new(Some("  ".into()), Some(String::new()));
        assert_eq!(id.username, DEFAULT_USERNAME);
        assert!(id.avatar_url.is_none());
    }

    #[test]
    fn filter_is_case_insensitive() {
        let filter = compile_filter("match|score").unwrap();
        assert!(filter.is_match("Final SCORE posted"));
        assert!(!filter.is_match("lunch"));
        assert!(compile_filter("(").is_err());
    }

    #[test]
    fn empty_content_skips_filter() {
        let filter = compile_filter("^frc").unwrap();
        assert!(passes_filter(Some(&filter), ""));
        assert!(passes_filter(Some(&filter), "FRC kickoff"));
        assert!(!passes_filter(Some(&filter), "kickoff"));
        assert!(passes_filter(None, "anything"));
    }
}
