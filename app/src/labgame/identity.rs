use chrono::Utc;
use poise::serenity_prelude::{
    ChannelId, CreateAllowedMentions, CreateAttachment, CreateWebhook, ExecuteWebhook, Http, UserId,
    Webhook,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::LabGames;
use crate::profiles::{ProfileStore, UserProfile};

const GENERATED_AVATAR_BASE: &str = "https://ui-avatars.com/api/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Custom(String),
    Discord(String),
    Generated(String),
}

impl Avatar {
    pub fn url(&self) -> &str {
        match self {
            Avatar::Custom(url) | Avatar::Discord(url) | Avatar::Generated(url) => url,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Avatar::Generated(_))
    }
}

pub fn generated_avatar(name: &str) -> String {
    reqwest::Url::parse_with_params(
        GENERATED_AVATAR_BASE,
        &[("name", name), ("background", "random"), ("color", "fff")],
    )
    .map(String::from)
    .unwrap_or_else(|_| GENERATED_AVATAR_BASE.to_string())
}

/// Custom avatar first, then the Discord account, then a generated one.
pub async fn avatar_for(http: &Http, profile: &UserProfile) -> Avatar {
    if let Some(url) = &profile.avatar_url {
        return Avatar::Custom(url.clone());
    }
    if let Some(id) = profile.user_id() {
        match http.get_user(id).await {
            Ok(user) => return Avatar::Discord(user.face()),
            Err(e) => warn!("Could not fetch Discord avatar for {}: {e}", profile.name),
        }
    }
    Avatar::Generated(generated_avatar(&profile.name))
}

async fn remember_url(profiles: &RwLock<ProfileStore>, user: UserId, webhook: &Webhook) {
    let Ok(url) = webhook.url() else {
        return;
    };
    let mut store = profiles.write().await;
    if let Some(profile) = store.get_mut(user) {
        profile.webhook_url = Some(url);
        profile.updated_at = Utc::now();
    }
    if let Err(e) = store.save().await {
        warn!("Failed to save webhook url for {user}: {e}");
    }
}

async fn saved_webhook(http: &Http, profile: &UserProfile, channel: ChannelId) -> Option<Webhook> {
    let url = profile.webhook_url.as_deref()?;
    match Webhook::from_url(http, url).await {
        Ok(webhook) if webhook.channel_id == Some(channel) => Some(webhook),
        Ok(_) => None,
        Err(e) => {
            warn!("Saved webhook for {} is no longer valid: {e}", profile.name);
            None
        }
    }
}

async fn existing_webhook(http: &Http, channel: ChannelId, name: &str) -> Option<Webhook> {
    match channel.webhooks(http).await {
        Ok(hooks) => hooks
            .into_iter()
            .find(|wh| wh.name.as_deref() == Some(name) && wh.token.is_some()),
        Err(e) => {
            warn!("Could not list webhooks in {channel}: {e}");
            None
        }
    }
}

async fn create_webhook(http: &Http, channel: ChannelId, profile: &UserProfile) -> Option<Webhook> {
    let avatar = avatar_for(http, profile).await;
    let reason = format!("Lab game simulation for {}", profile.name);
    let mut builder = CreateWebhook::new(&profile.name).audit_log_reason(&reason);

    let attachment = match CreateAttachment::url(http, avatar.url()).await {
        Ok(attachment) => Some(attachment),
        Err(e) => {
            warn!("Could not download avatar for {}: {e}", profile.name);
            None
        }
    };
    if let Some(attachment) = &attachment {
        builder = builder.avatar(attachment);
    }

    match channel.create_webhook(http, builder).await {
        Ok(webhook) => {
            info!("Created webhook for {} in {channel}", profile.name);
            Some(webhook)
        }
        Err(e) => {
            warn!("Failed to create webhook for {}: {e}", profile.name);
            None
        }
    }
}

/// Finds or creates the webhook a participant speaks through in `channel`.
pub async fn participant_webhook(
    http: &Http,
    games: &LabGames,
    profiles: &Arc<RwLock<ProfileStore>>,
    channel: ChannelId,
    user: UserId,
) -> Option<Webhook> {
    if let Some(webhook) = games.identity(channel, user) {
        return Some(webhook);
    }

    let profile = profiles.read().await.get(user).cloned()?;

    if let Some(webhook) = saved_webhook(http, &profile, channel).await {
        games.set_identity(channel, user, webhook.clone());
        return Some(webhook);
    }

    let found = match existing_webhook(http, channel, &profile.name).await {
        Some(webhook) => Some(webhook),
        None => create_webhook(http, channel, &profile).await,
    }?;

    remember_url(profiles, user, &found).await;
    games.set_identity(channel, user, found.clone());
    Some(found)
}

/// Returns how many participants ended up with a webhook.
pub async fn setup_identities(
    http: &Http,
    games: &LabGames,
    profiles: &Arc<RwLock<ProfileStore>>,
    channel: ChannelId,
    participants: &[UserId],
) -> usize {
    let mut ready = 0;
    for user in participants {
        if participant_webhook(http, games, profiles, channel, *user)
            .await
            .is_some()
        {
            ready += 1;
        }
    }
    info!("Set up {ready}/{} participant webhooks in {channel}", participants.len());
    ready
}

/// Posts a line as the participant, falling back to a plain channel message.
pub async fn speak(
    http: &Http,
    channel: ChannelId,
    webhook: Option<&Webhook>,
    name: &str,
    avatar: &Avatar,
    text: &str,
) {
    if let Some(webhook) = webhook {
        let builder = ExecuteWebhook::new()
            .content(text)
            .username(name)
            .avatar_url(avatar.url())
            .allowed_mentions(CreateAllowedMentions::new());
        match webhook.execute(http, false, builder).await {
            Ok(_) => return,
            Err(e) => warn!("Webhook send failed for {name}: {e}"),
        }
    }

    if let Err(e) = channel.say(http, format!("**{name}:** {text}")).await {
        warn!("Failed to post fallback message for {name}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_avatar_encodes_name() {
        assert_eq!(
            generated_avatar("Ana María"),
            "https://ui-avatars.com/api/?name=Ana+Mar%C3%ADa&background=random&color=fff"
        );
    }

    #[test]
    fn avatar_kinds() {
        let custom = Avatar::Custom("https://x/a.png".into());
        assert_eq!(custom.url(), "https://x/a.png");
        assert!(!custom.is_generated());
        assert!(Avatar::Generated(generated_avatar("Bo")).is_generated());
    }
}
