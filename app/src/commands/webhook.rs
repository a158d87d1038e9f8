use crate::relay::{self, ForwardRule, Identity, DEFAULT_EMBED_COLOR};
use crate::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude::{
    self as serenity, ChannelId, Color, CreateAttachment, CreateEmbed, CreateEmbedFooter, CreateWebhook,
};
use poise::CreateReply;
use tracing::{error, info};

const NO_WEBHOOK: &str = "❌ No webhook URL provided and no default webhook configured.";

fn success_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title(title)
        .description(description)
        .color(Color::from_rgb(0, 255, 0))
        .timestamp(Utc::now())
}

fn target_url(ctx: &Context<'_>, url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
        .or_else(|| ctx.data().config.default_webhook_url.clone())
}

/// Send a message through a webhook
#[poise::command(
    slash_command,
    rename = "webhook-send",
    category = "Webhooks",
    required_permissions = "MANAGE_WEBHOOKS",
    default_member_permissions = "MANAGE_WEBHOOKS"
)]
pub async fn webhook_send(
    ctx: Context<'_>,
    #[description = "Message to send"] message: String,
    #[rename = "webhook-url"]
    #[description = "Webhook URL (uses default if not provided)"]
    webhook_url: Option<String>,
    #[description = "Custom username for the webhook"] username: Option<String>,
    #[description = "Avatar URL for the webhook"] avatar: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let Some(url) = target_url(&ctx, webhook_url) else {
        ctx.say(NO_WEBHOOK).await?;
        return Ok(());
    };
    let identity = Identity::new(username, avatar);
    let http = &ctx.serenity_context().http;

    let sent = match relay::resolve(http, &url).await {
        Ok(webhook) => relay::send_text(http, &webhook, &identity, &message).await,
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        error!("Webhook send error: {}", e);
        ctx.say("❌ Failed to send message through webhook.").await?;
        return Ok(());
    }

    let embed = success_embed("✅ Message Sent", "Message successfully sent through webhook!")
        .field("Message", crate::character::truncate(&message, 1024), false)
        .field("Username", &identity.username, true);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Send an embed through a webhook
#[poise::command(
    slash_command,
    rename = "webhook-embed",
    category = "Webhooks",
    required_permissions = "MANAGE_WEBHOOKS",
    default_member_permissions = "MANAGE_WEBHOOKS"
)]
pub async fn webhook_embed(
    ctx: Context<'_>,
    #[description = "Embed title"] title: String,
    #[description = "Embed description"] description: String,
    #[description = "Embed color (hex code without #)"] color: Option<String>,
    #[rename = "webhook-url"]
    #[description = "Webhook URL (uses default if not provided)"]
    webhook_url: Option<String>,
    #[description = "Custom username for the webhook"] username: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let Some(url) = target_url(&ctx, webhook_url) else {
        ctx.say(NO_WEBHOOK).await?;
        return Ok(());
    };
    let color = match relay::parse_color(color.as_deref().unwrap_or(DEFAULT_EMBED_COLOR)) {
        Ok(color) => color,
        Err(e) => {
            ctx.say(format!("❌ {e}")).await?;
            return Ok(());
        }
    };

    let embed = CreateEmbed::default()
        .title(&title)
        .description(&description)
        .color(color)
        .footer(CreateEmbedFooter::new("Sent via Latesh Analysis Bot"))
        .timestamp(Utc::now());
    let identity = Identity::new(username, None);
    let http = &ctx.serenity_context().http;

    let sent = match relay::resolve(http, &url).await {
        Ok(webhook) => relay::send_embed(http, &webhook, &identity, embed).await,
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        error!("Webhook embed error: {}", e);
        ctx.say("❌ Failed to send embed through webhook.").await?;
        return Ok(());
    }

    let embed = success_embed("✅ Embed Sent", "Embed successfully sent through webhook!")
        .field("Title", &title, false)
        .field("Description", crate::character::truncate(&description, 1024), false);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

const CREATE_FAILED: &str = "❌ Failed to create webhook. Check bot permissions.";

async fn fetch_avatar(
    http: &serenity::Http,
    url: Option<&str>,
) -> Result<Option<CreateAttachment>, &'static str> {
    let Some(url) = url else {
        return Ok(None);
    };
    CreateAttachment::url(http, url).await.map(Some).map_err(|e| {
        error!("Webhook avatar fetch error for {}: {}", url, e);
        CREATE_FAILED
    })
}

/// Create a new webhook in this channel
#[poise::command(
    slash_command,
    guild_only,
    rename = "webhook-create",
    category = "Webhooks",
    required_permissions = "MANAGE_WEBHOOKS",
    default_member_permissions = "MANAGE_WEBHOOKS"
)]
pub async fn webhook_create(
    ctx: Context<'_>,
    #[description = "Webhook name"] name: String,
    #[description = "Avatar URL for the webhook"] avatar: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let http = &ctx.serenity_context().http;
    let reason = format!("Created by {} via Latesh Bot", ctx.author().name);
    let attachment = match fetch_avatar(http, avatar.as_deref()).await {
        Ok(attachment) => attachment,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };
    let mut builder = CreateWebhook::new(&name).audit_log_reason(&reason);
    if let Some(attachment) = &attachment {
        builder = builder.avatar(attachment);
    }

    let created = ctx.channel_id().create_webhook(http, builder).await;
    let webhook = match created {
        Ok(webhook) => webhook,
        Err(e) => {
            error!("Webhook creation error: {}", e);
            ctx.say(CREATE_FAILED).await?;
            return Ok(());
        }
    };

    let url = webhook.url()?;
    info!("Created webhook {} in {}", name, ctx.channel_id());
    let embed = success_embed("✅ Webhook Created", &format!("Webhook \"{name}\" created successfully!"))
        .field("Webhook URL", format!("||{url}||"), false)
        .field("Channel", format!("<#{}>", ctx.channel_id()), true)
        .field("Created by", &ctx.author().name, true);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List all webhooks in this server
#[poise::command(
    slash_command,
    guild_only,
    rename = "webhook-list",
    category = "Webhooks",
    required_permissions = "MANAGE_WEBHOOKS",
    default_member_permissions = "MANAGE_WEBHOOKS"
)]
pub async fn webhook_list(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let webhooks = match guild_id.webhooks(ctx.http()).await {
        Ok(webhooks) => webhooks,
        Err(e) => {
            error!("Webhook list error: {}", e);
            ctx.say("❌ Failed to fetch webhooks.").await?;
            return Ok(());
        }
    };
    if webhooks.is_empty() {
        ctx.say("No webhooks found in this server.").await?;
        return Ok(());
    }

    // Embeds hold at most 25 fields.
    let fields = webhooks.iter().take(25).map(|wh| {
        let channel = wh
            .channel_id
            .map(|c| format!("<#{c}>"))
            .unwrap_or_else(|| "Unknown".to_string());
        (
            wh.name.clone().unwrap_or_else(|| "Unnamed Webhook".to_string()),
            format!("Channel: {channel}\nID: {}", wh.id),
            true,
        )
    });
    let embed = CreateEmbed::default()
        .title("🔗 Server Webhooks")
        .description(format!("Found {} webhook(s)", webhooks.len()))
        .color(Color::from_rgb(0, 153, 255))
        .fields(fields)
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Setup message forwarding from a channel to a webhook
#[poise::command(
    slash_command,
    guild_only,
    rename = "forward-setup",
    category = "Webhooks",
    required_permissions = "MANAGE_WEBHOOKS",
    default_member_permissions = "MANAGE_WEBHOOKS"
)]
pub async fn forward_setup(
    ctx: Context<'_>,
    #[description = "Source channel to forward from"]
    #[channel_types("Text", "News")]
    source: serenity::GuildChannel,
    #[rename = "webhook-url"]
    #[description = "Webhook URL to forward to"]
    webhook_url: String,
    #[description = "Optional message filter (regex)"] filter: Option<String>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let filter_regex = match filter.as_deref().filter(|f| !f.is_empty()) {
        Some(pattern) => match relay::compile_filter(pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        },
        None => None,
    };
    let webhook = match relay::resolve(ctx.http(), &webhook_url).await {
        Ok(webhook) => webhook,
        Err(e) => {
            error!("Forward setup webhook error: {}", e);
            ctx.say("❌ Invalid webhook URL.").await?;
            return Ok(());
        }
    };

    let source_id: ChannelId = source.id;
    ctx.data().forwarding.write().insert(
        source_id,
        ForwardRule {
            webhook,
            filter: filter_regex,
        },
    );
    info!("Forwarding configured for channel {}", source_id);

    let embed = success_embed("✅ Forwarding Setup", "Message forwarding configured successfully!")
        .field("Source Channel", format!("<#{source_id}>"), true)
        .field("Filter", filter.unwrap_or_else(|| "None".to_string()), true);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_avatar_fails_creation() {
        let http = serenity::Http::new("");
        assert!(matches!(fetch_avatar(&http, Some("not a url")).await, Err(CREATE_FAILED)));
        assert!(matches!(fetch_avatar(&http, None).await, Ok(None)));
    }
}
