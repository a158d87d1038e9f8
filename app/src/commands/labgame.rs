use crate::character::truncate;
use crate::labgame::{self, identity, LabGame, MAX_PARTICIPANTS, MIN_PARTICIPANTS};
use crate::profiles::UserProfile;
use crate::tasks::{self, conversation::ConversationTask};
use crate::{Context, Data, Error};
use chrono::Utc;
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, ChannelId, Color, ComponentInteraction, ComponentInteractionDataKind,
    CreateActionRow, CreateButton, CreateEmbed, CreateEmbedFooter, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption, EditInteractionResponse, Message, Permissions, ReactionType, UserId,
};
use poise::CreateReply;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info, warn};

pub const SELECT_PREFIX: &str = "select_participants_";
pub const START_PREFIX: &str = "start_conversation_";

const NO_GAME: &str =
    "❌ No lab game found. Use `/latesh start` to begin one, or ensure you are the game creator.";
const PERMISSION_WARNING_WAIT: Duration = Duration::from_secs(5);
const MAX_OPTIONS: usize = 25;
const TEAL: Color = Color::new(0x00ae86);
const GOLD: Color = Color::new(0xffd700);

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://\S+\.(png|jpg|jpeg|gif|webp)(\?\S*)?").expect("image url pattern is valid")
});

/// The first image link in a message, if any.
pub fn find_image_url(content: &str) -> Option<&str> {
    IMAGE_URL.find(content).map(|m| m.as_str())
}

/// Parses a `select_participants_` or `start_conversation_` custom id.
pub fn game_channel(custom_id: &str, prefix: &str) -> Option<ChannelId> {
    custom_id
        .strip_prefix(prefix)?
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
}

fn option_description(profile: &UserProfile) -> String {
    let role = profile.role.as_deref().unwrap_or("Participant");
    let place = match (&profile.team, &profile.location) {
        (Some(team), _) => format!("Team {team}"),
        (None, Some(location)) => location.clone(),
        (None, None) => "Not specified".to_string(),
    };
    truncate(&format!("{role} - {place}"), 100)
}

/// Suffix naming the simulation channel when the command ran elsewhere.
fn channel_note(current: ChannelId, simulation: ChannelId, preposition: &str) -> String {
    if current == simulation {
        String::new()
    } else {
        format!(" {preposition} <#{simulation}>")
    }
}

fn is_valid_avatar_url(url: &str) -> bool {
    reqwest::Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

async fn reply_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// The game this command controls, answering with a not-found message when there is none.
async fn find_game(ctx: Context<'_>, missing: &str) -> Result<Option<ChannelId>, Error> {
    let found = ctx.data().lab.resolve(ctx.channel_id(), ctx.author().id);
    if found.is_none() {
        reply_ephemeral(ctx, missing).await?;
    }
    Ok(found)
}

async fn post_embed(ctx: &serenity::Context, channel: ChannelId, embed: CreateEmbed) {
    if let Err(e) = channel.send_message(&ctx.http, CreateMessage::new().embed(embed)).await {
        warn!("Failed to post to simulation channel {channel}: {e}");
    }
}

/// Claims the game's run token now, so any older run stops before this one wakes up.
fn spawn_run(ctx: &serenity::Context, data: &Data, channel: ChannelId, delay: Duration) {
    let Some(token) = data.lab.begin_run(channel) else {
        return;
    };
    tasks::spawn(ctx, data.clone(), Box::new(ConversationTask::new(channel, token, delay)));
}

/// Start a personality simulation lab game
#[poise::command(
    slash_command,
    guild_only,
    category = "Lab Game",
    subcommands(
        "start", "setting", "pause", "resume", "prompt", "restart", "stop", "status", "cleanup",
        "avatar"
    )
)]
pub async fn latesh(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Start a new lab game
#[poise::command(slash_command, guild_only)]
pub async fn start(
    ctx: Context<'_>,
    #[description = "Description of the scenario/issue to discuss"] description: String,
    #[description = "Channel where the simulation will take place"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let data = ctx.data();
    let current = ctx.channel_id();
    let target = channel.as_ref().map(|c| c.id).unwrap_or(current);

    if data.lab.contains(target) {
        let place = match &channel {
            Some(c) => format!("<#{}>", c.id),
            None => "this channel".to_string(),
        };
        return reply_ephemeral(
            ctx,
            format!("❌ A lab game is already running in {place}. Use `/latesh stop` to end it first."),
        )
        .await;
    }

    let profiles: Vec<UserProfile> = {
        let store = data.profiles.read().await;
        store.iter().map(|(_, p)| p.clone()).collect()
    };
    if profiles.len() < MIN_PARTICIPANTS {
        return reply_ephemeral(
            ctx,
            "❌ At least two user profiles are needed. Ask members to create one with `/remember me`.",
        )
        .await;
    }

    if let Some(chosen) = channel.as_ref().filter(|c| c.id != current) {
        let bot = ctx.cache().current_user().id;
        let permissions = ctx.guild().and_then(|guild| {
            let member = guild.members.get(&bot)?;
            Some(guild.user_permissions_in(chosen, member))
        });
        match permissions {
            Some(perms) if !perms.contains(Permissions::SEND_MESSAGES | Permissions::VIEW_CHANNEL) => {
                return reply_ephemeral(
                    ctx,
                    format!(
                        "❌ I don't have permission to send messages in <#{}>. Please check my permissions.",
                        chosen.id
                    ),
                )
                .await;
            }
            Some(perms) if !perms.manage_webhooks() => {
                let embed = CreateEmbed::default()
                    .title("⚠️ Limited Permissions")
                    .description(format!(
                        "I don't have webhook permissions in <#{}>.\n\nThe simulation will work but messages will be less realistic.\nFor the best experience, please give me \"Manage Webhooks\" permission.",
                        chosen.id
                    ))
                    .footer(CreateEmbedFooter::new("The game will continue in 5 seconds..."))
                    .color(GOLD);
                ctx.send(CreateReply::default().embed(embed).ephemeral(true)).await?;
                tokio::time::sleep(PERMISSION_WARNING_WAIT).await;
            }
            Some(_) => {}
            None => warn!("Could not check permissions in {}", chosen.id),
        }
    }

    let options: Vec<CreateSelectMenuOption> = profiles
        .iter()
        .take(MAX_OPTIONS)
        .map(|p| {
            CreateSelectMenuOption::new(truncate(&p.name, 100), p.discord_id.clone())
                .description(option_description(p))
        })
        .collect();
    let max = options.len().min(MAX_PARTICIPANTS) as u8;
    let menu = CreateSelectMenu::new(
        format!("{SELECT_PREFIX}{target}"),
        CreateSelectMenuKind::String { options },
    )
    .placeholder("Choose participants for the lab game")
    .min_values(MIN_PARTICIPANTS as u8)
    .max_values(max);

    if !data
        .lab
        .insert(LabGame::new(&description, ctx.author().id, target))
    {
        return reply_ephemeral(ctx, "❌ A lab game is already running there. Use `/latesh stop` to end it first.")
            .await;
    }
    info!("Lab game created by {} for {}", ctx.author().name, target);

    let channel_info = if target != current {
        format!("**Simulation Channel:** <#{target}>\n")
    } else {
        String::new()
    };
    let embed = CreateEmbed::default()
        .title("🧪 Lab Game Setup")
        .description(format!(
            "{channel_info}**Scenario:** {description}\n\nSelect the participants who will be involved in this conversation simulation."
        ))
        .footer(CreateEmbedFooter::new("Choose 2-10 participants to simulate"))
        .color(TEAL);
    ctx.send(
        CreateReply::default()
            .embed(embed)
            .components(vec![CreateActionRow::SelectMenu(menu)]),
    )
    .await?;
    Ok(())
}

async fn respond_ephemeral(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    content: &str,
) -> Result<(), Error> {
    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

/// Handles the participant select menu from `/latesh start`.
pub async fn handle_selection(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
    channel: ChannelId,
) -> Result<(), Error> {
    let Some(game) = data.lab.get(channel) else {
        return respond_ephemeral(ctx, component, "❌ Game session expired. Please start a new game.").await;
    };
    let ComponentInteractionDataKind::StringSelect { values } = &component.data.kind else {
        return Ok(());
    };

    let chosen: Vec<UserProfile> = {
        let store = data.profiles.read().await;
        values
            .iter()
            .filter_map(|v| v.parse::<u64>().ok().filter(|id| *id != 0))
            .filter_map(|id| store.get(UserId::new(id)).cloned())
            .collect()
    };
    if chosen.len() < MIN_PARTICIPANTS {
        return respond_ephemeral(
            ctx,
            component,
            "❌ Please pick at least two participants that still have profiles.",
        )
        .await;
    }

    let ids: Vec<UserId> = chosen.iter().filter_map(UserProfile::user_id).collect();
    data.lab.with_game(channel, |g| g.select_participants(ids));

    let participants = chosen
        .iter()
        .map(|p| format!("• **{}** - {}", p.name, p.role.as_deref().unwrap_or("Participant")))
        .collect::<Vec<_>>()
        .join("\n");
    let channel_info = if channel != component.channel_id {
        format!("**Simulation Channel:** <#{channel}>\n")
    } else {
        String::new()
    };
    let embed = CreateEmbed::default()
        .title("✅ Lab Game Ready")
        .description(format!(
            "{channel_info}**Scenario:** {}\n\n**Participants:**\n{participants}",
            game.description
        ))
        .footer(CreateEmbedFooter::new(
            "Click the button below to begin the conversation simulation",
        ))
        .color(Color::from_rgb(0, 255, 0));
    let button = CreateButton::new(format!("{START_PREFIX}{channel}"))
        .label("🚀 Start Conversation")
        .style(ButtonStyle::Primary);

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .components(vec![CreateActionRow::Buttons(vec![button])]),
            ),
        )
        .await?;
    Ok(())
}

/// Handles the start button: prepares identities, then launches the first run.
pub async fn handle_start(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
    channel: ChannelId,
) -> Result<(), Error> {
    let Some(game) = data.lab.get(channel).filter(|g| g.started) else {
        return respond_ephemeral(ctx, component, "❌ No active game found.").await;
    };

    component
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().content(
                "🎬 **Setting up participant webhooks...**\n*This may take a moment for realistic messaging.*",
            )),
        )
        .await?;

    let ready =
        identity::setup_identities(&ctx.http, &data.lab, &data.profiles, channel, &game.participants).await;
    let embed = CreateEmbed::default()
        .title("✅ Webhooks Ready")
        .description(format!(
            "Successfully set up {ready} participant webhooks{}.\n*Conversation simulation starting...*",
            channel_note(component.channel_id, channel, "in")
        ))
        .footer(CreateEmbedFooter::new("Messages will appear as real users"))
        .color(Color::from_rgb(0, 255, 0));
    component
        .edit_response(&ctx.http, EditInteractionResponse::new().content("").embed(embed))
        .await?;

    spawn_run(ctx, data, channel, labgame::START_DELAY);
    Ok(())
}

/// Update the current setting/context
#[poise::command(slash_command, guild_only)]
pub async fn setting(
    ctx: Context<'_>,
    #[description = "Describe what is happening in the current setting"] description: String,
) -> Result<(), Error> {
    let Some(channel) = find_game(ctx, NO_GAME).await? else {
        return Ok(());
    };
    let started = ctx
        .data()
        .lab
        .with_game(channel, |g| {
            g.setting = Some(description.clone());
            g.started
        })
        .unwrap_or(false);

    let embed = CreateEmbed::default()
        .title("🎭 Setting Updated")
        .description(format!(
            "**New Setting{}:** {description}",
            channel_note(ctx.channel_id(), channel, "for")
        ))
        .footer(CreateEmbedFooter::new(
            "Participants will now respond based on this new context",
        ))
        .color(GOLD);
    ctx.send(CreateReply::default().embed(embed)).await?;

    if started {
        let scene = CreateEmbed::default()
            .title("📍 Scene Change")
            .description(format!("*The setting has changed: {description}*"))
            .color(Color::from_rgb(255, 165, 0))
            .timestamp(Utc::now());
        post_embed(ctx.serenity_context(), channel, scene).await;
    }
    Ok(())
}

/// Pause the current conversation
#[poise::command(slash_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = find_game(ctx, NO_GAME).await? else {
        return Ok(());
    };
    ctx.data().lab.with_game(channel, |g| g.paused = true);
    info!("Lab game in {} paused by {}", channel, ctx.author().name);

    let embed = CreateEmbed::default()
        .title("⏸️ Game Paused")
        .description(format!(
            "The conversation simulation{} has been paused.",
            channel_note(ctx.channel_id(), channel, "in")
        ))
        .footer(CreateEmbedFooter::new("Use /latesh resume to continue the conversation"))
        .color(GOLD);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Resume the paused conversation
#[poise::command(slash_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = find_game(ctx, NO_GAME).await? else {
        return Ok(());
    };
    let resumed = ctx
        .data()
        .lab
        .with_game(channel, |g| std::mem::replace(&mut g.paused, false))
        .unwrap_or(false);
    if !resumed {
        return reply_ephemeral(ctx, "❌ The game is not paused.").await;
    }

    let embed = CreateEmbed::default()
        .title("▶️ Game Resumed")
        .description(format!(
            "The conversation simulation{} has been resumed.",
            channel_note(ctx.channel_id(), channel, "in")
        ))
        .footer(CreateEmbedFooter::new("The conversation will continue shortly"))
        .color(Color::from_rgb(0, 255, 0));
    ctx.send(CreateReply::default().embed(embed)).await?;

    spawn_run(ctx.serenity_context(), ctx.data(), channel, labgame::RESUME_DELAY);
    Ok(())
}

/// Add a prompt to guide the conversation
#[poise::command(slash_command, guild_only)]
pub async fn prompt(
    ctx: Context<'_>,
    #[description = "A prompt or question to inject into the conversation"] message: String,
) -> Result<(), Error> {
    let Some(channel) = find_game(ctx, NO_GAME).await? else {
        return Ok(());
    };
    ctx.data()
        .lab
        .with_game(channel, |g| g.push_moderator(message.clone()));

    let purple = Color::from_rgb(153, 50, 204);
    let embed = CreateEmbed::default()
        .title("💭 Conversation Prompt")
        .description(&message)
        .footer(CreateEmbedFooter::new(format!(
            "Participants will respond to this prompt{}",
            channel_note(ctx.channel_id(), channel, "to")
        )))
        .color(purple);
    ctx.send(CreateReply::default().embed(embed)).await?;

    if channel != ctx.channel_id() {
        let echo = CreateEmbed::default()
            .title("💭 Moderator Prompt")
            .description(&message)
            .color(purple)
            .timestamp(Utc::now());
        post_embed(ctx.serenity_context(), channel, echo).await;
    }
    Ok(())
}

/// Restart the conversation with a fresh context reminder
#[poise::command(slash_command, guild_only)]
pub async fn restart(ctx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = find_game(ctx, NO_GAME).await? else {
        return Ok(());
    };
    let Some(topic) = ctx.data().lab.with_game(channel, |g| {
        g.restart();
        g.description.clone()
    }) else {
        return Ok(());
    };

    let blue = Color::from_rgb(0, 191, 255);
    let embed = CreateEmbed::default()
        .title("🔄 Conversation Restarted")
        .description(format!(
            "Refocusing the discussion{} on: **{topic}**",
            channel_note(ctx.channel_id(), channel, "in")
        ))
        .footer(CreateEmbedFooter::new("Participants will now get back on topic"))
        .color(blue);
    ctx.send(CreateReply::default().embed(embed)).await?;

    if channel != ctx.channel_id() {
        let echo = CreateEmbed::default()
            .title("🔄 Back to Topic")
            .description(format!("**Let's refocus on:** {topic}"))
            .color(blue)
            .timestamp(Utc::now());
        post_embed(ctx.serenity_context(), channel, echo).await;
    }

    spawn_run(ctx.serenity_context(), ctx.data(), channel, labgame::RESTART_DELAY);
    Ok(())
}

/// Stop the current lab game
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = find_game(ctx, "❌ No lab game found.").await? else {
        return Ok(());
    };
    let Some(game) = ctx.data().lab.get(channel) else {
        return Ok(());
    };

    let is_admin = ctx
        .author_member()
        .await
        .and_then(|m| m.permissions)
        .is_some_and(|p| p.administrator());
    if game.creator != ctx.author().id && !is_admin {
        return reply_ephemeral(ctx, "❌ Only the game creator or an administrator can stop the game.")
            .await;
    }

    ctx.data().lab.remove(channel);
    info!("Lab game in {} stopped by {}", channel, ctx.author().name);

    let embed = CreateEmbed::default()
        .title("🛑 Lab Game Stopped")
        .description(format!(
            "The personality simulation{} has been ended.",
            channel_note(ctx.channel_id(), channel, "in")
        ))
        .color(Color::RED)
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;

    if channel != ctx.channel_id() {
        let notice = CreateEmbed::default()
            .title("🛑 Simulation Ended")
            .description("The lab game has been stopped by the moderator.")
            .color(Color::RED)
            .timestamp(Utc::now());
        post_embed(ctx.serenity_context(), channel, notice).await;
    }
    Ok(())
}

fn controls(game: &LabGame) -> String {
    let first = if game.paused {
        "Use `/latesh resume` to continue"
    } else {
        "Use `/latesh pause` to pause"
    };
    [
        first,
        "Use `/latesh setting` to change context",
        "Use `/latesh prompt` to add a prompt",
        "Use `/latesh stop` to end the game",
    ]
    .join("\n")
}

/// Check the status of the current lab game
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let Some(channel) = find_game(ctx, "❌ No lab game found.").await? else {
        return Ok(());
    };
    let Some(game) = ctx.data().lab.get(channel) else {
        return Ok(());
    };

    let names = {
        let store = ctx.data().profiles.read().await;
        game.participants
            .iter()
            .map(|id| store.get(*id).map(|p| p.name.clone()).unwrap_or_else(|| "Unknown".into()))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let channel_info = if channel == ctx.channel_id() {
        "Current channel".to_string()
    } else {
        format!("<#{channel}>")
    };

    let mut embed = CreateEmbed::default()
        .title("📊 Lab Game Status")
        .field("📝 Scenario", &game.description, false)
        .field("📺 Simulation Channel", channel_info, false)
        .field(
            "👥 Participants",
            if names.is_empty() { "None selected".to_string() } else { names },
            false,
        )
        .field(
            "🎭 Current Setting",
            game.setting.as_deref().unwrap_or("No specific setting defined"),
            false,
        )
        .field("💬 Messages Exchanged", game.conversation.len().to_string(), true)
        .field("🎮 Status", game.status().label(), true)
        .color(TEAL)
        .timestamp(Utc::now());
    if game.started {
        embed = embed.field("🎛️ Controls", controls(&game), false);
    }
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Clean up old webhooks in the current channel
#[poise::command(slash_command, guild_only, ephemeral)]
pub async fn cleanup(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let channel = ctx.channel_id();
    let bot = ctx.cache().current_user().id;

    let hooks = match channel.webhooks(ctx.http()).await {
        Ok(hooks) => hooks,
        Err(e) => {
            error!("Error during webhook cleanup: {}", e);
            ctx.say("❌ Error occurred during cleanup. Check bot permissions.").await?;
            return Ok(());
        }
    };
    let owned: Vec<_> = hooks
        .into_iter()
        .filter(|wh| wh.user.as_ref().is_some_and(|u| u.id == bot))
        .collect();
    if owned.is_empty() {
        ctx.say("❌ No lab game webhooks found in this channel.").await?;
        return Ok(());
    }

    let mut deleted = 0;
    for webhook in &owned {
        match ctx
            .http()
            .delete_webhook(webhook.id, Some("Lab game webhook cleanup"))
            .await
        {
            Ok(()) => deleted += 1,
            Err(e) => warn!("Failed to delete webhook {:?}: {e}", webhook.name),
        }
    }
    ctx.data().lab.clear_identities(channel);
    info!("Deleted {deleted} lab game webhooks in {channel}");

    let embed = CreateEmbed::default()
        .title("🧹 Webhook Cleanup Complete")
        .description(format!(
            "Successfully deleted {deleted} lab game webhooks from this channel."
        ))
        .footer(CreateEmbedFooter::new(
            "New webhooks will be created as needed for future games",
        ))
        .color(Color::from_rgb(0, 255, 0));
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Set a profile picture for a user
#[poise::command(slash_command, guild_only, ephemeral)]
pub async fn avatar(
    ctx: Context<'_>,
    #[description = "The user to set the avatar for"] user: serenity::User,
    #[description = "Direct link to the image (PNG/JPG)"] url: String,
) -> Result<(), Error> {
    let url = url.trim().to_string();
    if !is_valid_avatar_url(&url) {
        return reply_ephemeral(ctx, "❌ Please provide a valid http(s) image link.").await;
    }

    let name = {
        let mut store = ctx.data().profiles.write().await;
        let updated = store.get_mut(user.id).map(|profile| {
            profile.avatar_url = Some(url.clone());
            profile.updated_at = Utc::now();
            profile.name.clone()
        });
        if updated.is_some() {
            store.save().await?;
        }
        updated
    };
    let Some(name) = name else {
        return reply_ephemeral(
            ctx,
            format!("❌ {} doesn't have a profile saved. Use `/remember me` to create one!", user.name),
        )
        .await;
    };
    info!("Avatar for {} set by {}", name, ctx.author().name);

    let embed = CreateEmbed::default()
        .title("✅ Profile Picture Set")
        .description(format!("Profile picture for **{name}** has been updated."))
        .thumbnail(&url)
        .footer(CreateEmbedFooter::new("This will be used in the simulation"))
        .color(Color::from_rgb(0, 255, 0));
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Assigns an image link posted in a game channel to the participant missing an avatar.
pub async fn capture_avatar(ctx: &serenity::Context, message: &Message, data: &Data) -> Result<bool, Error> {
    let Some(url) = find_image_url(&message.content) else {
        return Ok(false);
    };
    let Some(game) = data.lab.get(message.channel_id) else {
        return Ok(false);
    };

    let mut store = data.profiles.write().await;
    let missing: Vec<UserId> = game
        .participants
        .iter()
        .copied()
        .filter(|id| store.get(*id).is_some_and(|p| p.avatar_url.is_none()))
        .collect();

    match missing.as_slice() {
        [] => Ok(false),
        [only] => {
            let Some(name) = store.get_mut(*only).map(|profile| {
                profile.avatar_url = Some(url.to_string());
                profile.updated_at = Utc::now();
                profile.name.clone()
            }) else {
                return Ok(false);
            };
            store.save().await?;
            drop(store);
            info!("Captured avatar for {} from {}", name, message.author.name);

            message
                .react(ctx, ReactionType::Unicode("✅".to_string()))
                .await?;
            let embed = CreateEmbed::default()
                .title("✅ Profile Picture Set")
                .description(format!("Automatically set profile picture for **{name}**"))
                .thumbnail(url)
                .footer(CreateEmbedFooter::new("This will be used in the simulation"))
                .color(Color::from_rgb(0, 255, 0));
            post_embed(ctx, message.channel_id, embed).await;
            Ok(true)
        }
        several => {
            let names = several
                .iter()
                .filter_map(|id| store.get(*id).map(|p| p.name.clone()))
                .collect::<Vec<_>>()
                .join(", ");
            drop(store);
            let embed = CreateEmbed::default()
                .title("📸 Multiple Profiles Need Pictures")
                .description(format!(
                    "Found an image URL, but multiple participants need profile pictures: **{names}**\n\nPlease use `/latesh avatar @user <url>` to specify which person this picture is for."
                ))
                .footer(CreateEmbedFooter::new(
                    "You can also mention the person's name with the URL",
                ))
                .color(GOLD);
            post_embed(ctx, message.channel_id, embed).await;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_are_found() {
        assert_eq!(
            find_image_url("here you go https://cdn.example.com/a/pic.PNG?size=128 thanks"),
            Some("https://cdn.example.com/a/pic.PNG?size=128")
        );
        assert_eq!(find_image_url("http://x.io/face.webp"), Some("http://x.io/face.webp"));
        assert_eq!(find_image_url("https://example.com/page.html"), None);
        assert_eq!(find_image_url("no links"), None);
    }

    #[test]
    fn component_ids_carry_channel() {
        assert_eq!(
            game_channel("select_participants_123", SELECT_PREFIX),
            Some(ChannelId::new(123))
        );
        assert_eq!(game_channel("start_conversation_9", START_PREFIX), Some(ChannelId::new(9)));
        assert_eq!(game_channel("start_conversation_x", START_PREFIX), None);
        assert_eq!(game_channel("team_stats_254", START_PREFIX), None);
        assert_eq!(game_channel("select_participants_0", SELECT_PREFIX), None);
    }

    #[test]
    fn channel_note_only_for_other_channels() {
        let here = ChannelId::new(1);
        assert_eq!(channel_note(here, here, "in"), "");
        assert_eq!(channel_note(here, ChannelId::new(2), "in"), " in <#2>");
    }

    #[test]
    fn avatar_urls_must_be_http() {
        assert!(is_valid_avatar_url("https://i.imgur.com/a.png"));
        assert!(is_valid_avatar_url("http://host/a.jpg"));
        assert!(!is_valid_avatar_url("ftp://host/a.png"));
        assert!(!is_valid_avatar_url("a.png"));
    }

    #[test]
    fn option_description_prefers_team() {
        let mut profile = UserProfile {
            name: "Kai".into(),
            description: "Mechanical".into(),
            team: Some("1323".into()),
            role: Some("Student".into()),
            location: Some("Madera".into()),
            discord_id: "5".into(),
            discord_username: "kai".into(),
            discord_display_name: "Kai".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            webhook_url: None,
            avatar_url: None,
        };
        assert_eq!(option_description(&profile), "Student - Team 1323");
        profile.team = None;
        assert_eq!(option_description(&profile), "Student - Madera");
        profile.role = None;
        profile.location = None;
        assert_eq!(option_description(&profile), "Participant - Not specified");
    }
}
