use crate::commands::{ai, labgame, research};
use crate::{relay, Data, Error};
use poise::serenity_prelude::{
    self as serenity, ActivityData, ComponentInteraction, CreateInteractionResponse,
    CreateInteractionResponseMessage, EditInteractionResponse, Interaction, Message, OnlineStatus,
};
use tracing::{error, info, warn};

const COMPONENT_FAILED: &str = "❌ An error occurred while processing your request.";

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!(
                "✅ {} is online in {} guilds",
                data_about_bot.user.name,
                data_about_bot.guilds.len()
            );
            ctx.set_presence(
                Some(ActivityData::watching(&data.config.activity)),
                OnlineStatus::Online,
            );
        }
        serenity::FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } => {
            if let Err(e) = route_component(ctx, component, data).await {
                error!("Error handling component {}: {}", component.data.custom_id, e);
                report_component_failure(ctx, component).await;
            }
        }
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = on_message(ctx, new_message, data).await {
                error!("Error handling message {}: {}", new_message.id, e);
            }
        }
        _ => {}
    }
    Ok(())
}

async fn route_component(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let id = component.data.custom_id.as_str();
    if let Some((kind, team)) = research::parse_team_button(id) {
        research::handle_button(ctx, component, data, kind, team).await
    } else if let Some(channel) = labgame::game_channel(id, labgame::SELECT_PREFIX) {
        labgame::handle_selection(ctx, component, data, channel).await
    } else if let Some(channel) = labgame::game_channel(id, labgame::START_PREFIX) {
        labgame::handle_start(ctx, component, data, channel).await
    } else {
        warn!("Unhandled component {}", id);
        Ok(())
    }
}

async fn report_component_failure(ctx: &serenity::Context, component: &ComponentInteraction) {
    let reply = CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new()
            .content(COMPONENT_FAILED)
            .ephemeral(true),
    );
    if component.create_response(&ctx.http, reply).await.is_ok() {
        return;
    }
    // Already acknowledged; replace the deferred or initial response instead.
    if let Err(e) = component
        .edit_response(&ctx.http, EditInteractionResponse::new().content(COMPONENT_FAILED))
        .await
    {
        warn!("Could not report component failure: {}", e);
    }
}

async fn on_message(ctx: &serenity::Context, message: &Message, data: &Data) -> Result<(), Error> {
    if message.author.bot {
        return Ok(());
    }

    if labgame::capture_avatar(ctx, message, data).await? {
        return Ok(());
    }

    let bot = ctx.cache.current_user().id;
    if message.mentions.iter().any(|u| u.id == bot) {
        return ai::handle_mention(ctx, message, data).await;
    }

    let rule = data.forwarding.read().get(&message.channel_id).cloned();
    if let Some(rule) = rule {
        relay::forward(&ctx.http, &rule, message).await?;
    }
    Ok(())
}
