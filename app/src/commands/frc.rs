use crate::tba::{self, Match, Prediction};
use crate::{Context, Error};
use chrono::{Local, Utc};
use poise::serenity_prelude::{Color, CreateEmbed, CreateEmbedFooter};
use poise::CreateReply;

const FRC_ORANGE: Color = Color::new(0xff6b35);

fn match_embed(m: &Match, prediction: Option<&Prediction>) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(format!("🤖 FRC Match: {}", m.match_number))
        .field("🔴 Red Alliance", m.alliances.red.display_teams(), true)
        .field("🔵 Blue Alliance", m.alliances.blue.display_teams(), true)
        .field("📊 Status", m.level_label(), true)
        .footer(CreateEmbedFooter::new("Data from The Blue Alliance"))
        .color(FRC_ORANGE)
        .timestamp(Utc::now());

    if m.is_played() {
        embed = embed.field(
            "🏆 Final Score",
            format!(
                "Red: {} | Blue: {}",
                m.alliances.red.score_or_zero(),
                m.alliances.blue.score_or_zero()
            ),
            false,
        );
    }

    if let Some(p) = prediction {
        embed = embed.field(
            "🔮 Prediction",
            format!(
                "**Winner:** {}\n**Confidence:** {:.1}%\n**Experience Score:** Red {} | Blue {}\n**Analysis:** {}\n*{}*",
                p.winner.as_str(),
                p.confidence * 100.0,
                p.red_score,
                p.blue_score,
                Prediction::ANALYSIS,
                Prediction::DISCLAIMER
            ),
            false,
        );
    }
    embed
}

/// Get FRC match predictions
#[poise::command(slash_command, rename = "frc-match", category = "FRC")]
pub async fn frc_match(
    ctx: Context<'_>,
    #[description = "Event key (e.g., 2024casd)"] event: String,
    #[rename = "match-number"]
    #[description = "Match number"]
    #[min = 1]
    match_number: Option<u32>,
) -> Result<(), Error> {
    ctx.defer().await?;
    let event = event.trim().to_lowercase();
    if !tba::is_event_key(&event) {
        ctx.say(format!("❌ `{event}` is not a valid event key. Use the form `2024casd`."))
            .await?;
        return Ok(());
    }
    let tba = &ctx.data().tba;

    if let Some(number) = match_number {
        let key = tba::qualification_key(&event, number);
        let Some(m) = tba.match_detail(&key).await? else {
            ctx.say(format!("❌ Match `{key}` not found in The Blue Alliance database."))
                .await?;
            return Ok(());
        };
        let prediction = tba.predict_match(&m).await;
        ctx.send(CreateReply::default().embed(match_embed(&m, Some(&prediction))))
            .await?;
        return Ok(());
    }

    let Some(info) = tba.event(&event).await? else {
        ctx.say(format!("❌ Event `{event}` not found in The Blue Alliance database."))
            .await?;
        return Ok(());
    };
    let matches = tba.event_matches(&event).await?;
    let played = matches.iter().filter(|m| m.is_played()).count();

    let embed = CreateEmbed::default()
        .title(format!("🤖 FRC Event: {}", info.name))
        .description(format!("Event key `{}`", info.key))
        .field("📍 Location", info.location(), true)
        .field("📅 Dates", info.dates(), true)
        .field(
            "🏷️ Type",
            info.event_type_string.as_deref().unwrap_or("Unknown"),
            true,
        )
        .field("🎮 Matches", format!("{played} played of {}", matches.len()), false)
        .footer(CreateEmbedFooter::new(
            "Add match-number for a single match prediction • Data from The Blue Alliance",
        ))
        .color(FRC_ORANGE)
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List FRC events happening today
#[poise::command(slash_command, rename = "frc-events", category = "FRC")]
pub async fn frc_events(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let today = Local::now().date_naive();
    let events = ctx.data().tba.current_events(today).await?;

    if events.is_empty() {
        ctx.say("📅 No FRC events are in progress right now.").await?;
        return Ok(());
    }

    let fields = events.iter().take(25).map(|e| {
        (
            e.name.clone(),
            format!("**Key:** `{}`\n**Location:** {}\n**Date:** {}", e.key, e.location(), e.dates()),
            true,
        )
    });
    let embed = CreateEmbed::default()
        .title("🏁 Current FRC Events")
        .description(format!("{} event(s) in progress", events.len()))
        .fields(fields)
        .footer(CreateEmbedFooter::new("Use /frc-match <event> for details"))
        .color(FRC_ORANGE)
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
