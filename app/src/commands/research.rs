use crate::tba::Team;
use crate::{Context, Data, Error};
use chrono::{Datelike, Local, Utc};
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, Color, ComponentInteraction, CreateActionRow, CreateButton, CreateEmbed,
    CreateEmbedFooter, EditInteractionResponse,
};
use poise::CreateReply;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamButton {
    Matches,
    Awards,
    Events,
    Stats,
}

impl TeamButton {
    fn label(&self) -> &'static str {
        match self {
            TeamButton::Matches => "matches",
            TeamButton::Awards => "awards",
            TeamButton::Events => "events",
            TeamButton::Stats => "stats",
        }
    }

    fn custom_id(&self, team: u32) -> String {
        format!("team_{}_{team}", self.label())
    }
}

pub fn parse_team_button(custom_id: &str) -> Option<(TeamButton, u32)> {
    let mut parts = custom_id.split('_');
    if parts.next()? != "team" {
        return None;
    }
    let kind = match parts.next()? {
        "matches" => TeamButton::Matches,
        "awards" => TeamButton::Awards,
        "events" => TeamButton::Events,
        "stats" => TeamButton::Stats,
        _ => return None,
    };
    let team = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((kind, team))
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Unknown")
}

/// Research an FRC team using The Blue Alliance API
#[poise::command(slash_command, category = "FRC", user_cooldown = 10)]
pub async fn research(
    ctx: Context<'_>,
    #[description = "FRC team number (e.g., 254)"]
    #[min = 1]
    #[max = 9999]
    team: u32,
) -> Result<(), Error> {
    ctx.defer().await?;

    let info = match ctx.data().tba.team(team).await {
        Ok(Some(info)) => info,
        Ok(None) => {
            ctx.say(format!("❌ Team {team} not found in The Blue Alliance database."))
                .await?;
            return Ok(());
        }
        Err(e) => {
            tracing::error!("Research command error: {}", e);
            ctx.say(format!("❌ Error researching team {team}: {e}")).await?;
            return Ok(());
        }
    };

    let embed = CreateEmbed::default()
        .title(format!("🤖 FRC Team {team} - {}", or_unknown(&info.nickname)))
        .description(format!(
            "**{}**\n{}",
            info.name.as_deref().unwrap_or("Team Name Unknown"),
            info.location()
        ))
        .field(
            "📅 Rookie Year",
            info.rookie_year.map(|y| y.to_string()).unwrap_or_else(|| "Unknown".into()),
            true,
        )
        .field("🌐 Website", info.website.as_deref().unwrap_or("Not provided"), true)
        .field("📊 Status", "Researching...", true)
        .footer(CreateEmbedFooter::new("Click buttons below for detailed information"))
        .color(Color::from_rgb(255, 107, 53))
        .timestamp(Utc::now());

    let buttons = CreateActionRow::Buttons(vec![
        CreateButton::new(TeamButton::Matches.custom_id(team))
            .label("📈 Recent Matches")
            .style(ButtonStyle::Primary),
        CreateButton::new(TeamButton::Awards.custom_id(team))
            .label("🏆 Awards")
            .style(ButtonStyle::Success),
        CreateButton::new(TeamButton::Events.custom_id(team))
            .label("📅 Events")
            .style(ButtonStyle::Secondary),
        CreateButton::new(TeamButton::Stats.custom_id(team))
            .label("📊 Statistics")
            .style(ButtonStyle::Danger),
    ]);

    ctx.send(
        CreateReply::default()
            .content(format!("🔍 **Researching Team {team} via The Blue Alliance API...**"))
            .embed(embed)
            .components(vec![buttons]),
    )
    .await?;

    ctx.data().team_cache.write().insert(team, info);
    Ok(())
}

async fn matches_embed(data: &Data, team: u32, year: i32) -> Result<Result<CreateEmbed, String>, Error> {
    let matches = data.tba.team_matches(team, year).await?;
    if matches.is_empty() {
        return Ok(Err(format!("❌ No recent matches found for team {team} in {year}.")));
    }

    let fields = matches.iter().map(|m| {
        (
            format!(
                "{} Match {} {}",
                m.comp_level.to_uppercase(),
                m.match_number,
                if m.won_by(team) { "🏆" } else { "❌" }
            ),
            format!(
                "**Red Alliance:** {} ({})\n**Blue Alliance:** {} ({})\n**Event:** {}",
                m.alliances.red.display_teams(),
                m.alliances.red.score_or_zero(),
                m.alliances.blue.display_teams(),
                m.alliances.blue.score_or_zero(),
                m.event_key
            ),
            false,
        )
    });
    Ok(Ok(CreateEmbed::default()
        .title(format!("📈 Recent Matches - Team {team}"))
        .description(format!("Showing {} most recent matches from {year}", matches.len()))
        .fields(fields)
        .color(Color::from_rgb(0, 255, 0))
        .timestamp(Utc::now())))
}

async fn awards_embed(data: &Data, team: u32, year: i32) -> Result<Result<CreateEmbed, String>, Error> {
    let awards = data.tba.team_awards(team, year).await?;
    if awards.is_empty() {
        return Ok(Err(format!("❌ No awards found for team {team} in {year}.")));
    }

    let fields = awards.iter().map(|a| {
        (
            a.name.clone(),
            format!("**Event:** {}\n**Year:** {}", a.event_key, a.year),
            true,
        )
    });
    Ok(Ok(CreateEmbed::default()
        .title(format!("🏆 Awards - Team {team}"))
        .description(format!("Awards won in {year}"))
        .fields(fields)
        .color(Color::from_rgb(255, 215, 0))
        .timestamp(Utc::now())))
}

async fn events_embed(data: &Data, team: u32, year: i32) -> Result<Result<CreateEmbed, String>, Error> {
    let events = data.tba.team_events(team, year).await?;
    if events.is_empty() {
        return Ok(Err(format!("❌ No events found for team {team} in {year}.")));
    }

    let fields = events.iter().map(|e| {
        (
            e.name.clone(),
            format!(
                "**Key:** {}\n**Location:** {}\n**Date:** {}",
                e.key,
                e.location(),
                e.dates()
            ),
            true,
        )
    });
    Ok(Ok(CreateEmbed::default()
        .title(format!("📅 Events - Team {team}"))
        .description(format!("Events participated in {year}"))
        .fields(fields)
        .color(Color::from_rgb(0, 153, 255))
        .timestamp(Utc::now())))
}

pub fn stats_embed(team: u32, info: &Team) -> CreateEmbed {
    CreateEmbed::default()
        .title(format!("📊 Statistics - Team {team}"))
        .description("Comprehensive team statistics and information")
        .field("🏢 Team Name", or_unknown(&info.name), false)
        .field("🏷️ Nickname", or_unknown(&info.nickname), true)
        .field(
            "📅 Rookie Year",
            info.rookie_year.map(|y| y.to_string()).unwrap_or_else(|| "Unknown".into()),
            true,
        )
        .field("🌍 Location", info.location(), false)
        .field("🌐 Website", info.website.as_deref().unwrap_or("Not provided"), true)
        .field("📧 School Name", info.school_name.as_deref().unwrap_or("Not provided"), true)
        .field("📊 Data Source", "The Blue Alliance API", true)
        .field("🔄 Last Updated", Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(), true)
        .color(Color::from_rgb(255, 107, 53))
        .timestamp(Utc::now())
}

fn cached_stats(data: &Data, team: u32) -> Result<CreateEmbed, String> {
    match data.team_cache.read().get(&team) {
        Some(info) => Ok(stats_embed(team, info)),
        None => Err(format!("❌ Team data not found. Please run /research {team} again.")),
    }
}

/// Handles the `team_*` buttons attached to `/research` replies.
pub async fn handle_button(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
    kind: TeamButton,
    team: u32,
) -> Result<(), Error> {
    component.defer_ephemeral(&ctx.http).await?;
    let year = Local::now().year();

    let outcome = match kind {
        TeamButton::Matches => matches_embed(data, team, year).await,
        TeamButton::Awards => awards_embed(data, team, year).await,
        TeamButton::Events => events_embed(data, team, year).await,
        TeamButton::Stats => Ok(cached_stats(data, team)),
    };

    let response = match outcome {
        Ok(Ok(embed)) => EditInteractionResponse::new().embed(embed),
        Ok(Err(message)) => EditInteractionResponse::new().content(message),
        Err(e) => {
            tracing::error!("Button interaction error: {}", e);
            EditInteractionResponse::new()
                .content(format!("❌ Error fetching {} data: {e}", kind.label()))
        }
    };
    component.edit_response(&ctx.http, response).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_ids_round_trip() {
        for kind in [TeamButton::Matches, TeamButton::Awards, TeamButton::Events, TeamButton::Stats] {
            assert_eq!(parse_team_button(&kind.custom_id(254)), Some((kind, 254)));
        }
    }

    #[test]
    fn foreign_ids_are_ignored() {
        assert_eq!(parse_team_button("start_conversation_1"), None);
        assert_eq!(parse_team_button("team_unknown_254"), None);
        assert_eq!(parse_team_button("team_stats_abc"), None);
        assert_eq!(parse_team_button("team_stats_1_2"), None);
    }
}
