use crate::{ApplicationContext, Context, Error};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use poise::serenity_prelude::{
    self as serenity, ActionRowComponent, ChannelId, ChannelType, Color, CreateActionRow, CreateEmbed,
    CreateEmbedFooter, CreateInputText, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateModal, CreateScheduledEvent, EditInteractionResponse, GuildId, InputTextStyle, ModalInteraction,
    ScheduledEventType, Timestamp,
};
use poise::CreateReply;
use regex::Regex;
use std::sync::atomic::Ordering;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{error, info};

const MODAL_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_DURATION_HOURS: f64 = 24.0;

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})\s+(\d{1,2}):(\d{2})$").expect("date pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum EventKind {
    #[name = "🤖 Team Meeting"]
    Meeting,
    #[name = "🏆 Competition"]
    Competition,
    #[name = "🔧 Build Session"]
    Build,
    #[name = "📚 Training/Workshop"]
    Training,
    #[name = "🎉 Social Event"]
    Social,
    #[name = "📋 Outreach"]
    Outreach,
    #[name = "⚙️ Custom Event"]
    Custom,
}

impl EventKind {
    pub fn title(self) -> &'static str {
        match self {
            EventKind::Meeting => "Team Meeting",
            EventKind::Competition => "Competition",
            EventKind::Build => "Build Session",
            EventKind::Training => "Training/Workshop",
            EventKind::Social => "Social Event",
            EventKind::Outreach => "Outreach Event",
            EventKind::Custom => "Custom Event",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            EventKind::Meeting => "🤖",
            EventKind::Competition => "🏆",
            EventKind::Build => "🔧",
            EventKind::Training => "📚",
            EventKind::Social => "🎉",
            EventKind::Outreach => "📋",
            EventKind::Custom => "⚙️",
        }
    }

    /// Example name and description shown in the modal.
    pub fn placeholders(self) -> (&'static str, &'static str) {
        match self {
            EventKind::Meeting => (
                "Weekly Team Meeting #12",
                "Review progress, plan upcoming tasks, and coordinate team activities. We'll discuss robot design updates and prepare for the next competition.",
            ),
            EventKind::Competition => (
                "FRC District Competition - San Diego",
                "Official FRC competition at San Diego Sports Arena. Arrive 2 hours early for setup. Bring all competition gear and paperwork.",
            ),
            EventKind::Build => (
                "Robot Build Session - Drivetrain",
                "Focus on assembling the robot drivetrain. Bring safety equipment. All team members welcome, mentors will provide guidance.",
            ),
            EventKind::Training => (
                "CAD Workshop - SolidWorks Basics",
                "Learn fundamentals of SolidWorks for robot design. Laptops provided, bring notebook for taking notes.",
            ),
            EventKind::Social => (
                "End of Season Pizza Party",
                "Celebrate the end of build season! Pizza, games, and team bonding. Family members welcome.",
            ),
            EventKind::Outreach => (
                "Elementary School Robot Demo",
                "Demonstrate our robot to elementary students. Inspire the next generation of engineers and scientists.",
            ),
            EventKind::Custom => ("Custom Team Event", "Describe your custom event here..."),
        }
    }
}

/// Emoji for a listed event, guessed from its name.
pub fn emoji_for_name(name: &str) -> &'static str {
    let name = name.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));
    if has(&["🤖", "meeting"]) {
        "🤖"
    } else if has(&["🏆", "competition"]) {
        "🏆"
    } else if has(&["🔧", "build"]) {
        "🔧"
    } else if has(&["📚", "training", "workshop"]) {
        "📚"
    } else if has(&["🎉", "social", "party"]) {
        "🎉"
    } else if has(&["📋", "outreach"]) {
        "📋"
    } else {
        "📅"
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StartError {
    Format,
    Past,
}

/// Parses `YYYY-MM-DD HH:MM` in local time; the result must be after `now`.
pub fn parse_start(input: &str, now: DateTime<Local>) -> Result<DateTime<Local>, StartError> {
    let caps = DATE_TIME.captures(input.trim()).ok_or(StartError::Format)?;
    let num = |i: usize| caps[i].parse::<u32>().map_err(|_| StartError::Format);
    let year = caps[1].parse::<i32>().map_err(|_| StartError::Format)?;
    let (month, day, hour, minute) = (num(2)?, num(3)?, num(4)?, num(5)?);

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .ok_or(StartError::Format)?;
    let start = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or(StartError::Format)?;
    if start <= now {
        return Err(StartError::Past);
    }
    Ok(start)
}

/// Hours in `(0, 24]`.
pub fn parse_duration(input: &str) -> Option<f64> {
    let hours: f64 = input.trim().parse().ok()?;
    (hours.is_finite() && hours > 0.0 && hours <= MAX_DURATION_HOURS).then_some(hours)
}

fn modal_value(modal: &ModalInteraction, id: &str) -> Option<String> {
    modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .find_map(|component| match component {
            ActionRowComponent::InputText(input) if input.custom_id == id => input.value.clone(),
            _ => None,
        })
        .filter(|v| !v.trim().is_empty())
}

fn text_row(style: InputTextStyle, label: &str, id: &str, placeholder: &str, max: u16, required: bool) -> CreateActionRow {
    CreateActionRow::InputText(
        CreateInputText::new(style, label, id)
            .placeholder(placeholder)
            .max_length(max)
            .required(required),
    )
}

fn event_modal(custom_id: &str, kind: EventKind) -> CreateModal {
    let (name, description) = kind.placeholders();
    CreateModal::new(custom_id, format!("Create {}", kind.title())).components(vec![
        text_row(InputTextStyle::Short, "Event Name", "event_name", name, 100, true),
        text_row(InputTextStyle::Paragraph, "Event Description", "event_description", description, 1000, true),
        text_row(
            InputTextStyle::Short,
            "Date and Time",
            "event_date",
            "YYYY-MM-DD HH:MM (24-hour format, e.g., 2025-01-15 14:30)",
            50,
            true,
        ),
        text_row(InputTextStyle::Short, "Duration (in hours)", "event_duration", "e.g., 2 or 1.5", 10, true),
        text_row(
            InputTextStyle::Short,
            "Location (optional)",
            "event_location",
            "e.g., Team Workshop, Competition Venue, Online",
            100,
            false,
        ),
    ])
}

/// Create and manage Discord events
#[poise::command(
    slash_command,
    guild_only,
    category = "Events",
    required_permissions = "MANAGE_EVENTS",
    default_member_permissions = "MANAGE_EVENTS",
    subcommands("create", "list", "templates")
)]
pub async fn event(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Create a new Discord event
#[poise::command(slash_command, guild_only, user_cooldown = 10)]
pub async fn create(
    ctx: ApplicationContext<'_>,
    #[rename = "type"]
    #[description = "Type of event"]
    kind: EventKind,
) -> Result<(), Error> {
    let custom_id = format!("event_modal_{}", ctx.interaction.id);
    ctx.interaction
        .create_response(
            ctx.serenity_context,
            CreateInteractionResponse::Modal(event_modal(&custom_id, kind)),
        )
        .await?;
    ctx.has_sent_initial_response.store(true, Ordering::SeqCst);

    let submitted = serenity::ModalInteractionCollector::new(&ctx.serenity_context.shard)
        .filter(move |m| m.data.custom_id == custom_id)
        .timeout(MODAL_TIMEOUT)
        .await;
    let Some(modal) = submitted else {
        return Ok(());
    };
    let ctx = Context::Application(ctx);
    modal.defer_ephemeral(ctx.http()).await?;

    if let Err(e) = submit_event(ctx, &modal, kind).await {
        error!("Error creating event: {}", e);
        modal
            .edit_response(
                ctx.http(),
                EditInteractionResponse::new().content(format!(
                    "❌ Failed to create event: {e}\n\nMake sure the bot has \"Manage Events\" permission."
                )),
            )
            .await?;
    }
    Ok(())
}

/// Where a new event takes place.
enum Venue {
    External(String),
    Voice(ChannelId),
}

async fn pick_venue(ctx: Context<'_>, guild_id: GuildId, location: Option<&str>) -> Result<Venue, Error> {
    if let Some(location) = location {
        return Ok(Venue::External(location.to_string()));
    }
    let mut voice: Vec<_> = guild_id
        .channels(ctx.http())
        .await?
        .into_values()
        .filter(|c| c.kind == ChannelType::Voice)
        .collect();
    voice.sort_by_key(|c| c.position);
    Ok(match voice.first() {
        Some(channel) => Venue::Voice(channel.id),
        None => Venue::External("Discord".to_string()),
    })
}

async fn submit_event(ctx: Context<'_>, modal: &ModalInteraction, kind: EventKind) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let reply = |content: &'static str| EditInteractionResponse::new().content(content);

    let name = modal_value(modal, "event_name").unwrap_or_default();
    let description = modal_value(modal, "event_description").unwrap_or_default();
    let location = modal_value(modal, "event_location");

    let start = match parse_start(&modal_value(modal, "event_date").unwrap_or_default(), Local::now()) {
        Ok(start) => start,
        Err(StartError::Format) => {
            modal
                .edit_response(
                    ctx.http(),
                    reply("❌ Invalid date format. Please use YYYY-MM-DD HH:MM (e.g., 2025-01-15 14:30)"),
                )
                .await?;
            return Ok(());
        }
        Err(StartError::Past) => {
            modal
                .edit_response(ctx.http(), reply("❌ Event date must be in the future."))
                .await?;
            return Ok(());
        }
    };
    let Some(hours) = parse_duration(&modal_value(modal, "event_duration").unwrap_or_default()) else {
        modal
            .edit_response(
                ctx.http(),
                reply("❌ Invalid duration. Please enter a number between 0.1 and 24 hours."),
            )
            .await?;
        return Ok(());
    };

    let start_utc = start.with_timezone(&Utc);
    let end_utc = start_utc + chrono::Duration::milliseconds((hours * 3_600_000.0) as i64);
    let author = ctx.author();
    let author_name = author.global_name.as_deref().unwrap_or(&author.name);

    let reason = format!("Event created by {} via Latesh Analysis Bot", author.name);
    let venue = pick_venue(ctx, guild_id, location.as_deref()).await?;
    let kind_of_event = match &venue {
        Venue::External(_) => ScheduledEventType::External,
        Venue::Voice(_) => ScheduledEventType::Voice,
    };

    let mut builder = CreateScheduledEvent::new(
        kind_of_event,
        format!("{} {name}", kind.emoji()),
        Timestamp::from_unix_timestamp(start_utc.timestamp())?,
    )
    .description(format!(
        "{description}\n\n📋 Event Type: {}\n⏱️ Duration: {hours} hour(s)\n🤖 Created by: {author_name}",
        kind.title()
    ))
    .end_time(Timestamp::from_unix_timestamp(end_utc.timestamp())?)
    .audit_log_reason(&reason);
    builder = match &venue {
        Venue::External(place) => builder.location(place),
        Venue::Voice(channel) => builder.channel_id(*channel),
    };

    let created = guild_id.create_scheduled_event(ctx.http(), builder).await?;
    info!("Scheduled event {} created in {}", created.id, guild_id);

    let start_ts = start_utc.timestamp();
    let success = CreateEmbed::default()
        .title("✅ Event Created Successfully!")
        .description(format!(
            "Your {} has been created and published.",
            kind.title().to_lowercase()
        ))
        .field("📅 Event Name", &created.name, false)
        .field("📝 Description", crate::character::truncate(&description, 203), false)
        .field("🕒 Start Time", format!("<t:{start_ts}:F>"), true)
        .field("⏱️ Duration", format!("{hours} hour(s)"), true)
        .field("📍 Location", location.as_deref().unwrap_or("Voice Channel"), true)
        .field(
            "🔗 Event Link",
            format!("[View Event](https://discord.com/events/{guild_id}/{})", created.id),
            false,
        )
        .footer(CreateEmbedFooter::new("Event will appear in the Events section of the server"))
        .color(Color::from_rgb(0, 255, 0))
        .timestamp(Utc::now());
    modal
        .edit_response(ctx.http(), EditInteractionResponse::new().embed(success))
        .await?;

    let notice = CreateEmbed::default()
        .title("📢 New Event Created!")
        .description(format!("{author_name} just created a new event: **{}**", created.name))
        .field("🕒 When", format!("<t:{start_ts}:F>"), true)
        .field("⏱️ Duration", format!("{hours} hour(s)"), true)
        .color(Color::from_rgb(0, 153, 255))
        .timestamp(Utc::now());
    modal
        .create_followup(ctx.http(), CreateInteractionResponseFollowup::new().embed(notice))
        .await?;
    Ok(())
}

/// List upcoming events
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let mut events = match guild_id.scheduled_events(ctx.http(), true).await {
        Ok(events) => events,
        Err(e) => {
            error!("Error fetching events: {}", e);
            ctx.say("❌ Error fetching events. Make sure the bot has permission to view events.")
                .await?;
            return Ok(());
        }
    };
    if events.is_empty() {
        ctx.say("📅 No upcoming events found. Use `/event create` to create one!")
            .await?;
        return Ok(());
    }
    events.sort_by_key(|e| e.start_time.unix_timestamp());

    let fields = events.iter().take(25).map(|e| {
        let start = e.start_time.unix_timestamp();
        let location = e
            .metadata
            .as_ref()
            .and_then(|m| m.location.clone())
            .unwrap_or_else(|| "Not specified".to_string());
        (
            format!("{} {}", emoji_for_name(&e.name), e.name),
            format!(
                "**When:** <t:{start}:F> (<t:{start}:R>)\n**Location:** {location}\n**Interested:** {} users",
                e.user_count.unwrap_or(0)
            ),
            false,
        )
    });
    let embed = CreateEmbed::default()
        .title("📅 Upcoming Discord Events")
        .description(format!("Found {} upcoming event(s)", events.len()))
        .fields(fields)
        .color(Color::from_rgb(0, 255, 0))
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show event templates
#[poise::command(slash_command, guild_only)]
pub async fn templates(ctx: Context<'_>) -> Result<(), Error> {
    let embed = CreateEmbed::default()
        .title("📋 Event Templates")
        .description("Quick templates for common FRC events. Use `/event create` and select a type!")
        .field("🤖 Team Meeting", "Regular team meetings, planning sessions, and status updates", true)
        .field("🏆 Competition", "FRC competitions, scrimmages, and tournaments", true)
        .field("🔧 Build Session", "Robot building, prototyping, and hands-on work sessions", true)
        .field("📚 Training/Workshop", "Skill development, technical training, and learning sessions", true)
        .field("🎉 Social Event", "Team bonding, celebrations, and social activities", true)
        .field("📋 Outreach", "Community outreach, demos, and public events", true)
        .footer(CreateEmbedFooter::new(
            "Each template provides suggested content for faster event creation",
        ))
        .color(Color::from_rgb(0, 153, 255))
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).earliest().unwrap()
    }

    #[test]
    fn start_accepts_future_local_time() {
        let start = parse_start(" 2025-01-15 9:30 ", now()).unwrap();
        assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2025-01-15 09:30");
    }

    #[test]
    fn start_rejects_bad_input() {
        assert_eq!(parse_start("2025-1-15 14:30", now()), Err(StartError::Format));
        assert_eq!(parse_start("2025-02-30 14:30", now()), Err(StartError::Format));
        assert_eq!(parse_start("2025-01-15 25:00", now()), Err(StartError::Format));
        assert_eq!(parse_start("tomorrow", now()), Err(StartError::Format));
        assert_eq!(parse_start("2025-01-09 14:30", now()), Err(StartError::Past));
    }

    #[test]
    fn duration_bounds() {
        assert_eq!(parse_duration("1.5"), Some(1.5));
        assert_eq!(parse_duration("24"), Some(24.0));
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("24.5"), None);
        assert_eq!(parse_duration("NaN"), None);
        assert_eq!(parse_duration("inf"), None);
        assert_eq!(parse_duration("two"), None);
    }

    #[test]
    fn listed_names_map_to_emoji() {
        assert_eq!(emoji_for_name("🔧 Robot Build Session"), "🔧");
        assert_eq!(emoji_for_name("CAD Workshop"), "📚");
        assert_eq!(emoji_for_name("Pizza Party"), "🎉");
        assert_eq!(emoji_for_name("Kickoff"), "📅");
    }

    #[test]
    fn kinds_carry_metadata() {
        assert_eq!(EventKind::Outreach.title(), "Outreach Event");
        assert_eq!(EventKind::Competition.emoji(), "🏆");
        assert_eq!(EventKind::Custom.placeholders().0, "Custom Team Event");
    }
}
