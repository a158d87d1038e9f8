use crate::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude::{self as serenity, Color, CreateEmbed, CreateEmbedFooter};
use poise::CreateReply;
use rand::seq::SliceRandom;

/// Milliseconds since the Unix epoch encoded in a Discord snowflake.
pub fn snowflake_millis(id: u64) -> i64 {
    const DISCORD_EPOCH: i64 = 1_420_070_400_000;
    (id >> 22) as i64 + DISCORD_EPOCH
}

fn display_name(user: &serenity::User) -> &str {
    user.global_name.as_deref().unwrap_or(&user.name)
}

/// Show every command area
#[poise::command(slash_command, category = "Utility")]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = CreateEmbed::default()
        .title("🤖 Latesh Analysis Bot - Help")
        .description("A powerful Discord bot for webhook management, FRC match analysis, and AI-powered assistance!")
        .field(
            "🔗 Webhook Commands",
            "`/webhook-send` - Send a message through webhook\n`/webhook-embed` - Send an embed through webhook\n`/webhook-create` - Create a new webhook\n`/webhook-list` - List server webhooks",
            false,
        )
        .field("📡 Forwarding Commands", "`/forward-setup` - Setup message forwarding", false)
        .field(
            "🤖 AI Commands",
            "`/ask` - Ask the AI a question\n`/ai-character` - View or customize AI personality\n`@Latesh-Analysis <question>` - Mention the bot with a question\n**Example:** `@Latesh-Analysis What is FRC?`",
            false,
        )
        .field(
            "🏆 FRC Commands",
            "`/research` - Research a team via The Blue Alliance\n`/frc-match` - Match details and predictions\n`/frc-events` - Events happening now",
            false,
        )
        .field(
            "📅 Event Commands",
            "`/event create` - Schedule a server event\n`/event list` - Upcoming events\n`/event templates` - Event type ideas",
            false,
        )
        .field(
            "👤 Profile Commands",
            "`/remember me` - Save your profile\n`/remember view` - View a profile\n`/remember list` - All saved profiles\n`/remember delete` - Delete your profile",
            false,
        )
        .field(
            "🧪 Lab Game",
            "`/latesh start` - Simulate a conversation between profiled members\n`/latesh status` - Game status and controls",
            false,
        )
        .field(
            "⚙️ Utility Commands",
            "`/ping` - Check bot latency\n`/hi` - Say hello\n`/joke` - Hear a joke\n`/userinfo` - User details\n`/extensions` - Command registry\n`/help` - Show this help message",
            false,
        )
        .footer(CreateEmbedFooter::new(
            "Made with ❤️ by Laney Williams and Ritesh Raj Arul Selvan • Powered by Gemini AI",
        ))
        .color(Color::from_rgb(0, 153, 255))
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Check bot latency
#[poise::command(slash_command, category = "Utility")]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let bot_latency = Utc::now().timestamp_millis() - snowflake_millis(ctx.id());
    let gateway = ctx.ping().await;

    let embed = CreateEmbed::default()
        .title("🏓 Pong!")
        .field("Bot Latency", format!("{bot_latency}ms"), true)
        .field("API Latency", format!("{}ms", gateway.as_millis()), true)
        .color(Color::from_rgb(0, 255, 0))
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// A friendly greeting command
#[poise::command(slash_command, category = "General", user_cooldown = 3)]
pub async fn hi(
    ctx: Context<'_>,
    #[description = "Optional message to include with the greeting"] message: Option<String>,
) -> Result<(), Error> {
    let author = ctx.author();
    let name = display_name(author);
    let text = match message {
        Some(message) => format!("Hi {name}! {message}"),
        None => format!("Hi {name}! How are you doing today?"),
    };

    let embed = CreateEmbed::default()
        .title("👋 Hello there!")
        .description(text)
        .thumbnail(author.face())
        .footer(CreateEmbedFooter::new("Extension System Test"))
        .color(Color::from_rgb(0, 255, 0))
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, poise::ChoiceParameter)]
pub enum JokeKind {
    Programming,
    #[name = "Dad Joke"]
    Dad,
    #[default]
    Random,
}

impl JokeKind {
    fn label(self) -> &'static str {
        match self {
            JokeKind::Programming => "Programming",
            JokeKind::Dad => "Dad",
            JokeKind::Random => "Random",
        }
    }

    pub fn jokes(self) -> &'static [&'static str] {
        match self {
            JokeKind::Programming => &[
                "Why do programmers prefer dark mode? Because light attracts bugs! 🐛",
                "How many programmers does it take to change a light bulb? None, that's a hardware problem! 💡",
                "Why do Java developers wear glasses? Because they can't C# 👓",
                "A SQL query goes into a bar, walks up to two tables and asks... 'Can I join you?' 🍺",
            ],
            JokeKind::Dad => &[
                "I'm reading a book about anti-gravity. It's impossible to put down! 📚",
                "Why don't scientists trust atoms? Because they make up everything! ⚛️",
                "Did you hear about the mathematician who's afraid of negative numbers? He'll stop at nothing to avoid them! ➖",
                "Why did the scarecrow win an award? He was outstanding in his field! 🌾",
            ],
            JokeKind::Random => &[
                "Why do programmers prefer dark mode? Because light attracts bugs! 🐛",
                "I'm reading a book about anti-gravity. It's impossible to put down! 📚",
                "Why don't scientists trust atoms? Because they make up everything! ⚛️",
                "How many programmers does it take to change a light bulb? None, that's a hardware problem! 💡",
            ],
        }
    }
}

/// Get a random programming joke
#[poise::command(slash_command, category = "Fun", user_cooldown = 5)]
pub async fn joke(
    ctx: Context<'_>,
    #[rename = "type"]
    #[description = "Type of joke"]
    kind: Option<JokeKind>,
) -> Result<(), Error> {
    let kind = kind.unwrap_or_default();
    let joke = kind
        .jokes()
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default();

    let embed = CreateEmbed::default()
        .title("😄 Here's a joke for you!")
        .description(joke)
        .field("Type", kind.label(), true)
        .field("Requested by", display_name(ctx.author()), true)
        .footer(CreateEmbedFooter::new("Hope that made you smile! 😊"))
        .color(Color::from_rgb(255, 170, 0))
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Get information about a user
#[poise::command(slash_command, category = "Utility", user_cooldown = 3)]
pub async fn userinfo(
    ctx: Context<'_>,
    #[description = "The user to get info about"] target: Option<serenity::User>,
) -> Result<(), Error> {
    let target = target.unwrap_or_else(|| ctx.author().clone());
    let member = match ctx.guild_id() {
        Some(guild) => guild.member(ctx.serenity_context(), target.id).await.ok(),
        None => None,
    };

    let discriminator = target
        .discriminator
        .map(|d| format!("#{:04}", d.get()))
        .unwrap_or_else(|| "None".to_string());
    let mut embed = CreateEmbed::default()
        .title(format!("👤 User Information: {}", target.name))
        .thumbnail(target.face())
        .field("Username", &target.name, true)
        .field("Discriminator", discriminator, true)
        .field("ID", target.id.to_string(), true)
        .field(
            "Account Created",
            format!("<t:{}:F>", target.id.created_at().unix_timestamp()),
            false,
        )
        .field("Bot Account", if target.bot { "Yes" } else { "No" }, true)
        .color(Color::from_rgb(0, 153, 255))
        .timestamp(Utc::now());

    if let Some(member) = member {
        let joined = member
            .joined_at
            .map(|t| format!("<t:{}:F>", t.unix_timestamp()))
            .unwrap_or_else(|| "Unknown".to_string());
        let roles = member
            .roles
            .iter()
            .map(|r| format!("<@&{r}>"))
            .collect::<Vec<_>>()
            .join(" ");
        embed = embed
            .field("Joined Server", joined, false)
            .field("Nickname", member.nick.as_deref().unwrap_or("None"), true)
            .field("Roles", if roles.is_empty() { "None".to_string() } else { roles }, false);
    }

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_decodes_timestamp() {
        // Example id from Discord's documentation, created 2016-04-30 11:18:25.796 UTC.
        assert_eq!(snowflake_millis(175928847299117063), 1462015105796);
    }

    #[test]
    fn every_kind_has_jokes() {
        for kind in [JokeKind::Programming, JokeKind::Dad, JokeKind::Random] {
            assert_eq!(kind.jokes().len(), 4);
        }
        assert_eq!(JokeKind::default(), JokeKind::Random);
    }
}
