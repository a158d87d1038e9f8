use crate::character::{self, MentionedUser, Personality, PromptContext, BOT_NAME, CONFUSED, GREETING};
use crate::{Context, Data, Error};
use chrono::Utc;
use poise::serenity_prelude::{self as serenity, Color, CreateEmbed, CreateEmbedFooter, Mentionable, Message};
use poise::CreateReply;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{error, info};

const AI_BLUE: Color = Color::new(0x4285f4);
const NOT_CONFIGURED: &str =
    "❌ AI functionality is not configured. Please set GEMINI_API_KEY in the environment.";
const MAX_MESSAGE: usize = 2000;
const MAX_DESCRIPTION: usize = 4096;

static USER_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@!?(\d+)>").expect("mention pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum CharacterAction {
    #[name = "View Current Character"]
    View,
    #[name = "Professional Expert"]
    Professional,
    #[name = "Charismatic Charmer"]
    Charmer,
    #[name = "Sassy Girl"]
    SassyGirl,
    #[name = "Sweet Girl"]
    SweetGirl,
    #[name = "Reset to Default"]
    Default,
}

impl CharacterAction {
    fn personality(self) -> Option<Personality> {
        match self {
            CharacterAction::View => None,
            CharacterAction::Professional => Some(Personality::Professional),
            CharacterAction::Charmer => Some(Personality::Charmer),
            CharacterAction::SassyGirl => Some(Personality::SassyGirl),
            CharacterAction::SweetGirl => Some(Personality::SweetGirl),
            CharacterAction::Default => Some(Personality::Default),
        }
    }
}

/// Removes the mention of `bot` from a message, leaving the question.
pub fn strip_bot_mention(content: &str, bot: serenity::UserId) -> String {
    let bot = bot.get().to_string();
    USER_MENTION
        .replace_all(content, |caps: &regex::Captures<'_>| {
            if caps[1] == bot {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .trim()
        .to_string()
}

/// How a mention is answered before any generation happens.
#[derive(Debug, PartialEq, Eq)]
pub enum CannedReply {
    Greeting,
    GreetingWithOffer,
    Introduction,
}

pub fn canned_reply(question: &str) -> Option<CannedReply> {
    if question.is_empty() {
        Some(CannedReply::Greeting)
    } else if character::is_greeting(question) {
        Some(CannedReply::GreetingWithOffer)
    } else if character::asks_identity(question) {
        Some(CannedReply::Introduction)
    } else {
        None
    }
}

fn canned_text(reply: CannedReply, personality: Personality) -> String {
    match reply {
        CannedReply::Greeting => GREETING.to_string(),
        CannedReply::GreetingWithOffer => format!("{GREETING} What can I help you with today?"),
        CannedReply::Introduction => format!(
            "I'm {BOT_NAME}! 🤖 {} Use `/ai-character view` to learn more about my personality!",
            personality.profile().motto
        ),
    }
}

async fn answer(
    data: &Data,
    question: &str,
    username: &str,
    user: serenity::UserId,
    guild: Option<&str>,
    mentioned: &[MentionedUser],
) -> crate::error::Result<String> {
    let profile = data.profiles.read().await.get(user).cloned();
    let ctx = PromptContext {
        question,
        username,
        guild,
        profile: profile.as_ref(),
        mentioned,
    };
    let prompt = character::build_prompt(data.personality(), &ctx);
    data.generate(&prompt).await
}

/// Ask the AI a question
#[poise::command(slash_command, category = "AI")]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question for the AI"] question: String,
) -> Result<(), Error> {
    let data = ctx.data();
    if data.ai.is_none() {
        ctx.send(CreateReply::default().content(NOT_CONFIGURED).ephemeral(true))
            .await?;
        return Ok(());
    }
    ctx.defer().await?;

    let author = ctx.author();
    let guild = ctx.guild().map(|g| g.name.clone());
    match answer(data, &question, &author.name, author.id, guild.as_deref(), &[]).await {
        Ok(response) => {
            let embed = CreateEmbed::default()
                .title("🤖 AI Response")
                .description(character::truncate(&response, MAX_DESCRIPTION))
                .footer(CreateEmbedFooter::new(format!(
                    "Asked by {} • Powered by Gemini AI",
                    author.name
                )))
                .color(AI_BLUE)
                .timestamp(Utc::now());
            ctx.send(CreateReply::default().embed(embed)).await?;
            info!(
                "AI response generated for {}: {}",
                author.name,
                character::truncate(&question, 50)
            );
        }
        Err(e) => {
            error!("AI response error: {}", e);
            ctx.say("❌ Sorry, I encountered an error while generating a response. Please try again later.")
                .await?;
        }
    }
    Ok(())
}

fn bulleted(items: &[&str]) -> String {
    items.iter().map(|i| format!("• {i}")).collect::<Vec<_>>().join("\n")
}

/// View or customize the AI personality
#[poise::command(slash_command, rename = "ai-character", category = "AI", ephemeral)]
pub async fn ai_character(
    ctx: Context<'_>,
    #[description = "Choose an action"] action: CharacterAction,
) -> Result<(), Error> {
    if let Some(personality) = action.personality() {
        *ctx.data().personality.write() = personality;
        info!("AI personality switched to {:?} by {}", personality, ctx.author().name);
        ctx.say(personality.switch_message()).await?;
        return Ok(());
    }

    let p = ctx.data().personality().profile();
    let phrases = p
        .catchphrases
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join("\n");
    let embed = CreateEmbed::default()
        .title("🤖 Current AI Character")
        .description(format!("**{}**\n*{}*", p.name, p.motto))
        .field("🎭 Personality Traits", bulleted(p.traits), false)
        .field("🗣️ Speaking Style", p.speaking_style, false)
        .field("🎯 Expertise Areas", bulleted(p.expertise), false)
        .field("💬 Favorite Phrases", phrases, false)
        .field("✨ Response Style", p.response_style, false)
        .footer(CreateEmbedFooter::new("Switch personalities with /ai-character"))
        .color(AI_BLUE)
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Answers a message that mentions the bot.
pub async fn handle_mention(ctx: &serenity::Context, message: &Message, data: &Data) -> Result<(), Error> {
    if data.ai.is_none() {
        message.reply(ctx, NOT_CONFIGURED).await?;
        return Ok(());
    }

    let bot = ctx.cache.current_user().id;
    let question = strip_bot_mention(&message.content, bot);
    if let Some(reply) = canned_reply(&question) {
        message
            .reply(ctx, canned_text(reply, data.personality()))
            .await?;
        return Ok(());
    }

    let mentioned: Vec<MentionedUser> = {
        let store = data.profiles.read().await;
        message
            .mentions
            .iter()
            .filter(|u| u.id != bot)
            .map(|u| MentionedUser {
                display_name: u.global_name.clone().unwrap_or_else(|| u.name.clone()),
                username: u.name.clone(),
                profile: store.get(u.id).cloned(),
            })
            .collect()
    };

    if let Err(e) = message.channel_id.broadcast_typing(&ctx.http).await {
        tracing::warn!("Failed to show typing in {}: {}", message.channel_id, e);
    }

    let guild = message
        .guild_id
        .and_then(|id| ctx.cache.guild(id).map(|g| g.name.clone()));
    let author = &message.author;
    match answer(data, &question, &author.name, author.id, guild.as_deref(), &mentioned).await {
        Ok(response) => {
            for chunk in character::split_message(&response, MAX_MESSAGE) {
                message.reply(ctx, chunk).await?;
            }
            info!(
                "AI response generated for {}: {}",
                author.name,
                character::truncate(&question, 50)
            );
        }
        Err(e) => {
            error!("AI mention error for {}: {}", author.mention(), e);
            message
                .reply(ctx, format!("{CONFUSED} Please try again later."))
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::UserId;

    #[test]
    fn strips_both_mention_forms() {
        let bot = UserId::new(42);
        assert_eq!(strip_bot_mention("<@42> what is FRC?", bot), "what is FRC?");
        assert_eq!(strip_bot_mention("<@!42>   ", bot), "");
        assert_eq!(
            strip_bot_mention("<@42> compare <@7> and me", bot),
            "compare <@7> and me"
        );
    }

    #[test]
    fn canned_replies() {
        assert_eq!(canned_reply(""), Some(CannedReply::Greeting));
        assert_eq!(canned_reply("hey bot"), Some(CannedReply::GreetingWithOffer));
        assert_eq!(canned_reply("Who are you?"), Some(CannedReply::Introduction));
        assert_eq!(canned_reply("what is this year's game"), None);
    }

    #[test]
    fn introduction_uses_current_motto() {
        let text = canned_text(CannedReply::Introduction, Personality::SassyGirl);
        assert!(text.starts_with("I'm Latesh Analysis Bot! 🤖 Telling it like it is"));
        assert_eq!(
            canned_text(CannedReply::GreetingWithOffer, Personality::Default),
            format!("{GREETING} What can I help you with today?")
        );
    }

    #[test]
    fn view_has_no_personality() {
        assert_eq!(CharacterAction::View.personality(), None);
        assert_eq!(CharacterAction::Default.personality(), Some(Personality::Default));
    }
}
