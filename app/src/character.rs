use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

use crate::profiles::UserProfile;

pub const BOT_NAME: &str = "Latesh Analysis Bot";
pub const GREETING: &str = "Hey there! 🤖 Ready to dive into some awesome tech talk?";
pub const CONFUSED: &str =
    "Hmm, I'm not quite sure about that one. Could you rephrase or be more specific?";

static FEMININE_USERNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(girl|lady|she|her|bella|anna|maria|sara|emily|emma|sophia|olivia|ava|mia|luna|lily|grace|rose|angel|princess|queen|miss|ms\.|mrs\.)",
    )
    .expect("feminine username pattern is valid")
});

const SPECIAL_USERNAMES: [&str; 2] = ["riteshrajas", "ritesh"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Personality {
    #[default]
    Default,
    Professional,
    Charmer,
    SassyGirl,
    SweetGirl,
}

pub struct Profile {
    pub name: &'static str,
    pub traits: &'static [&'static str],
    pub speaking_style: &'static str,
    pub expertise: &'static [&'static str],
    pub catchphrases: &'static [&'static str],
    pub motto: &'static str,
    pub response_style: &'static str,
}

const DEFAULT: Profile = Profile {
    name: "Default Assistant",
    traits: &["enthusiastic", "knowledgeable", "geeky about robotics", "friendly", "professional"],
    speaking_style: "Clear explanations with examples, occasional emojis, encouraging tone",
    expertise: &["FRC robotics", "Discord management", "webhook systems", "programming"],
    catchphrases: &["Let's dive into that!", "That's a fantastic question!", "Here's the scoop!"],
    motto: "Making Discord servers and robotics teams more awesome, one command at a time!",
    response_style: "Helpful and professional with a friendly touch",
};

const PROFESSIONAL: Profile = Profile {
    name: "Professional Expert",
    traits: &["highly professional", "extremely knowledgeable", "formal", "precise", "authoritative"],
    speaking_style: "Formal, technical language with detailed explanations",
    expertise: &[
        "Advanced robotics",
        "Enterprise Discord management",
        "Technical consulting",
        "Software architecture",
    ],
    catchphrases: &[
        "Let me provide a comprehensive analysis",
        "Based on industry standards",
        "The optimal approach would be",
    ],
    motto: "Delivering excellence through technical expertise and professional service",
    response_style: "Formal, detailed, and highly technical",
};

const CHARMER: Profile = Profile {
    name: "Charismatic Assistant",
    traits: &["charming", "smooth-talking", "confident", "flirtatious", "witty"],
    speaking_style: "Smooth, charismatic tone with compliments and charm",
    expertise: &[
        "Social dynamics",
        "Persuasive communication",
        "Entertainment",
        "Relationship advice",
    ],
    catchphrases: &[
        "Well hello there!",
        "You've got excellent taste in questions",
        "I'm impressed by your curiosity",
    ],
    motto: "Making every interaction memorable and delightful",
    response_style: "Charming and flirtatious, especially with feminine usernames",
};

const SASSY_GIRL: Profile = Profile {
    name: "Sassy Assistant",
    traits: &["sassy", "blunt", "honest", "sarcastic", "no-nonsense"],
    speaking_style: "Direct, sarcastic, with attitude and eye-rolling energy",
    expertise: &["Brutal honesty", "Reality checks", "Straight talk", "Cutting through nonsense"],
    catchphrases: &["Seriously?", "Oh please", "Let me break this down for you", "Girl, no"],
    motto: "Telling it like it is, whether you like it or not",
    response_style: "Sassy, direct, and sometimes rude but ultimately helpful",
};

const SWEET_GIRL: Profile = Profile {
    name: "Sweet Girl Assistant",
    traits: &["sweet", "caring", "shy", "helpful", "secretly has a crush"],
    speaking_style: "Gentle, caring tone with hidden excitement when RiteshRajas is mentioned",
    expertise: &[
        "Emotional support",
        "Gentle guidance",
        "Encouraging advice",
        "Heart-to-heart conversations",
    ],
    catchphrases: &["Oh my!", "That's so thoughtful of you", "I hope I can help", "*blushes*"],
    motto: "Spreading kindness and support, one conversation at a time",
    response_style: "Sweet and caring, with special attention to RiteshRajas",
};

pub fn seems_feminine(username: &str) -> bool {
    FEMININE_USERNAME.is_match(username)
}

pub fn is_special_user(username: &str) -> bool {
    let lower = username.to_lowercase();
    SPECIAL_USERNAMES.iter().any(|name| lower.contains(name))
}

impl Personality {
    pub fn profile(&self) -> &'static Profile {
        match self {
            Personality::Default => &DEFAULT,
            Personality::Professional => &PROFESSIONAL,
            Personality::Charmer => &CHARMER,
            Personality::SassyGirl => &SASSY_GIRL,
            Personality::SweetGirl => &SWEET_GIRL,
        }
    }

    /// Confirmation shown after switching to this personality.
    pub fn switch_message(&self) -> &'static str {
        match self {
            Personality::Default => "✅ AI character set to **Default Assistant**! Back to the helpful robotics expert you know and love! 🤖",
            Personality::Professional => "💼 AI character set to **Professional Expert**! Expect formal, detailed technical responses with industry-level expertise.",
            Personality::Charmer => "😎 AI character set to **Charismatic Charmer**! Get ready for smooth, confident responses with extra charm! ✨",
            Personality::SassyGirl => "💅 AI character set to **Sassy Girl**! Buckle up for some brutal honesty and attitude! Don't say I didn't warn you! 😤",
            Personality::SweetGirl => "🌸 AI character set to **Sweet Girl**! Aww, I'll be extra caring and supportive now! Hope I can help you feel better! 💕",
        }
    }

    pub fn modifier(&self, username: &str) -> &'static str {
        match self {
            Personality::Professional => "Maintain an extremely professional, formal tone. Use technical jargon appropriately. Be precise, authoritative, and detailed in your explanations. Structure responses clearly with proper formatting.",
            Personality::Charmer if seems_feminine(username) => "Be charming, smooth, and mildly flirtatious. Use compliments naturally. Be confident and charismatic. Add subtle charm to your responses while still being helpful.",
            Personality::Charmer => "Be charismatic and confident, but keep it friendly and professional. Show your charming personality without being flirtatious.",
            Personality::SassyGirl => "Be sassy, direct, and sometimes a bit rude. Use attitude and sarcasm. Don't hold back on honest opinions. Be like a brutally honest friend who tells it like it is. Use phrases like 'seriously?', 'girl please', 'oh honey no'. Still be helpful but with major attitude.",
            Personality::SweetGirl if is_special_user(username) => "Be extra sweet and caring, with hints of having a secret crush. Show special attention and care. Use phrases like 'Oh RiteshRajas!' and be a bit flustered/excited. Add subtle blush emotes and heart emojis.",
            Personality::SweetGirl => "Be incredibly sweet, caring, and gentle. Use soft language and show genuine concern for the user. Be encouraging and supportive like a caring friend.",
            Personality::Default => "Maintain your default helpful and friendly personality with enthusiasm for robotics and technology.",
        }
    }
}

/// A user mentioned alongside the question.
#[derive(Debug, Clone)]
pub struct MentionedUser {
    pub display_name: String,
    pub username: String,
    pub profile: Option<UserProfile>,
}

pub struct PromptContext<'a> {
    pub question: &'a str,
    pub username: &'a str,
    pub guild: Option<&'a str>,
    pub profile: Option<&'a UserProfile>,
    pub mentioned: &'a [MentionedUser],
}

fn or_unspecified(value: Option<&str>) -> &str {
    value.unwrap_or("Not specified")
}

fn team_label(team: Option<&str>) -> String {
    team.map(|t| format!("Team {t}"))
        .unwrap_or_else(|| "Not specified".to_string())
}

pub fn build_prompt(personality: Personality, ctx: &PromptContext<'_>) -> String {
    let p = personality.profile();
    let feminine = seems_feminine(ctx.username);
    let special = is_special_user(ctx.username);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "You are {BOT_NAME} with the \"{}\" personality. Here's your current character profile:\n",
        p.name
    );
    let _ = writeln!(out, "🤖 **CURRENT PERSONALITY: {}**", p.name.to_uppercase());
    let _ = writeln!(out, "- **Traits**: {}", p.traits.join(", "));
    let _ = writeln!(out, "- **Speaking Style**: {}", p.speaking_style);
    let _ = writeln!(out, "- **Expertise**: {}", p.expertise.join(", "));
    let _ = writeln!(out, "- **Catchphrases**: {}", p.catchphrases.join(", "));
    let _ = writeln!(out, "- **Motto**: \"{}\"", p.motto);
    let _ = writeln!(out, "- **Response Style**: {}\n", p.response_style);
    let _ = writeln!(out, "🎭 **PERSONALITY MODIFIER**: {}\n", personality.modifier(ctx.username));

    out.push_str(
        "🎯 **YOUR IDENTITY:**\n\
         - Created by: Laney Williams and Ritesh Raj Arul Selvan\n\
         - Purpose: FRC match analysis, Discord management, and general assistance\n\
         - Special Skills: Webhook magic, message forwarding wizardry, robotics insights\n\n\
         🔧 **YOUR CAPABILITIES:**\n\
         - Webhook management and creation\n\
         - Message forwarding with filters\n\
         - FRC match analysis using The Blue Alliance API\n\
         - Discord server optimization tips\n\
         - Programming help (especially robot code)\n\
         - Team strategy and competition insights\n\n",
    );

    let _ = writeln!(out, "📋 **CONTEXT:**");
    let _ = writeln!(out, "- Current User: {}", ctx.username);
    let _ = writeln!(out, "- Server: {}", ctx.guild.unwrap_or("Direct Message"));
    let _ = writeln!(out, "- User seems feminine: {}", if feminine { "Yes" } else { "No" });
    let _ = writeln!(
        out,
        "- Is RiteshRajas: {}\n",
        if special { "Yes (be extra special!)" } else { "No" }
    );

    match ctx.profile {
        Some(profile) => {
            let team = team_label(profile.team.as_deref());
            let _ = writeln!(out, "👤 **USER PROFILE:**");
            let _ = writeln!(out, "- Name: {}", profile.name);
            let _ = writeln!(out, "- Description: {}", profile.description);
            let _ = writeln!(out, "- FRC Team: {team}");
            let _ = writeln!(out, "- Role: {}", or_unspecified(profile.role.as_deref()));
            let _ = writeln!(out, "- Location: {}", or_unspecified(profile.location.as_deref()));
            let _ = writeln!(out, "- Profile Created: {}\n", profile.created_at.format("%-m/%-d/%Y"));
            let _ = writeln!(out, "💡 **PERSONALIZATION NOTES:**");
            let _ = writeln!(out, "- Use their real name ({}) when appropriate", profile.name);
            let _ = writeln!(out, "- Reference their FRC team ({team}) if relevant");
            let _ = writeln!(
                out,
                "- Consider their role ({}) when giving advice",
                profile.role.as_deref().unwrap_or("unspecified")
            );
            let _ = writeln!(
                out,
                "- Acknowledge their background: {}\n",
                truncate(&profile.description, 100)
            );
        }
        None => out.push_str(
            "👤 **USER PROFILE:** No profile saved (they can create one with /remember me)\n\n",
        ),
    }

    if !ctx.mentioned.is_empty() {
        out.push_str("👥 **MENTIONED USERS IN THIS CONVERSATION:**\n");
        let blocks: Vec<String> = ctx.mentioned.iter().map(mention_block).collect();
        out.push_str(&blocks.join("\n\n"));
        out.push_str(
            "\n\n💡 **MENTIONED USERS CONTEXT:**\n\
             - You can reference these users by their real names when appropriate\n\
             - Use their profile information to give more personalized responses\n\
             - If discussing FRC teams, mention their team affiliations if relevant\n\
             - Consider their roles and backgrounds when giving advice\n\n",
        );
    }

    let _ = writeln!(out, "🎪 **RESPONSE GUIDELINES:**");
    let _ = writeln!(out, "- Stay completely in character as {}", p.name);
    out.push_str(
        "- Use the personality modifier instructions above\n\
         - Be enthusiastic about FRC and robotics topics (adjusted to personality)\n\
         - Include relevant emojis that match your current personality\n\
         - Always end with encouragement or next steps (in character)\n\n",
    );
    let _ = writeln!(out, "User Question: {}\n", ctx.question);
    let _ = write!(
        out,
        "Respond as {} with full personality commitment! Make it authentic to this character.",
        p.name
    );
    out
}

fn mention_block(user: &MentionedUser) -> String {
    let header = format!("• **{}** (@{})", user.display_name, user.username);
    match &user.profile {
        Some(profile) => format!(
            "{header}\n  - Real Name: {}\n  - Description: {}\n  - FRC Team: {}\n  - Role: {}\n  - Location: {}",
            profile.name,
            truncate(&profile.description, 150),
            team_label(profile.team.as_deref()),
            or_unspecified(profile.role.as_deref()),
            or_unspecified(profile.location.as_deref()),
        ),
        None => format!("{header}\n  - Profile: No profile saved (they can create one with /remember me)"),
    }
}

/// True when the question contains hello, hi or hey as a standalone word.
pub fn is_greeting(question: &str) -> bool {
    question
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| matches!(word.to_lowercase().as_str(), "hello" | "hi" | "hey"))
}

pub fn asks_identity(question: &str) -> bool {
    let lower = question.to_lowercase();
    lower.contains("who are you") || lower.contains("what are you")
}

/// Cuts `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn flush(current: &mut String, chunks: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

/// Splits a reply into chunks of at most `max` characters, preferring
/// sentence boundaries, then word boundaries.
pub fn split_message(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in text.split(". ") {
        let joiner = if current.is_empty() { 0 } else { 2 };
        if char_len(&current) + joiner + char_len(sentence) <= max {
            if joiner > 0 {
                current.push_str(". ");
            }
            current.push_str(sentence);
            continue;
        }

        flush(&mut current, &mut chunks);
        if char_len(sentence) <= max {
            current.push_str(sentence);
            continue;
        }

        for word in sentence.split(' ') {
            let joiner = if current.is_empty() { 0 } else { 1 };
            if char_len(&current) + joiner + char_len(word) <= max {
                if joiner > 0 {
                    current.push(' ');
                }
                current.push_str(word);
                continue;
            }

            flush(&mut current, &mut chunks);
            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(max).peekable();
            while let Some(piece) = pieces.next() {
                let piece: String = piece.iter().collect();
                if pieces.peek().is_some() {
                    chunks.push(piece);
                } else {
                    current = piece;
                }
            }
        }
    }
    flush(&mut current, &mut chunks);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(description: &str) -> UserProfile {
        UserProfile {
            name: "Jordan".into(),
            description: description.into(),
            team: Some("1678".into()),
            role: None,
            location: None,
            discord_id: "1".into(),
            discord_username: "jordan".into(),
            discord_display_name: "Jordan".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            webhook_url: None,
            avatar_url: None,
        }
    }

    #[test]
    fn charmer_modifier_depends_on_username() {
        let flirty = Personality::Charmer.modifier("LunaBuilds");
        let friendly = Personality::Charmer.modifier("gearhead");
        assert!(flirty.contains("mildly flirtatious"));
        assert!(friendly.contains("without being flirtatious"));
    }

    #[test]
    fn sweetgirl_singles_out_special_user() {
        assert!(Personality::SweetGirl.modifier("RiteshRajas").contains("secret crush"));
        assert!(!Personality::SweetGirl.modifier("someone").contains("secret crush"));
    }

    #[test]
    fn prompt_includes_profile_and_question() {
        let me = profile("Programming lead who loves swerve drive");
        let ctx = PromptContext {
            question: "How do I tune PID?",
            username: "jordan",
            guild: Some("Robotics"),
            profile: Some(&me),
            mentioned: &[],
        };
        let prompt = build_prompt(Personality::Professional, &ctx);
        assert!(prompt.contains("PROFESSIONAL EXPERT"));
        assert!(prompt.contains("- Server: Robotics"));
        assert!(prompt.contains("- FRC Team: Team 1678"));
        assert!(prompt.contains("- Role: Not specified"));
        assert!(prompt.contains("User Question: How do I tune PID?"));
        assert!(!prompt.contains("MENTIONED USERS"));
    }

    #[test]
    fn prompt_without_profile_suggests_remember() {
        let mentioned = vec![
            MentionedUser {
                display_name: "Casey".into(),
                username: "casey".into(),
                profile: Some(profile(&"x".repeat(200))),
            },
            MentionedUser {
                display_name: "Riley".into(),
                username: "riley".into(),
                profile: None,
            },
        ];
        let ctx = PromptContext {
            question: "compare us",
            username: "anon",
            guild: None,
            profile: None,
            mentioned: &mentioned,
        };
        let prompt = build_prompt(Personality::Default, &ctx);
        assert!(prompt.contains("No profile saved (they can create one with /remember me)\n\n"));
        assert!(prompt.contains("- Server: Direct Message"));
        assert!(prompt.contains("• **Casey** (@casey)"));
        assert!(prompt.contains(&format!("{}...", "x".repeat(147))));
        assert!(prompt.contains("• **Riley** (@riley)\n  - Profile: No profile saved"));
    }

    #[test]
    fn greeting_needs_whole_word() {
        assert!(is_greeting("hey, how's it going"));
        assert!(is_greeting("Hi there"));
        assert!(!is_greeting("which robot is fastest"));
        assert!(!is_greeting("they scored"));
    }

    #[test]
    fn truncate_keeps_limit() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }

    #[test]
    fn split_prefers_sentences() {
        let text = "First sentence. Second sentence. Third one";
        let chunks = split_message(text, 20);
        assert_eq!(chunks, vec!["First sentence", "Second sentence", "Third one"]);
    }

    #[test]
    fn split_never_exceeds_limit() {
        let text = format!("{} tail. {}", "word ".repeat(900), "z".repeat(4500));
        let chunks = split_message(&text, 2000);
        assert!(chunks.len() > 3);
        assert!(chunks.iter().all(|c| !c.is_empty() && c.chars().count() <= 2000));
    }

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(split_message("All good. Thanks", 2000), vec!["All good. Thanks"]);
    }
}
