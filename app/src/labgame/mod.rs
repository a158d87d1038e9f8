//! Lab game state: simulated conversations between profiled participants.

pub mod identity;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, UserId, Webhook};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use crate::profiles::UserProfile;

pub const HISTORY_WINDOW: usize = 8;
pub const MAX_MESSAGES: usize = 50;
pub const REMINDER_INTERVAL: usize = 12;
pub const MAX_REPLY_CHARS: usize = 150;
pub const KEEP_ON_RESTART: usize = 3;
pub const MAX_PARTICIPANTS: usize = 10;
pub const MIN_PARTICIPANTS: usize = 2;
pub const DEFAULT_SETTING: &str = "General discussion environment";
pub const MODERATOR: &str = "Moderator";

pub const START_DELAY: Duration = Duration::from_secs(2);
pub const RESUME_DELAY: Duration = Duration::from_secs(3);
pub const RESTART_DELAY: Duration = Duration::from_secs(2);
pub const AVATAR_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Participant,
    Moderator,
    Reminder,
}

#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub speaker: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
}

impl ConversationEntry {
    fn new(speaker: impl Into<String>, message: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            speaker: speaker.into(),
            message: message.into(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Setup,
    Active,
    Paused,
}

impl GameStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GameStatus::Setup => "🟡 Setup",
            GameStatus::Active => "🟢 Active",
            GameStatus::Paused => "⏸️ Paused",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LabGame {
    pub description: String,
    pub creator: UserId,
    pub simulation_channel: ChannelId,
    pub participants: Vec<UserId>,
    pub started: bool,
    pub paused: bool,
    pub setting: Option<String>,
    pub conversation: Vec<ConversationEntry>,
    pub avatars_requested: bool,
    run: u64,
    order: u64,
}

impl LabGame {
    pub fn new(
        description: impl Into<String>,
        creator: UserId,
        simulation_channel: ChannelId,
    ) -> Self {
        Self {
            description: description.into(),
            creator,
            simulation_channel,
            participants: Vec::new(),
            started: false,
            paused: false,
            setting: None,
            conversation: Vec::new(),
            avatars_requested: false,
            run: 0,
            order: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        if self.paused {
            GameStatus::Paused
        } else if self.started {
            GameStatus::Active
        } else {
            GameStatus::Setup
        }
    }

    pub fn setting_or_default(&self) -> &str {
        self.setting.as_deref().unwrap_or(DEFAULT_SETTING)
    }

    /// The participant list is reset along with the conversation.
    pub fn select_participants(&mut self, participants: Vec<UserId>) {
        self.participants = participants;
        self.started = true;
        self.conversation.clear();
    }

    pub fn push_moderator(&mut self, message: impl Into<String>) {
        self.conversation
            .push(ConversationEntry::new(MODERATOR, message, EntryKind::Moderator));
    }

    /// Adds the topic reminder when `sent` lines have gone out since the run began.
    pub fn push_reminder_if_due(&mut self, sent: usize) -> bool {
        if sent > 0 && sent % REMINDER_INTERVAL == 0 {
            let reminder = format!("*Remember: {}*", self.description);
            self.conversation
                .push(ConversationEntry::new("System", reminder, EntryKind::Reminder));
            true
        } else {
            false
        }
    }

    pub fn push_participant(&mut self, speaker: impl Into<String>, message: impl Into<String>) {
        self.conversation
            .push(ConversationEntry::new(speaker, message, EntryKind::Participant));
    }

    pub fn recent_history(&self) -> &[ConversationEntry] {
        let start = self.conversation.len().saturating_sub(HISTORY_WINDOW);
        &self.conversation[start..]
    }

    pub fn restart(&mut self) {
        let keep = self.conversation.len().saturating_sub(KEEP_ON_RESTART);
        let recent = self.conversation.split_off(keep);
        self.conversation.clear();
        self.push_moderator(format!(
            "Let's get back to the main topic: {}",
            self.description
        ));
        self.conversation.extend(recent);
    }

    /// Starts a new run and returns its token; older runs see a stale token and stop.
    pub fn begin_run(&mut self) -> u64 {
        self.run += 1;
        self.run
    }

    pub fn is_running(&self, token: u64) -> bool {
        self.started && !self.paused && self.run == token
    }
}

#[derive(Default)]
struct Registry {
    games: HashMap<ChannelId, LabGame>,
    identities: HashMap<ChannelId, HashMap<UserId, Webhook>>,
    next_order: u64,
}

/// All lab games, keyed by simulation channel.
#[derive(Clone, Default)]
pub struct LabGames {
    inner: Arc<Mutex<Registry>>,
}

impl LabGames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a game already runs in the simulation channel.
    pub fn insert(&self, mut game: LabGame) -> bool {
        let mut registry = self.inner.lock();
        if registry.games.contains_key(&game.simulation_channel) {
            return false;
        }
        registry.next_order += 1;
        game.order = registry.next_order;
        registry.games.insert(game.simulation_channel, game);
        true
    }

    pub fn contains(&self, channel: ChannelId) -> bool {
        self.inner.lock().games.contains_key(&channel)
    }

    /// The game in `channel`, else the earliest game created by `user`.
    pub fn resolve(&self, channel: ChannelId, user: UserId) -> Option<ChannelId> {
        let registry = self.inner.lock();
        if registry.games.contains_key(&channel) {
            return Some(channel);
        }
        registry
            .games
            .values()
            .filter(|g| g.creator == user)
            .min_by_key(|g| g.order)
            .map(|g| g.simulation_channel)
    }

    pub fn get(&self, channel: ChannelId) -> Option<LabGame> {
        self.inner.lock().games.get(&channel).cloned()
    }

    pub fn with_game<R>(&self, channel: ChannelId, f: impl FnOnce(&mut LabGame) -> R) -> Option<R> {
        self.inner.lock().games.get_mut(&channel).map(f)
    }

    /// Drops the game and its cached identities. The webhooks themselves stay on Discord.
    pub fn remove(&self, channel: ChannelId) -> Option<LabGame> {
        let mut registry = self.inner.lock();
        registry.identities.remove(&channel);
        registry.games.remove(&channel)
    }

    pub fn identity(&self, channel: ChannelId, user: UserId) -> Option<Webhook> {
        self.inner
            .lock()
            .identities
            .get(&channel)
            .and_then(|m| m.get(&user))
            .cloned()
    }

    pub fn set_identity(&self, channel: ChannelId, user: UserId, webhook: Webhook) {
        self.inner
            .lock()
            .identities
            .entry(channel)
            .or_default()
            .insert(user, webhook);
    }

    pub fn clear_identities(&self, channel: ChannelId) {
        self.inner.lock().identities.remove(&channel);
    }

    pub fn begin_run(&self, channel: ChannelId) -> Option<u64> {
        self.with_game(channel, LabGame::begin_run)
    }

    pub fn is_running(&self, channel: ChannelId, token: u64) -> bool {
        self.inner
            .lock()
            .games
            .get(&channel)
            .is_some_and(|g| g.is_running(token))
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("Not specified")
}

/// In-character prompt for one participant's next line.
pub fn participant_prompt(
    profile: &UserProfile,
    scenario: &str,
    setting: &str,
    history: &[ConversationEntry],
) -> String {
    let name = &profile.name;
    let mut out = String::new();
    let _ = writeln!(out, "You are {name}. Here's who you are:\n");
    let _ = writeln!(out, "{}\n", profile.description);
    let _ = writeln!(out, "Your role: {}", or_unknown(profile.role.as_deref()));
    let _ = writeln!(out, "Location: {}", or_unknown(profile.location.as_deref()));
    let _ = writeln!(out, "Team: {}\n", or_unknown(profile.team.as_deref()));
    let _ = writeln!(out, "CURRENT TOPIC/SCENARIO: {scenario}");
    let _ = writeln!(out, "Current setting: {setting}\n");
    let _ = writeln!(out, "CRITICAL INSTRUCTIONS:");
    let _ = writeln!(out, "- BE AUTHENTIC to your personality description above");
    let _ = writeln!(out, "- Talk EXACTLY like {name} would based on their personality");
    let _ = writeln!(out, "- Use their specific speech patterns, interests, and characteristics");
    let _ = writeln!(out, "- Keep responses SHORT (1-2 sentences max, often just a few words)");
    let _ = writeln!(out, "- STAY ON TOPIC about: {scenario}");
    let _ = writeln!(out, "- Use casual language and natural reactions");
    let _ = writeln!(out, "- Show your real personality traits from the description");
    let _ = writeln!(out, "- React as the REAL {name} would to this situation");
    let _ = writeln!(out, "- If conversation drifts, naturally bring it back to the main topic");
    let _ = writeln!(out, "- Be yourself - use your own way of speaking and reacting\n");
    let _ = writeln!(
        out,
        "Based on your personality description above, respond naturally as {name} would in this conversation.\n"
    );
    let _ = writeln!(out, "Recent conversation:");
    for entry in history {
        let _ = writeln!(out, "{}: {}", entry.speaker, entry.message);
    }
    let _ = write!(
        out,
        "\nRespond as the REAL {name} (SHORT, authentic to your personality, stay on topic):"
    );
    out
}

/// Keeps generated lines short: the first sentence, or a word-boundary cut.
pub fn clamp_reply(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_REPLY_CHARS {
        return text.to_string();
    }

    if let Some(end) = text.find(['.', '!', '?']) {
        let sentence = &text[..=end];
        if sentence.chars().count() <= MAX_REPLY_CHARS {
            return sentence.to_string();
        }
    }

    let mut out = String::new();
    for word in text.split_whitespace() {
        let extra = if out.is_empty() { 0 } else { 1 };
        if out.chars().count() + extra + word.chars().count() > MAX_REPLY_CHARS {
            break;
        }
        if extra > 0 {
            out.push(' ');
        }
        out.push_str(word);
    }
    if out.is_empty() {
        out = text.chars().take(MAX_REPLY_CHARS).collect();
    }
    out
}

pub fn thinking_placeholder(name: &str) -> String {
    format!("*{name} is thinking...*")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(channel: u64, creator: u64) -> LabGame {
        LabGame::new(
            "Robot failed inspection",
            UserId::new(creator),
            ChannelId::new(channel),
        )
    }

    #[test]
    fn resolve_prefers_current_channel() {
        let games = LabGames::new();
        assert!(games.insert(game(10, 1)));
        assert!(games.insert(game(20, 2)));
        assert_eq!(games.resolve(ChannelId::new(20), UserId::new(1)), Some(ChannelId::new(20)));
        assert_eq!(games.resolve(ChannelId::new(99), UserId::new(1)), Some(ChannelId::new(10)));
        assert_eq!(games.resolve(ChannelId::new(99), UserId::new(3)), None);
    }

    #[test]
    fn resolve_picks_earliest_game_of_creator() {
        let games = LabGames::new();
        assert!(games.insert(game(30, 1)));
        assert!(games.insert(game(5, 1)));
        assert_eq!(games.resolve(ChannelId::new(99), UserId::new(1)), Some(ChannelId::new(30)));
    }

    #[test]
    fn duplicate_channel_is_rejected() {
        let games = LabGames::new();
        assert!(games.insert(game(10, 1)));
        assert!(!games.insert(game(10, 2)));
        assert!(games.remove(ChannelId::new(10)).is_some());
        assert!(!games.contains(ChannelId::new(10)));
    }

    #[test]
    fn restart_keeps_last_three_behind_reminder() {
        let mut g = game(1, 1);
        for i in 0..6 {
            g.push_participant("Ana", format!("line {i}"));
        }
        g.restart();
        assert_eq!(g.conversation.len(), 4);
        assert_eq!(g.conversation[0].speaker, MODERATOR);
        assert_eq!(
            g.conversation[0].message,
            "Let's get back to the main topic: Robot failed inspection"
        );
        assert_eq!(g.conversation[1].message, "line 3");
        assert_eq!(g.conversation[3].message, "line 5");
    }

    #[test]
    fn restart_on_short_history() {
        let mut g = game(1, 1);
        g.push_participant("Ana", "only");
        g.restart();
        assert_eq!(g.conversation.len(), 2);
        assert_eq!(g.conversation[1].message, "only");
    }

    #[test]
    fn reminder_every_twelve_lines() {
        let mut g = game(1, 1);
        assert!(!g.push_reminder_if_due(0));
        assert!(!g.push_reminder_if_due(11));
        assert!(g.push_reminder_if_due(12));
        assert!(g.push_reminder_if_due(24));
        assert_eq!(g.conversation.len(), 2);
        assert_eq!(g.conversation[0].kind, EntryKind::Reminder);
        assert_eq!(g.conversation[0].message, "*Remember: Robot failed inspection*");
    }

    #[test]
    fn history_window_is_last_eight() {
        let mut g = game(1, 1);
        for i in 0..12 {
            g.push_participant("Ana", format!("{i}"));
        }
        let history = g.recent_history();
        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history[0].message, "4");
    }

    #[test]
    fn new_run_invalidates_old_token() {
        let games = LabGames::new();
        let mut g = game(1, 1);
        g.select_participants(vec![UserId::new(2), UserId::new(3)]);
        games.insert(g);

        let channel = ChannelId::new(1);
        let first = games.begin_run(channel).unwrap();
        assert!(games.is_running(channel, first));
        let second = games.begin_run(channel).unwrap();
        assert!(!games.is_running(channel, first));
        assert!(games.is_running(channel, second));

        games.with_game(channel, |g| g.paused = true);
        assert!(!games.is_running(channel, second));
        assert_eq!(games.get(channel).unwrap().status(), GameStatus::Paused);
    }

    #[test]
    fn setup_game_is_not_running() {
        let mut g = game(1, 1);
        let token = g.begin_run();
        assert!(!g.is_running(token));
        assert_eq!(g.status(), GameStatus::Setup);
        assert_eq!(g.setting_or_default(), DEFAULT_SETTING);
    }

    #[test]
    fn clamp_takes_first_sentence() {
        let long = format!("Totally agree! {}", "more words ".repeat(20));
        assert_eq!(clamp_reply(&long), "Totally agree!");
        assert_eq!(clamp_reply("  short  "), "short");
    }

    #[test]
    fn clamp_cuts_on_word_boundary() {
        let long = "word ".repeat(60);
        let out = clamp_reply(&long);
        assert!(out.chars().count() <= MAX_REPLY_CHARS);
        assert!(out.ends_with("word"));
    }

    #[test]
    fn prompt_lists_history() {
        let profile = UserProfile {
            name: "Ana".into(),
            description: "Drive coach, very calm".into(),
            team: Some("118".into()),
            role: Some("Coach".into()),
            location: None,
            discord_id: "2".into(),
            discord_username: "ana".into(),
            discord_display_name: "Ana".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            webhook_url: None,
            avatar_url: None,
        };
        let mut g = game(1, 1);
        g.push_moderator("What now?");
        let prompt = participant_prompt(&profile, &g.description, g.setting_or_default(), g.recent_history());
        assert!(prompt.starts_with("You are Ana."));
        assert!(prompt.contains("Your role: Coach"));
        assert!(prompt.contains("Location: Not specified"));
        assert!(prompt.contains("Current setting: General discussion environment"));
        assert!(prompt.contains("Moderator: What now?"));
        assert!(prompt.ends_with("stay on topic):"));
    }
}
