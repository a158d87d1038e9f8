use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, ChannelId, Color, CreateEmbed, CreateEmbedFooter, CreateMessage};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tokio::time;
use tracing::{info, warn};

use super::TaskHandler;
use crate::labgame::{self, identity, LabGames, MAX_MESSAGES};
use crate::profiles::UserProfile;
use crate::{Data, Error};

/// One run of a lab game's simulated conversation.
pub struct ConversationTask {
    channel: ChannelId,
    token: u64,
    delay: Duration,
}

/// Sleeps, then reports whether the run holding `token` still owns the game.
async fn still_running(lab: &LabGames, channel: ChannelId, token: u64, delay: Duration) -> bool {
    time::sleep(delay).await;
    lab.is_running(channel, token)
}

impl ConversationTask {
    /// `token` must come from `LabGames::begin_run` at spawn time.
    pub fn new(channel: ChannelId, token: u64, delay: Duration) -> Self {
        Self { channel, token, delay }
    }

    async fn request_avatars(&self, ctx: &serenity::Context, data: &Data, participants: &[UserProfile]) {
        let mut requested = 0;
        for profile in participants {
            if identity::avatar_for(&ctx.http, profile).await.is_generated() {
                let embed = CreateEmbed::default()
                    .title("📸 Profile Picture Request")
                    .description(format!(
                        "**{0}** doesn't have a profile picture set.\n\nIf you have a PNG/JPG link for {0}'s profile picture, please reply with the link to make the simulation more realistic!",
                        profile.name
                    ))
                    .footer(CreateEmbedFooter::new(
                        "This is optional - the simulation will continue with a generated avatar if no link is provided",
                    ))
                    .color(Color::from_rgb(0, 174, 134));
                if let Err(e) = self.channel.send_message(&ctx.http, CreateMessage::new().embed(embed)).await {
                    warn!("Failed to request avatar for {}: {e}", profile.name);
                }
                requested += 1;
            }
        }
        if requested > 0 {
            time::sleep(labgame::AVATAR_WAIT).await;
        }
        data.lab.with_game(self.channel, |g| g.avatars_requested = true);
    }

    async fn next_line(&self, data: &Data, sent: usize) -> Option<(UserProfile, String)> {
        let game = data.lab.get(self.channel)?;
        let speaker = *game.participants.choose(&mut rand::thread_rng())?;
        let profile = data.profiles.read().await.get(speaker).cloned()?;

        let prompt = labgame::participant_prompt(
            &profile,
            &game.description,
            game.setting_or_default(),
            game.recent_history(),
        );
        let reply = match data.generate(&prompt).await {
            Ok(text) => labgame::clamp_reply(&text),
            Err(e) => {
                warn!("Lab game generation failed for {}: {e}", profile.name);
                labgame::thinking_placeholder(&profile.name)
            }
        };

        data.lab.with_game(self.channel, |g| {
            g.push_reminder_if_due(sent);
            g.push_participant(profile.name.clone(), reply.clone());
        })?;
        Some((profile, reply))
    }
}

#[async_trait]
impl TaskHandler for ConversationTask {
    fn name(&self) -> &'static str {
        "Lab Conversation"
    }

    async fn run(&mut self, ctx: &serenity::Context, data: Data) -> Result<(), Error> {
        let token = self.token;
        if !still_running(&data.lab, self.channel, token, self.delay).await {
            return Ok(());
        }
        info!("Lab conversation run {token} starting in {}", self.channel);

        if let Some(game) = data.lab.get(self.channel).filter(|g| !g.avatars_requested) {
            let profiles: Vec<UserProfile> = {
                let store = data.profiles.read().await;
                game.participants.iter().filter_map(|id| store.get(*id).cloned()).collect()
            };
            self.request_avatars(ctx, &data, &profiles).await;
        }
        if !still_running(&data.lab, self.channel, token, labgame::START_DELAY).await {
            return Ok(());
        }

        for sent in 0..MAX_MESSAGES {
            if !data.lab.is_running(self.channel, token) {
                return Ok(());
            }

            // A missing profile skips the turn.
            let Some((profile, reply)) = self.next_line(&data, sent).await else {
                continue;
            };
            if !data.lab.is_running(self.channel, token) {
                return Ok(());
            }

            let user = profile.user_id();
            let webhook = match user {
                Some(user) => {
                    identity::participant_webhook(&ctx.http, &data.lab, &data.profiles, self.channel, user)
                        .await
                }
                None => None,
            };
            let avatar = identity::avatar_for(&ctx.http, &profile).await;
            identity::speak(&ctx.http, self.channel, webhook.as_ref(), &profile.name, &avatar, &reply).await;

            let delay = rand::thread_rng().gen_range(1000..=4000);
            time::sleep(Duration::from_millis(delay)).await;
        }

        if data.lab.is_running(self.channel, token) {
            let embed = CreateEmbed::default()
                .title("🎬 Conversation Simulation Complete")
                .description("The personality simulation has reached its natural conclusion.")
                .footer(CreateEmbedFooter::new(
                    "Use /latesh setting to change context or /latesh stop to end the game",
                ))
                .color(Color::from_rgb(255, 153, 0));
            self.channel
                .send_message(&ctx.http, CreateMessage::new().embed(embed))
                .await?;
        }
        info!("Lab conversation run {token} finished in {}", self.channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labgame::LabGame;
    use poise::serenity_prelude::UserId;

    const NO_WAIT: Duration = Duration::ZERO;

    fn started_game(channel: ChannelId) -> LabGames {
        let lab = LabGames::new();
        assert!(lab.insert(LabGame::new("Scouting debate", UserId::new(1), channel)));
        lab.with_game(channel, |g| g.select_participants(vec![UserId::new(2), UserId::new(3)]));
        lab
    }

    #[tokio::test]
    async fn live_run_keeps_going() {
        let channel = ChannelId::new(10);
        let lab = started_game(channel);
        let token = lab.begin_run(channel).unwrap();
        assert!(still_running(&lab, channel, token, NO_WAIT).await);
    }

    #[tokio::test]
    async fn pause_ends_the_run() {
        let channel = ChannelId::new(11);
        let lab = started_game(channel);
        let token = lab.begin_run(channel).unwrap();
        lab.with_game(channel, |g| g.paused = true);
        assert!(!still_running(&lab, channel, token, NO_WAIT).await);
    }

    #[tokio::test]
    async fn stop_ends_the_run() {
        let channel = ChannelId::new(12);
        let lab = started_game(channel);
        let token = lab.begin_run(channel).unwrap();
        lab.remove(channel);
        assert!(!still_running(&lab, channel, token, NO_WAIT).await);
    }

    #[tokio::test]
    async fn spawning_supersedes_before_the_new_run_wakes() {
        let channel = ChannelId::new(13);
        let lab = started_game(channel);
        let old = lab.begin_run(channel).unwrap();

        // Pause then resume: the resumed run claims its token immediately.
        lab.with_game(channel, |g| g.paused = true);
        lab.with_game(channel, |g| g.paused = false);
        let resumed = lab.begin_run(channel).unwrap();
        assert!(!lab.is_running(channel, old));

        // Two back-to-back restarts leave only the latest one alive.
        let restart = lab.begin_run(channel).unwrap();
        assert!(!still_running(&lab, channel, resumed, NO_WAIT).await);
        assert!(still_running(&lab, channel, restart, NO_WAIT).await);
    }
}
