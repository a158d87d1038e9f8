mod character;
mod commands;
mod config;
mod error;
mod events;
mod gemini;
mod labgame;
mod profiles;
mod relay;
mod tasks;
mod tba;

use anyhow::Context as _;
use character::Personality;
use config::Config;
use events::event_handler;
use gemini::GeminiClient;
use labgame::LabGames;
use poise::serenity_prelude::{self as serenity, ChannelId, Color, CreateEmbed};
use poise::CreateReply;
use profiles::ProfileStore;
use relay::ForwardRule;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tasks::health_server::HealthServerTask;
use tasks::TaskManager;
use tba::{TbaClient, Team};
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct Data {
    pub config: Arc<Config>,
    pub profiles: Arc<RwLock<ProfileStore>>,
    pub ai: Option<Arc<GeminiClient>>,
    pub tba: Arc<TbaClient>,
    pub personality: Arc<parking_lot::RwLock<Personality>>,
    pub forwarding: Arc<parking_lot::RwLock<HashMap<ChannelId, ForwardRule>>>,
    pub team_cache: Arc<parking_lot::RwLock<HashMap<u32, Team>>>,
    pub lab: LabGames,
    pub started_at: Instant,
}

impl Data {
    pub fn personality(&self) -> Personality {
        *self.personality.read()
    }

    pub async fn generate(&self, prompt: &str) -> error::Result<String> {
        match &self.ai {
            Some(ai) => ai.generate(prompt).await,
            None => Err(error::BotError::AiDisabled),
        }
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type ApplicationContext<'a> = poise::ApplicationContext<'a, Data, Error>;

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!("Error handling command {}: {}", ctx.command().qualified_name, error);
            let embed = CreateEmbed::default()
                .title("❌ Error")
                .description("An error occurred while executing this command.")
                .color(Color::RED)
                .timestamp(serenity::Timestamp::now());
            if let Err(e) = ctx.send(CreateReply::default().embed(embed).ephemeral(true)).await {
                tracing::error!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("🤖 Starting Latesh Analysis Bot...");
    let config = Config::from_env()?;
    config.warn_missing();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_WEBHOOKS
        | serenity::GatewayIntents::GUILD_SCHEDULED_EVENTS;

    let profiles = ProfileStore::load(&config.profiles_path)
        .await
        .with_context(|| format!("failed to load profiles from {}", config.profiles_path.display()))?;

    let ai = match &config.gemini_api_key {
        Some(key) => Some(Arc::new(GeminiClient::new(key, &config.gemini_model)?)),
        None => None,
    };
    let data = Data {
        ai,
        tba: Arc::new(TbaClient::new(config.tba_api_key.clone())?),
        profiles: Arc::new(RwLock::new(profiles)),
        personality: Arc::default(),
        forwarding: Arc::default(),
        team_cache: Arc::default(),
        lab: LabGames::new(),
        started_at: Instant::now(),
        config: Arc::new(config),
    };
    let token = data.config.discord_token.clone();

    let mut task_manager = TaskManager::new();
    task_manager.register_task(HealthServerTask::new(data.config.port));

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(
                    "Registered {} commands for {}",
                    framework.options().commands.len(),
                    ready.user.name
                );

                task_manager.run_all(ctx, data.clone()).await;

                Ok(data)
            })
        })
        .build();

    serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("failed to build Discord client")?
        .start()
        .await
        .context("Discord client stopped")?;

    Ok(())
}
