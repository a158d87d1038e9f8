pub mod conversation;
pub mod health_server;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use crate::{Data, Error};

#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    async fn run(&mut self, ctx: &serenity::Context, data: Data) -> Result<(), Error>;
}

/// Runs a single task in the background, logging its failure.
pub fn spawn(ctx: &serenity::Context, data: Data, mut task: Box<dyn TaskHandler>) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        let task_name = task.name();
        if let Err(e) = task.run(&ctx, data).await {
            tracing::error!("Task {} failed: {}", task_name, e);
        }
    });
}

#[derive(Default)]
pub struct TaskManager {
    tasks: Vec<Box<dyn TaskHandler>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_task(&mut self, task: impl TaskHandler) {
        self.tasks.push(Box::new(task));
    }

    pub async fn run_all(self, ctx: &serenity::Context, data: Data) {
        for task in self.tasks {
            tracing::info!("Starting task {}", task.name());
            spawn(ctx, data.clone(), task);
        }
    }
}
