use crate::{Context, Data, Error};
use chrono::Utc;
use poise::serenity_prelude::{Color, CreateEmbed, CreateEmbedFooter, Permissions};
use poise::CreateReply;
use tracing::{error, info};

type Command = poise::Command<Data, Error>;

fn permissions_label(permissions: Permissions) -> String {
    if permissions.is_empty() {
        "None".to_string()
    } else {
        permissions.get_permission_names().join(", ")
    }
}

fn find_command<'a>(commands: &'a [Command], name: &str) -> Option<&'a Command> {
    let name = name.trim().trim_start_matches('/');
    commands.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

fn command_line(command: &Command) -> String {
    let category = command.category.as_deref().unwrap_or("General");
    let mut line = format!("`/{}` ({category})", command.name);
    let perms = command.required_permissions | command.default_member_permissions;
    if !perms.is_empty() {
        line.push_str(&format!(" - requires {}", permissions_label(perms)));
    }
    line
}

/// Inspect and reload registered commands
#[poise::command(
    slash_command,
    category = "Utility",
    required_permissions = "ADMINISTRATOR",
    default_member_permissions = "ADMINISTRATOR",
    subcommands("list", "info", "reload")
)]
pub async fn extensions(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// List every registered command
#[poise::command(slash_command, ephemeral)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let commands = &ctx.framework().options().commands;
    let lines = commands
        .iter()
        .map(command_line)
        .collect::<Vec<_>>()
        .join("\n");

    let embed = CreateEmbed::default()
        .title("🧩 Registered Commands")
        .description(lines)
        .footer(CreateEmbedFooter::new(format!("{} commands loaded", commands.len())))
        .color(Color::from_rgb(0, 153, 255))
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show details about one command
#[poise::command(slash_command, ephemeral)]
pub async fn info(
    ctx: Context<'_>,
    #[description = "Command name"] name: String,
) -> Result<(), Error> {
    let Some(command) = find_command(&ctx.framework().options().commands, &name) else {
        ctx.say(format!("❌ No command named `{name}` is registered.")).await?;
        return Ok(());
    };

    let options = if command.parameters.is_empty() {
        "None".to_string()
    } else {
        command
            .parameters
            .iter()
            .map(|p| {
                format!(
                    "`{}`{} {}",
                    p.name,
                    if p.required { "" } else { " (optional)" },
                    p.description.as_deref().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let subcommands = if command.subcommands.is_empty() {
        "None".to_string()
    } else {
        command
            .subcommands
            .iter()
            .map(|s| format!("`{}` {}", s.name, s.description.as_deref().unwrap_or("")))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let embed = CreateEmbed::default()
        .title(format!("🧩 /{}", command.name))
        .description(command.description.as_deref().unwrap_or("No description"))
        .field("Category", command.category.as_deref().unwrap_or("General"), true)
        .field(
            "Permissions",
            permissions_label(command.required_permissions | command.default_member_permissions),
            true,
        )
        .field("Options", options, false)
        .field("Subcommands", subcommands, false)
        .color(Color::from_rgb(0, 153, 255))
        .timestamp(Utc::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Re-register all commands with Discord
#[poise::command(slash_command, ephemeral)]
pub async fn reload(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    let commands = &ctx.framework().options().commands;
    match poise::builtins::register_globally(ctx.http(), commands).await {
        Ok(()) => {
            info!("{} re-registered {} commands", ctx.author().name, commands.len());
            ctx.say(format!("✅ Reloaded {} commands.", commands.len())).await?;
        }
        Err(e) => {
            error!("Failed to re-register commands: {}", e);
            ctx.say("❌ Failed to reload commands. Check the logs for details.").await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_labels() {
        assert_eq!(permissions_label(Permissions::empty()), "None");
        assert_eq!(permissions_label(Permissions::ADMINISTRATOR), "Administrator");
    }

    #[test]
    fn registry_lookup_ignores_slash_and_case() {
        let all = crate::commands::all();
        assert!(find_command(&all, "/Research").is_some());
        assert!(find_command(&all, "latesh").is_some());
        assert!(find_command(&all, "nope").is_none());
    }

    #[test]
    fn command_names_are_unique() {
        let all = crate::commands::all();
        let mut names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }
}
