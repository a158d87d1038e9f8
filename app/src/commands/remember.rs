use crate::character::truncate;
use crate::profiles::{Account, ProfileForm, UserProfile};
use crate::{ApplicationContext, Context, Error};
use chrono::Utc;
use poise::serenity_prelude::{self as serenity, Color, CreateEmbed, UserId};
use poise::{CreateReply, Modal};
use tracing::{error, info};

#[derive(Debug, Clone, Default, poise::Modal)]
#[name = "Create Your Personal Profile"]
struct ProfileModal {
    #[name = "Your Name"]
    #[placeholder = "Enter your real name or preferred name"]
    #[max_length = 50]
    name: String,
    #[name = "About You"]
    #[placeholder = "Tell us about yourself, your interests, your role in FRC, etc."]
    #[paragraph]
    #[max_length = 1000]
    description: String,
    #[name = "FRC Team Number (Optional)"]
    #[placeholder = "e.g., 254"]
    #[max_length = 4]
    team: Option<String>,
    #[name = "Role/Position (Optional)"]
    #[placeholder = "e.g., Mentor, Student, Alumni, Parent"]
    #[max_length = 50]
    role: Option<String>,
    #[name = "Location (Optional)"]
    #[placeholder = "e.g., California, USA"]
    #[max_length = 100]
    location: Option<String>,
}

impl From<ProfileForm> for ProfileModal {
    fn from(form: ProfileForm) -> Self {
        Self {
            name: form.name,
            description: form.description,
            team: form.team,
            role: form.role,
            location: form.location,
        }
    }
}

impl From<ProfileModal> for ProfileForm {
    fn from(modal: ProfileModal) -> Self {
        Self {
            name: modal.name,
            description: modal.description,
            team: modal.team,
            role: modal.role,
            location: modal.location,
        }
    }
}

fn display_name(user: &serenity::User) -> String {
    user.global_name.clone().unwrap_or_else(|| user.name.clone())
}

fn team_label(team: Option<&str>) -> String {
    team.map(|t| format!("Team {t}"))
        .unwrap_or_else(|| "Not specified".to_string())
}

fn with_optional_fields(mut embed: CreateEmbed, profile: &UserProfile) -> CreateEmbed {
    if let Some(team) = &profile.team {
        embed = embed.field("🤖 FRC Team", format!("Team {team}"), true);
    }
    if let Some(role) = &profile.role {
        embed = embed.field("🏷️ Role", role, true);
    }
    if let Some(location) = &profile.location {
        embed = embed.field("📍 Location", location, true);
    }
    embed
}

/// Create or update your personal profile
#[poise::command(
    slash_command,
    category = "Profiles",
    subcommands("me", "view", "list", "delete")
)]
pub async fn remember(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Create/update your personal profile
#[poise::command(slash_command, user_cooldown = 5)]
pub async fn me(ctx: ApplicationContext<'_>) -> Result<(), Error> {
    let user = ctx.interaction.user.clone();
    let defaults = ctx
        .data
        .profiles
        .read()
        .await
        .get(user.id)
        .map(|p| ProfileModal::from(p.to_form()));

    let Some(submitted) = ProfileModal::execute_with_defaults(ctx, defaults.unwrap_or_default()).await? else {
        return Ok(());
    };

    let account = Account {
        id: user.id,
        username: user.name.clone(),
        display_name: display_name(&user),
    };
    let (profile, existed) = {
        let mut store = ctx.data.profiles.write().await;
        let upserted = store.upsert_form(submitted.into(), &account, Utc::now());
        store.save().await?;
        upserted
    };
    info!("Profile {} for {}", if existed { "updated" } else { "created" }, user.name);

    let (verb, done) = if existed {
        ("Updated", "updated")
    } else {
        ("Created", "saved")
    };
    let embed = CreateEmbed::default()
        .title(format!("✅ Profile {verb} Successfully!"))
        .description(format!(
            "Your profile has been {done} and can now be used by the AI system for personalized responses."
        ))
        .field("👤 Name", &profile.name, true)
        .field("📝 Description", truncate(&profile.description, 103), false)
        .color(Color::from_rgb(0, 255, 0))
        .timestamp(Utc::now());
    let embed = with_optional_fields(embed, &profile);

    let ctx = Context::Application(ctx);
    ctx.send(CreateReply::default().embed(embed).ephemeral(true)).await?;
    Ok(())
}

/// View a user's profile
#[poise::command(slash_command)]
pub async fn view(
    ctx: Context<'_>,
    #[description = "User to view profile of"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.unwrap_or_else(|| ctx.author().clone());
    let profile = ctx.data().profiles.read().await.get(target.id).cloned();

    let Some(profile) = profile else {
        let who = if target.id == ctx.author().id {
            "You don't".to_string()
        } else {
            format!("{} doesn't", display_name(&target))
        };
        ctx.send(
            CreateReply::default()
                .content(format!(
                    "❌ {who} have a profile saved. Use `/remember me` to create one!"
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let embed = CreateEmbed::default()
        .title(format!("👤 Profile: {}", profile.name))
        .description(&profile.description)
        .thumbnail(target.face())
        .field(
            "🆔 Discord User",
            format!("{} ({})", display_name(&target), target.name),
            true,
        )
        .field("📅 Profile Created", profile.created_at.format("%-m/%-d/%Y").to_string(), true)
        .field("🔄 Last Updated", profile.updated_at.format("%-m/%-d/%Y").to_string(), true)
        .color(Color::from_rgb(0, 153, 255))
        .timestamp(Utc::now());
    let embed = with_optional_fields(embed, &profile);
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

const LIST_LIMIT: usize = 10;

/// List all saved profiles
#[poise::command(slash_command)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let (total, shown): (usize, Vec<UserProfile>) = {
        let store = ctx.data().profiles.read().await;
        (
            store.len(),
            store.iter().take(LIST_LIMIT).map(|(_, p)| p.clone()).collect(),
        )
    };

    if total == 0 {
        ctx.send(
            CreateReply::default()
                .content("❌ No profiles have been saved yet. Use `/remember me` to create the first one!")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let mut fields = Vec::with_capacity(shown.len());
    for profile in &shown {
        let discord = match profile.user_id() {
            Some(id) => ctx
                .http()
                .get_user(id)
                .await
                .map(|u| display_name(&u))
                .unwrap_or_else(|_| "Unknown User".to_string()),
            None => "Unknown User".to_string(),
        };
        fields.push((
            profile.name.clone(),
            format!(
                "**Discord:** {discord}\n**Role:** {}\n**Team:** {}",
                profile.role.as_deref().unwrap_or("Not specified"),
                team_label(profile.team.as_deref())
            ),
            true,
        ));
    }

    let mut embed = CreateEmbed::default()
        .title("📋 Saved User Profiles")
        .description(format!("Found {total} saved profile(s)"))
        .fields(fields)
        .color(Color::from_rgb(0, 255, 0))
        .timestamp(Utc::now());
    if total > LIST_LIMIT {
        embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
            "... and {} more profiles",
            total - LIST_LIMIT
        )));
    }
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

async fn delete_profile(ctx: Context<'_>, user: UserId) -> Result<bool, Error> {
    let mut store = ctx.data().profiles.write().await;
    if store.remove(user).is_none() {
        return Ok(false);
    }
    store.save().await?;
    Ok(true)
}

/// Delete your profile
#[poise::command(slash_command, ephemeral)]
pub async fn delete(ctx: Context<'_>) -> Result<(), Error> {
    let reply = match delete_profile(ctx, ctx.author().id).await {
        Ok(true) => {
            info!("Profile deleted for {}", ctx.author().name);
            "✅ Your profile has been deleted successfully."
        }
        Ok(false) => "❌ You don't have a profile to delete.",
        Err(e) => {
            error!("Failed to delete profile for {}: {}", ctx.author().name, e);
            "❌ Failed to delete your profile. Please try again later."
        }
    };
    ctx.send(CreateReply::default().content(reply).ephemeral(true)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modal_round_trips_form() {
        let form = ProfileForm {
            name: "Sam".into(),
            description: "Scouting lead".into(),
            team: Some("971".into()),
            role: None,
            location: Some("Mountain View".into()),
        };
        let back: ProfileForm = ProfileModal::from(form.clone()).into();
        assert_eq!(back.name, form.name);
        assert_eq!(back.team, form.team);
        assert_eq!(back.role, None);
        assert_eq!(back.location, form.location);
    }

    #[test]
    fn team_label_falls_back() {
        assert_eq!(team_label(Some("254")), "Team 254");
        assert_eq!(team_label(None), "Not specified");
    }
}
