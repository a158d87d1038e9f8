use chrono::{DateTime, Utc};
use poise::serenity_prelude::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub discord_id: String,
    pub discord_username: String,
    pub discord_display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Raw values submitted through the profile modal.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: String,
    pub description: String,
    pub team: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
}

/// Discord account fields copied onto the profile.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl UserProfile {
    pub fn from_form(
        form: ProfileForm,
        account: &Account,
        previous: Option<&UserProfile>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: form.name.trim().to_string(),
            description: form.description.trim().to_string(),
            team: optional(form.team),
            role: optional(form.role),
            location: optional(form.location),
            discord_id: account.id.to_string(),
            discord_username: account.username.clone(),
            discord_display_name: account.display_name.clone(),
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
            webhook_url: previous.and_then(|p| p.webhook_url.clone()),
            avatar_url: previous.and_then(|p| p.avatar_url.clone()),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.discord_id
            .parse::<u64>()
            .ok()
            .filter(|id| *id != 0)
            .map(UserId::new)
    }

    /// Values used to prefill the profile modal.
    pub fn to_form(&self) -> ProfileForm {
        ProfileForm {
            name: self.name.clone(),
            description: self.description.clone(),
            team: self.team.clone(),
            role: self.role.clone(),
            location: self.location.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: BTreeMap<String, UserProfile>,
}

impl ProfileStore {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let profiles: BTreeMap<String, UserProfile> = serde_json::from_str(&raw)?;
                info!("Loaded {} user profiles from {}", profiles.len(), path.display());
                Ok(Self { path, profiles })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Creating new profile store at {}", path.display());
                let store = Self {
                    path,
                    profiles: BTreeMap::new(),
                };
                store.save().await?;
                Ok(store)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let raw = serde_json::to_string_pretty(&self.profiles)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    pub fn get(&self, user_id: UserId) -> Option<&UserProfile> {
        self.profiles.get(&user_id.to_string())
    }

    pub fn get_mut(&mut self, user_id: UserId) -> Option<&mut UserProfile> {
        self.profiles.get_mut(&user_id.to_string())
    }

    pub fn set(&mut self, user_id: UserId, profile: UserProfile) {
        self.profiles.insert(user_id.to_string(), profile);
    }

    /// Applies a submitted form on top of whatever is stored now, returning the profile and
    /// whether one already existed.
    pub fn upsert_form(
        &mut self,
        form: ProfileForm,
        account: &Account,
        now: DateTime<Utc>,
    ) -> (UserProfile, bool) {
        let previous = self.get(account.id);
        let existed = previous.is_some();
        let profile = UserProfile::from_form(form, account, previous, now);
        self.set(account.id, profile.clone());
        (profile, existed)
    }

    pub fn remove(&mut self, user_id: UserId) -> Option<UserProfile> {
        self.profiles.remove(&user_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &UserProfile)> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: u64) -> Account {
        Account {
            id: UserId::new(id),
            username: "alex".into(),
            display_name: "Alex".into(),
        }
    }

    fn form() -> ProfileForm {
        ProfileForm {
            name: "  Alex  ".into(),
            description: " Builds robots ".into(),
            team: Some("254".into()),
            role: Some("   ".into()),
            location: None,
        }
    }

    #[test]
    fn form_values_are_trimmed_and_blanks_dropped() {
        let profile = UserProfile::from_form(form(), &account(7), None, Utc::now());
        assert_eq!(profile.name, "Alex");
        assert_eq!(profile.description, "Builds robots");
        assert_eq!(profile.team.as_deref(), Some("254"));
        assert_eq!(profile.role, None);
        assert_eq!(profile.discord_id, "7");
        assert_eq!(profile.created_at, profile.updated_at);
    }

    #[test]
    fn update_keeps_creation_time_and_identity() {
        let first = Utc::now() - chrono::Duration::days(3);
        let mut previous = UserProfile::from_form(form(), &account(7), None, first);
        previous.webhook_url = Some("https://discord.com/api/webhooks/1/x".into());
        previous.avatar_url = Some("https://img.example/a.png".into());

        let now = Utc::now();
        let updated = UserProfile::from_form(form(), &account(7), Some(&previous), now);
        assert_eq!(updated.created_at, first);
        assert_eq!(updated.updated_at, now);
        assert_eq!(updated.webhook_url, previous.webhook_url);
        assert_eq!(updated.avatar_url, previous.avatar_url);
    }

    #[tokio::test]
    async fn missing_file_creates_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profiles.json");
        let store = ProfileStore::load(&path).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");
    }

    #[tokio::test]
    async fn profiles_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");

        let mut store = ProfileStore::load(&path).await.unwrap();
        let profile = UserProfile::from_form(form(), &account(42), None, Utc::now());
        store.set(UserId::new(42), profile.clone());
        store.save().await.unwrap();

        let reloaded = ProfileStore::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(UserId::new(42)), Some(&profile));
        assert_eq!(profile.user_id(), Some(UserId::new(42)));
    }

    #[tokio::test]
    async fn absent_optional_fields_default_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(
            &path,
            r#"{"9":{"name":"Sam","description":"Driver","discord_id":"9","discord_username":"sam","discord_display_name":"Sam","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-02T00:00:00Z"}}"#,
        )
        .unwrap();

        let store = ProfileStore::load(&path).await.unwrap();
        let profile = store.get(UserId::new(9)).unwrap();
        assert_eq!(profile.team, None);
        assert_eq!(profile.webhook_url, None);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(ProfileStore::load(&path).await.is_err());
    }

    #[test]
    fn remove_returns_profile() {
        let mut store = ProfileStore::default();
        let profile = UserProfile::from_form(form(), &account(5), None, Utc::now());
        store.set(UserId::new(5), profile);
        assert_eq!(store.len(), 1);
        assert!(store.remove(UserId::new(5)).is_some());
        assert!(store.remove(UserId::new(5)).is_none());
    }

    #[test]
    fn upsert_keeps_fields_saved_after_the_form_opened() {
        let mut store = ProfileStore::default();
        let first = Utc::now() - chrono::Duration::days(1);
        store.upsert_form(form(), &account(8), first);

        // An avatar and webhook captured while the modal was still open.
        let stored = store.get_mut(UserId::new(8)).unwrap();
        stored.avatar_url = Some("https://img.example/late.png".into());
        stored.webhook_url = Some("https://discord.com/api/webhooks/2/y".into());

        let mut edited = form();
        edited.description = "Programming lead".into();
        let (profile, existed) = store.upsert_form(edited, &account(8), Utc::now());
        assert!(existed);
        assert_eq!(profile.description, "Programming lead");
        assert_eq!(profile.created_at, first);
        assert_eq!(profile.avatar_url.as_deref(), Some("https://img.example/late.png"));
        assert_eq!(
            store.get(UserId::new(8)).unwrap().webhook_url.as_deref(),
            Some("https://discord.com/api/webhooks/2/y")
        );
    }

    #[test]
    fn upsert_creates_when_absent() {
        let mut store = ProfileStore::default();
        let (profile, existed) = store.upsert_form(form(), &account(3), Utc::now());
        assert!(!existed);
        assert_eq!(profile.avatar_url, None);
        assert_eq!(store.len(), 1);
    }
}
