//! Profile editing and people discovery.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use tertulia_shared::constants::DISCOVER_LIMIT;
use tertulia_shared::{ModelError, User, UserId, UserPatch};
use tertulia_store::DocumentStore;

use crate::error::{ClientError, Result};

/// Editable "about me" fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub bio: String,
    pub location: String,
    pub work: String,
    pub education: String,
    pub interests: Vec<String>,
}

/// A discovered user and how many interests they share with the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub user: User,
    pub shared_interests: usize,
}

pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Save the profile form and mark the profile as completed.
    pub async fn update_profile(&self, uid: &UserId, update: ProfileUpdate) -> Result<User> {
        let interests = update
            .interests
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();

        let patch = UserPatch {
            bio: Some(update.bio),
            location: Some(update.location),
            work: Some(update.work),
            education: Some(update.education),
            interests: Some(interests),
            profile_completed: Some(true),
            ..UserPatch::default()
        };
        self.store.update_user(uid, patch).await?;
        info!(uid = %uid, "Profile updated");
        self.reload(uid).await
    }

    /// Change the display name.  The lowercase search key follows.
    pub async fn rename(&self, uid: &UserId, display_name: &str) -> Result<User> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ModelError::EmptyDisplayName.into());
        }

        let patch = UserPatch {
            display_name: Some(display_name.to_string()),
            ..UserPatch::default()
        };
        self.store.update_user(uid, patch).await?;
        info!(uid = %uid, "Display name changed");
        self.reload(uid).await
    }

    /// Up to [`DISCOVER_LIMIT`] other users, most shared interests first.
    pub async fn discover_users(&self, me: &User) -> Result<Vec<Suggestion>> {
        let mine: HashSet<String> = me.interests.iter().map(|i| i.to_lowercase()).collect();
        let users = self.store.list_users(DISCOVER_LIMIT).await?;

        let mut suggestions: Vec<Suggestion> = users
            .into_iter()
            .filter(|u| u.uid != me.uid)
            .map(|user| {
                let shared_interests = user
                    .interests
                    .iter()
                    .filter(|i| mine.contains(&i.to_lowercase()))
                    .count();
                Suggestion {
                    user,
                    shared_interests,
                }
            })
            .collect();

        suggestions.sort_by(|a, b| b.shared_interests.cmp(&a.shared_interests));
        Ok(suggestions)
    }

    async fn reload(&self, uid: &UserId) -> Result<User> {
        self.store
            .get_user(uid)
            .await?
            .ok_or_else(|| ClientError::UserNotFound(uid.to_string()))
    }
}
