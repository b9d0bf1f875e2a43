//! Identity and presence.
//!
//! Login merges the provider identity into the user document and starts a
//! heartbeat task that keeps `lastSeen` fresh.  Logout and the page-closing
//! signal mark the user offline.  Heartbeat and offline writes are
//! best-effort: one attempt, failures logged and reported, never retried.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use tertulia_shared::{AuthIdentity, PresenceStatus, User, UserId, UserPatch};
use tertulia_store::DocumentStore;

use crate::best_effort::BestEffort;
use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, EventBus};
use crate::session::Session;

pub struct PresenceManager {
    store: Arc<dyn DocumentStore>,
    session: Arc<Session>,
    events: EventBus,
    heartbeat_interval: Duration,
    online_window: chrono::Duration,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session: Arc<Session>,
        events: EventBus,
        heartbeat_interval: Duration,
        online_window: chrono::Duration,
    ) -> Self {
        Self {
            store,
            session,
            events,
            heartbeat_interval,
            online_window,
            heartbeat: Mutex::new(None),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Sign in `identity`: merge it into the user document, make sure the
    /// user's conversation index exists, begin the session and start the
    /// heartbeat.
    pub async fn login(&self, identity: AuthIdentity) -> Result<User> {
        let uid = identity.uid.clone();
        let now = Utc::now();
        let existing = self.store.get_user(&uid).await?;

        let display_name = identity
            .display_name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                identity
                    .email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .map(str::to_string)
            });

        let mut patch = UserPatch::presence(true, now);
        patch.display_name = display_name;
        patch.photo_url = identity.photo_url;
        patch.email = identity.email;
        if existing.is_none() {
            patch.created_at = Some(now);
        }

        self.store.upsert_user(&uid, patch).await?;
        self.store.create_index(&uid).await?;

        let user = self
            .store
            .get_user(&uid)
            .await?
            .ok_or_else(|| ClientError::UserNotFound(uid.to_string()))?;

        self.session.begin(user.clone());
        self.start_heartbeat(uid.clone());

        info!(uid = %uid, first_login = existing.is_none(), "Signed in");
        Ok(user)
    }

    /// Mark the user offline and end the session.
    pub async fn logout(&self) -> Result<BestEffort> {
        self.stop_heartbeat();
        let user = self.session.end().ok_or(ClientError::NotSignedIn)?;
        let outcome = self.write_presence(&user.uid, false).await;
        info!(uid = %user.uid, "Signed out");
        Ok(outcome)
    }

    /// Close-time signal: mark the user offline but leave the session as is.
    pub async fn page_closing(&self) -> Option<BestEffort> {
        let uid = self.session.current_uid()?;
        Some(self.write_presence(&uid, false).await)
    }

    /// One heartbeat write for the signed-in user.
    pub async fn heartbeat(&self) -> Option<BestEffort> {
        let uid = self.session.current_uid()?;
        Some(self.write_presence(&uid, true).await)
    }

    /// Derived status of `user` at `now`.
    pub fn status_of(&self, user: &User, now: DateTime<Utc>) -> PresenceStatus {
        PresenceStatus::derive(user.is_online, user.last_seen, now, self.online_window)
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat
            .lock()
            .map(|h| h.as_ref().is_some_and(|task| !task.is_finished()))
            .unwrap_or(false)
    }

    async fn write_presence(&self, uid: &UserId, online: bool) -> BestEffort {
        presence_write(self.store.as_ref(), &self.events, uid, online).await
    }

    fn start_heartbeat(&self, uid: UserId) {
        let store = self.store.clone();
        let events = self.events.clone();
        let period = self.heartbeat_interval;

        let task = tokio::spawn(async move {
            // login already wrote presence; first tick is one period out
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!(uid = %uid, "Presence heartbeat");
                presence_write(store.as_ref(), &events, &uid, true).await;
            }
        });

        if let Ok(mut slot) = self.heartbeat.lock() {
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }
    }

    fn stop_heartbeat(&self) {
        if let Ok(mut slot) = self.heartbeat.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

impl Drop for PresenceManager {
    fn drop(&mut self) {
        self.stop_heartbeat();
    }
}

async fn presence_write(
    store: &dyn DocumentStore,
    events: &EventBus,
    uid: &UserId,
    online: bool,
) -> BestEffort {
    let result = store
        .update_user(uid, UserPatch::presence(online, Utc::now()))
        .await;
    if let Err(e) = &result {
        events.emit(ClientEvent::PresenceWriteFailed {
            uid: uid.clone(),
            error: e.to_string(),
        });
    }
    let operation = if online { "presence-heartbeat" } else { "presence-offline" };
    BestEffort::single(operation, uid, result)
}
