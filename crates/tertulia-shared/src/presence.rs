//! Human-readable presence derived from `lastSeen`.
//!
//! `isOnline` alone is not trusted: a session that dies without its closing
//! write never flips it back, so the flag only counts while `lastSeen` is
//! fresher than the online window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceStatus {
    Online,
    MinutesAgo(i64),
    HoursAgo(i64),
    Offline,
}

impl PresenceStatus {
    pub fn derive(
        is_online: bool,
        last_seen: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        online_window: Duration,
    ) -> Self {
        let Some(last_seen) = last_seen else {
            return Self::Offline;
        };

        let age = (now - last_seen).max(Duration::zero());
        if is_online && age <= online_window {
            return Self::Online;
        }

        if age < Duration::hours(1) {
            Self::MinutesAgo(age.num_minutes().max(1))
        } else if age < Duration::days(1) {
            Self::HoursAgo(age.num_hours())
        } else {
            Self::Offline
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::MinutesAgo(m) => write!(f, "{m}m ago"),
            Self::HoursAgo(h) => write!(f, "{h}h ago"),
            Self::Offline => f.write_str("offline"),
        }
    }
}
