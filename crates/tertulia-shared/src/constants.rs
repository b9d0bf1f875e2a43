/// Application name
pub const APP_NAME: &str = "Tertulia";

/// Interval between presence heartbeats while a session is active (2 minutes)
pub const HEARTBEAT_INTERVAL_SECS: u64 = 120;

/// A user counts as online when a heartbeat landed within this window
pub const ONLINE_WINDOW_SECS: i64 = 180;

/// Conversation id used while no conversation is selected
pub const NO_CONVERSATION_SENTINEL: &str = "null";

/// Peer id the presentation layer uses to open the social wall
pub const FEED_MARKER: &str = "feed";

/// Display name of the social wall pseudo-conversation
pub const FEED_DISPLAY_NAME: &str = "Comunidad";

/// Index summary for a message that only carries an image
pub const PHOTO_PLACEHOLDER: &str = "📷 Foto";

/// Index summary for a voice note
pub const VOICE_NOTE_PLACEHOLDER: &str = "🎤 Nota de voz";

/// Avatar assigned to every new group
pub const DEFAULT_GROUP_PHOTO_URL: &str = "https://cdn-icons-png.flaticon.com/512/166/166258.png";

/// Upper bound appended to a lowercase prefix to build a half-open range query
pub const PREFIX_RANGE_END: char = char::MAX;

/// Blob storage folders for uploaded attachments
pub const IMAGE_UPLOAD_PREFIX: &str = "chatImages";
pub const AUDIO_UPLOAD_PREFIX: &str = "chatAudios";

/// Maximum attachment size in bytes (25 MiB)
pub const MAX_UPLOAD_SIZE: usize = 25 * 1024 * 1024;

/// Number of users fetched for the discover panel
pub const DISCOVER_LIMIT: usize = 20;
