use std::path::PathBuf;

/// Both pollers run at the backend's expected cadence.
pub const NOTIFICATION_POLL_SECS: u64 = 30;
pub const ACTIVE_ALARM_POLL_SECS: u64 = 30;

/// The rates endpoint can hang behind slow upstream market feeds.
pub const RATE_FETCH_TIMEOUT_SECS: u64 = 5;

/// Newest-first notification feed cap.
pub const MAX_VISIBLE_NOTIFICATIONS: usize = 5;

/// Watch sessions can run for days; seen/dismissed identity tracking keeps
/// at most this many entries and forgets the oldest first.
pub const MAX_TRACKED_IDENTITIES: usize = 512;

/// Search radius used when looking up routes between two map points.
pub const ROUTE_SEARCH_RADIUS_METERS: u32 = 500;

pub const DEFAULT_SESSION_FILE: &str = ".menager-session.json";
pub const DEFAULT_SOUND_PLAYER: &str = "paplay";

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub session_path: PathBuf,
    pub locationiq_token: Option<String>,
    pub sound_player: String,
}

impl Config {
    pub fn from_env(base_url: String) -> Self {
        let session_path = std::env::var("MENAGER_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));
        let sound_player = std::env::var("MENAGER_SOUND_PLAYER")
            .unwrap_or_else(|_| DEFAULT_SOUND_PLAYER.to_string());

        Config {
            base_url,
            session_path,
            locationiq_token: std::env::var("LOCATIONIQ_TOKEN").ok(),
            sound_player,
        }
    }
}
