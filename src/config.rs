//! Environment-driven configuration.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Weekday;
use chrono_tz::Tz;

use crate::types::{ChannelId, RoleId};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(String),

    #[error("{var} has invalid value '{value}'")]
    Invalid { var: String, value: String },
}

/// One recurring weekly event in the configured time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySlot {
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
}

impl WeeklySlot {
    pub const fn new(weekday: Weekday, hour: u32, minute: u32) -> Self {
        Self {
            weekday,
            hour,
            minute,
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ContestConfig {
    /// Bot credential token
    pub token: String,
    /// Roles pinged by the weekly announcement
    pub reporter_role_id: RoleId,
    pub reporter_bordeaux_role_id: RoleId,
    /// Channel where photos are submitted (voting threads open under it)
    pub photo_channel_id: ChannelId,
    /// Channel where results and the monthly contest are announced
    pub results_channel_id: ChannelId,
    /// Reaction used to vote in weekly threads
    pub vote_emoji: String,
    pub monthly_enabled: bool,
    pub monthly_vote_duration: chrono::Duration,
    pub monthly_vote_emoji: String,
    /// IANA time zone all weekly slots are interpreted in
    pub timezone: Tz,
    pub announce: WeeklySlot,
    pub voting_open: WeeklySlot,
    pub voting_close: WeeklySlot,
    /// Run the whole cycle back-to-back instead of on the weekly cadence
    pub test_mode: bool,
    pub test_wait: Duration,
    pub winners_file: PathBuf,
    pub monthly_file: PathBuf,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            reporter_role_id: 0,
            reporter_bordeaux_role_id: 0,
            photo_channel_id: 0,
            results_channel_id: 0,
            vote_emoji: "📸".to_string(),
            monthly_enabled: true,
            monthly_vote_duration: chrono::Duration::minutes(2880),
            monthly_vote_emoji: "🏆".to_string(),
            timezone: chrono_tz::Europe::Paris,
            announce: WeeklySlot::new(Weekday::Mon, 9, 0),
            voting_open: WeeklySlot::new(Weekday::Sat, 0, 0),
            voting_close: WeeklySlot::new(Weekday::Sun, 18, 0),
            test_mode: false,
            test_wait: Duration::from_secs(30),
            winners_file: PathBuf::from("winners.json"),
            monthly_file: PathBuf::from("monthly.json"),
        }
    }
}

impl ContestConfig {
    /// Load configuration from environment variables. The token and the
    /// four ids are required; everything else has production defaults.
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            token: required("DISCORD_TOKEN")?,
            reporter_role_id: required_parsed("REPORTER_ROLE_ID")?,
            reporter_bordeaux_role_id: required_parsed("REPORTER_BORDEAUX_ROLE_ID")?,
            photo_channel_id: required_parsed("PHOTO_CHANNEL_ID")?,
            results_channel_id: required_parsed("RESULTS_CHANNEL_ID")?,
            vote_emoji: opt("VOTE_EMOJI").unwrap_or(defaults.vote_emoji),
            monthly_enabled: flag("MONTHLY_ENABLED", defaults.monthly_enabled),
            monthly_vote_duration: chrono::Duration::minutes(parsed_or(
                "MONTHLY_VOTE_DURATION_MIN",
                defaults.monthly_vote_duration.num_minutes(),
            )?),
            monthly_vote_emoji: opt("MONTHLY_VOTE_EMOJI").unwrap_or(defaults.monthly_vote_emoji),
            timezone: parsed_or("CONTEST_TIMEZONE", defaults.timezone)?,
            announce: slot("ANNOUNCE", defaults.announce)?,
            voting_open: slot("VOTING_OPEN", defaults.voting_open)?,
            voting_close: slot("VOTING_CLOSE", defaults.voting_close)?,
            test_mode: flag("TEST_MODE", false),
            test_wait: Duration::from_secs(parsed_or(
                "TEST_WAIT_SECS",
                defaults.test_wait.as_secs(),
            )?),
            winners_file: opt("WINNERS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.winners_file),
            monthly_file: opt("MONTHLY_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.monthly_file),
        })
    }
}

/// Trimmed, non-empty environment value
fn opt(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required(var: &str) -> ConfigResult<String> {
    opt(var).ok_or_else(|| ConfigError::Missing(var.to_string()))
}

fn required_parsed<T: std::str::FromStr>(var: &str) -> ConfigResult<T> {
    let raw = required(var)?;
    raw.parse().map_err(|_| ConfigError::Invalid {
        var: var.to_string(),
        value: raw,
    })
}

/// Parse an optional value, falling back to the default when unset but
/// refusing a value that is set and malformed.
fn parsed_or<T: std::str::FromStr>(var: &str, default: T) -> ConfigResult<T> {
    match opt(var) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
        }),
    }
}

fn flag(var: &str, default: bool) -> bool {
    match opt(var) {
        None => default,
        Some(v) => v != "0" && v.to_lowercase() != "false",
    }
}

fn slot(prefix: &str, default: WeeklySlot) -> ConfigResult<WeeklySlot> {
    let weekday = parsed_or(&format!("{prefix}_WEEKDAY"), default.weekday)?;
    let hour: u32 = parsed_or(&format!("{prefix}_HOUR"), default.hour)?;
    let minute: u32 = parsed_or(&format!("{prefix}_MINUTE"), default.minute)?;

    if hour > 23 {
        return Err(ConfigError::Invalid {
            var: format!("{prefix}_HOUR"),
            value: hour.to_string(),
        });
    }
    if minute > 59 {
        return Err(ConfigError::Invalid {
            var: format!("{prefix}_MINUTE"),
            value: minute.to_string(),
        });
    }

    Ok(WeeklySlot {
        weekday,
        hour,
        minute,
    })
}
