//! HTTP message formats for the song API
//!
//! Every JSON response carries a `status` field: `"success"` or `"error"` for
//! song requests, `"running"` for the index route.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Instrumental style selecting a backing track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Happy,
    Sad,
    Motivational,
}

impl Mood {
    /// All moods, in display order
    pub const ALL: [Mood; 3] = [Mood::Happy, Mood::Sad, Mood::Motivational];

    /// Lowercase key, also the asset file stem
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Motivational => "motivational",
        }
    }

    /// Parse a mood key; anything unrecognized becomes `Happy`.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unknown mood key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mood '{0}'")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happy" => Ok(Mood::Happy),
            "sad" => Ok(Mood::Sad),
            "motivational" => Ok(Mood::Motivational),
            other => Err(UnknownMood(other.to_string())),
        }
    }
}

/// Body of `POST /generate-song`
///
/// `mood` stays a free-form string so an invalid value can fall back to
/// `happy` instead of rejecting the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SongRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub mood: Option<String>,
}

impl SongRequest {
    /// Resolved mood for this request
    pub fn mood(&self) -> Mood {
        self.mood
            .as_deref()
            .map(Mood::parse_or_default)
            .unwrap_or_default()
    }
}

/// Response body for `POST /generate-song`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SongResponse {
    /// The song was written and can be fetched from `song_url`
    Success {
        song_url: String,
        duration_secs: f32,
        mode: String,
        /// True when a fallback (silence or vocals-only) shaped the result
        degraded: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    /// Validation or generation failure
    Error { message: String },
}

impl SongResponse {
    /// Convenience constructor for error responses
    pub fn error(message: impl Into<String>) -> Self {
        SongResponse::Error {
            message: message.into(),
        }
    }
}

/// Response body for `GET /`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexResponse {
    pub status: String,
    pub message: String,
    pub endpoints: Vec<String>,
}
