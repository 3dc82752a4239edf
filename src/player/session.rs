use log::{info, warn};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::PlayerState;

/// Length of a provider video id.
const VIDEO_ID_LEN: usize = 11;

/// Errors reported by or about the player itself. These are never retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("The request contains an invalid parameter value")]
    InvalidParameter,

    #[error("The requested content cannot be played in an HTML5 player")]
    Html5Unsupported,

    #[error("The video requested was not found")]
    NotFound,

    #[error("The owner of the requested video does not allow it to be played in embedded players")]
    EmbedNotAllowed(i32),

    #[error("An unknown error occurred (code {0})")]
    Unknown(i32),
}

impl PlaybackError {
    /// Map the player's opaque error code.
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => PlaybackError::InvalidParameter,
            5 => PlaybackError::Html5Unsupported,
            100 => PlaybackError::NotFound,
            101 | 150 => PlaybackError::EmbedNotAllowed(code),
            other => PlaybackError::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayerStatus {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Error,
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
            .expect("video id pattern is valid")
    })
}

/// Pull the 11-character video id out of any of the usual URL shapes.
pub fn extract_video_id(url: &str) -> Option<String> {
    let captures = video_id_pattern().captures(url.trim())?;
    let id = captures.get(2)?.as_str();
    (id.len() == VIDEO_ID_LEN).then(|| id.to_string())
}

/// Lifecycle of one loaded video as seen through player callbacks.
#[derive(Debug)]
pub struct PlayerSession {
    status: PlayerStatus,
    video_id: Option<String>,
    last_error: Option<PlaybackError>,
}

impl PlayerSession {
    pub fn new() -> Self {
        Self {
            status: PlayerStatus::Idle,
            video_id: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn load_video(&mut self, url: &str) -> Result<&str, PlaybackError> {
        let Some(id) = extract_video_id(url) else {
            let err = PlaybackError::InvalidUrl(url.to_string());
            self.last_error = Some(err.clone());
            return Err(err);
        };

        info!("Loading video {}", id);
        self.status = PlayerStatus::Loading;
        self.last_error = None;
        Ok(self.video_id.insert(id).as_str())
    }

    pub fn on_ready(&mut self) {
        self.status = PlayerStatus::Ready;
        self.last_error = None;
    }

    pub fn on_state_change(&mut self, state: PlayerState) {
        self.status = match state {
            PlayerState::Playing => PlayerStatus::Playing,
            PlayerState::Paused => PlayerStatus::Paused,
            PlayerState::Ended => PlayerStatus::Ready,
            PlayerState::Buffering => PlayerStatus::Loading,
            PlayerState::Unstarted | PlayerState::Cued => self.status,
        };
    }

    pub fn on_error(&mut self, code: i32) -> PlaybackError {
        let err = PlaybackError::from_code(code);
        warn!("Player error {}: {}", code, err);
        self.status = PlayerStatus::Error;
        self.last_error = Some(err.clone());
        err
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PlayerSession {
    fn default() -> Self {
        Self::new()
    }
}
