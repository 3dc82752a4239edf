pub mod session;

pub use session::{extract_video_id, PlaybackError, PlayerSession, PlayerStatus};

use anyhow::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Discrete playback state reported by the embedded player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Map the provider's numeric state. Unknown codes read as `Unstarted`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PlayerState::Ended,
            1 => PlayerState::Playing,
            2 => PlayerState::Paused,
            3 => PlayerState::Buffering,
            5 => PlayerState::Cued,
            _ => PlayerState::Unstarted,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            PlayerState::Unstarted => -1,
            PlayerState::Ended => 0,
            PlayerState::Playing => 1,
            PlayerState::Paused => 2,
            PlayerState::Buffering => 3,
            PlayerState::Cued => 5,
        }
    }
}

/// Read-only control surface of the embedded player.
///
/// Every read can fail, for example when the player was destroyed under us.
pub trait PlayerHandle: Send + Sync {
    /// Playback position in seconds.
    fn current_time(&self) -> Result<f64>;

    /// Volume in 0..=100.
    fn volume(&self) -> Result<u8>;

    fn player_state(&self) -> Result<PlayerState>;
}

struct Transport {
    state: PlayerState,
    position: f64,
    playing_since: Option<Instant>,
    volume: u8,
}

impl Transport {
    fn position(&self) -> f64 {
        self.position + self.playing_since.map_or(0.0, |since| since.elapsed().as_secs_f64())
    }
}

/// Clock-driven stand-in for an embedded player.
pub struct SimulatedPlayer {
    transport: Mutex<Transport>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            transport: Mutex::new(Transport {
                state: PlayerState::Cued,
                position: 0.0,
                playing_since: None,
                volume: 100,
            }),
        }
    }

    pub fn play(&self) {
        let mut t = self.transport.lock();
        if t.state != PlayerState::Playing {
            t.state = PlayerState::Playing;
            t.playing_since = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let mut t = self.transport.lock();
        if t.state == PlayerState::Playing {
            t.position = t.position();
            t.playing_since = None;
            t.state = PlayerState::Paused;
        }
    }

    pub fn seek_to(&self, seconds: f64) {
        let mut t = self.transport.lock();
        t.position = seconds.max(0.0);
        if t.playing_since.is_some() {
            t.playing_since = Some(Instant::now());
        }
    }

    pub fn set_volume(&self, volume: u8) {
        self.transport.lock().volume = volume.min(100);
    }

    pub fn end(&self) {
        let mut t = self.transport.lock();
        t.position = t.position();
        t.playing_since = None;
        t.state = PlayerState::Ended;
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerHandle for SimulatedPlayer {
    fn current_time(&self) -> Result<f64> {
        Ok(self.transport.lock().position())
    }

    fn volume(&self) -> Result<u8> {
        Ok(self.transport.lock().volume)
    }

    fn player_state(&self) -> Result<PlayerState> {
        Ok(self.transport.lock().state)
    }
}
