//! Audio-source acquisition for a visualizer that follows an embedded video player.
//!
//! An [`AcquisitionOrchestrator`] walks an ordered list of strategies, from
//! tapping the player's media element down to a synthetic demo tone, and
//! wires the first one that works into an [`AudioTap`]. A [`SamplingLoop`]
//! then pulls [`VisualizationSnapshot`]s from the tap once per frame.

pub mod audio;
pub mod config;
pub mod document;
pub mod error;
pub mod orchestrator;
pub mod player;
pub mod render;
pub mod sampling;
pub mod strategy;
pub mod tap;

pub use audio::VisualizationSnapshot;
pub use config::{ConfigError, TapConfig};
pub use error::{Result, TapError};
pub use orchestrator::{
    AcquisitionOrchestrator, AttemptOutcome, AttemptRecord, ConnectOutcome, ConnectionState, SessionStatus,
};
pub use player::{PlaybackError, PlayerHandle, PlayerSession, PlayerState, PlayerStatus, SimulatedPlayer};
pub use sampling::{Renderer, SamplingLoop};
pub use strategy::{AcquisitionEnvironment, AcquisitionStrategy, StrategyKind, StrategyRegistry};
pub use tap::AudioTap;
