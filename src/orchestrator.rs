use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::AudioHost;
use crate::config::TapConfig;
use crate::error::{Result, TapError};
use crate::player::{PlayerHandle, PlayerStatus};
use crate::strategy::{AcquireRequest, AcquisitionEnvironment, StrategyRegistry};
use crate::tap::AudioTap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected(String),
    Failed(String),
}

/// What the UI shows: the player lifecycle next to the audio connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub player: PlayerStatus,
    pub connection: ConnectionState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Skipped(String),
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub strategy: String,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for AttemptRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Succeeded => write!(f, "{}: connected", self.strategy),
            AttemptOutcome::Skipped(reason) => write!(f, "{}: skipped ({})", self.strategy, reason),
            AttemptOutcome::Failed(reason) => write!(f, "{}: {}", self.strategy, reason),
            AttemptOutcome::TimedOut => write!(f, "{}: timed out", self.strategy),
        }
    }
}

/// Result of a successful `connect`.
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub method: String,
    pub attempts: Vec<AttemptRecord>,
}

/// Walks the strategy registry until one of them feeds the tap.
pub struct AcquisitionOrchestrator {
    tap: AudioTap,
    registry: StrategyRegistry,
    attempt_timeout: Option<Duration>,
    state: ConnectionState,
}

impl AcquisitionOrchestrator {
    pub fn new(tap: AudioTap, registry: StrategyRegistry, attempt_timeout: Option<Duration>) -> Self {
        Self {
            tap,
            registry,
            attempt_timeout,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn from_config(config: &TapConfig, host: Arc<dyn AudioHost>, env: &AcquisitionEnvironment) -> Self {
        let tap = AudioTap::new(host, config.analyser.clone());
        let registry = StrategyRegistry::from_config(config, env);
        info!("🔌 Acquisition order: {}", registry.labels().join(" → "));
        Self::new(
            tap,
            registry,
            config.acquisition.attempt_timeout_ms.map(Duration::from_millis),
        )
    }

    pub fn tap(&self) -> &AudioTap {
        &self.tap
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn session_status(&self, player: PlayerStatus) -> SessionStatus {
        SessionStatus {
            player,
            connection: self.state.clone(),
        }
    }

    /// Tear down whatever is connected and try every strategy in order.
    ///
    /// Only an unusable environment is returned early; individual strategy
    /// failures are logged and the next strategy is tried.
    pub async fn connect(&mut self, player: Option<Arc<dyn PlayerHandle>>) -> Result<ConnectOutcome> {
        self.tap.teardown();
        self.state = ConnectionState::Connecting;

        let context = match self.tap.ensure_context() {
            Ok(context) => context,
            Err(e) => return Err(fail(&mut self.state, e)),
        };
        if let Err(e) = self.tap.resume_if_suspended().await {
            return Err(fail(&mut self.state, e));
        }

        let request = AcquireRequest {
            context: &context,
            player: player.as_ref(),
            max_block: self.tap.config().fft_size,
        };

        let mut attempts = Vec::with_capacity(self.registry.len());
        for strategy in self.registry.iter() {
            let label = strategy.label().to_string();

            if strategy.requires_player() && request.player.is_none() {
                info!("Skipping {}: no player available", label);
                attempts.push(AttemptRecord {
                    strategy: label,
                    outcome: AttemptOutcome::Skipped("no player available".to_string()),
                });
                continue;
            }

            info!("Trying {}...", label);
            let result = match self.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, strategy.acquire(request)).await {
                    Ok(result) => Some(result),
                    Err(_) => None,
                },
                None => Some(strategy.acquire(request).await),
            };

            match result {
                Some(Ok(node)) => {
                    if let Err(e) = self.tap.attach_source(node, label.clone()) {
                        return Err(fail(&mut self.state, e));
                    }
                    attempts.push(AttemptRecord { strategy: label.clone(), outcome: AttemptOutcome::Succeeded });
                    self.state = ConnectionState::Connected(label.clone());
                    return Ok(ConnectOutcome { method: label, attempts });
                }
                Some(Err(e)) if e.is_fatal() => return Err(fail(&mut self.state, e)),
                Some(Err(e)) => {
                    warn!("{} failed: {}", label, e);
                    attempts.push(AttemptRecord {
                        strategy: label,
                        outcome: AttemptOutcome::Failed(e.to_string()),
                    });
                }
                None => {
                    warn!("{} timed out", label);
                    attempts.push(AttemptRecord { strategy: label, outcome: AttemptOutcome::TimedOut });
                }
            }
        }

        let summary: Vec<String> = attempts.iter().map(|a| a.to_string()).collect();
        Err(fail(
            &mut self.state,
            TapError::unavailable(format!(
                "all audio connection methods failed [{}]",
                summary.join("; ")
            )),
        ))
    }

    /// Disconnect and close everything. Safe to call at any time.
    pub fn teardown(&mut self) {
        self.tap.teardown();
        self.state = ConnectionState::Disconnected;
    }
}

fn fail(state: &mut ConnectionState, err: TapError) -> TapError {
    error!("❌ Audio connection failed: {}", err);
    *state = ConnectionState::Failed(err.to_string());
    err
}
