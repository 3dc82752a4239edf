use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::AnalyserConfig;
use crate::error::{Result, TapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

struct ContextClock {
    state: ContextState,
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl ContextClock {
    fn elapsed(&self) -> Duration {
        self.accumulated + self.running_since.map_or(Duration::ZERO, |since| since.elapsed())
    }
}

/// Handle to the audio-processing context.
///
/// Cloning shares the same context. The context clock only advances while the
/// context is running, so sources rendering against `current_time` go silent
/// while it is suspended.
#[derive(Clone)]
pub struct ProcessingContext {
    sample_rate: f32,
    clock: Arc<Mutex<ContextClock>>,
}

impl ProcessingContext {
    pub fn new(sample_rate: f32, state: ContextState) -> Self {
        let running_since = (state == ContextState::Running).then(Instant::now);
        Self {
            sample_rate,
            clock: Arc::new(Mutex::new(ContextClock {
                state,
                accumulated: Duration::ZERO,
                running_since,
            })),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.clock.lock().state
    }

    /// Seconds of running time since creation.
    pub fn current_time(&self) -> f64 {
        self.clock.lock().elapsed().as_secs_f64()
    }

    pub async fn resume(&self) -> Result<()> {
        {
            let mut clock = self.clock.lock();
            match clock.state {
                ContextState::Running => return Ok(()),
                ContextState::Closed => {
                    return Err(TapError::UnsupportedEnvironment(
                        "cannot resume a closed processing context".to_string(),
                    ))
                }
                ContextState::Suspended => {
                    clock.state = ContextState::Running;
                    clock.running_since = Some(Instant::now());
                }
            }
        }
        debug!("Processing context resumed");
        tokio::task::yield_now().await;
        Ok(())
    }

    pub fn suspend(&self) {
        let mut clock = self.clock.lock();
        if clock.state == ContextState::Running {
            clock.accumulated = clock.elapsed();
            clock.running_since = None;
            clock.state = ContextState::Suspended;
        }
    }

    /// Close the context. Closing twice is a no-op.
    pub fn close(&self) {
        let mut clock = self.clock.lock();
        if clock.state != ContextState::Closed {
            clock.accumulated = clock.elapsed();
            clock.running_since = None;
            clock.state = ContextState::Closed;
        }
    }
}

/// Platform provider of audio-processing contexts.
pub trait AudioHost: Send + Sync {
    fn create_context(&self, config: &AnalyserConfig) -> Result<ProcessingContext>;

    fn host_name(&self) -> &'static str;
}

/// In-process host; contexts are rendered in software at the configured rate.
pub struct SoftwareHost {
    start_suspended: bool,
}

impl SoftwareHost {
    /// Contexts start suspended and must be resumed before audio flows,
    /// like a host with an autoplay policy.
    pub fn new() -> Self {
        Self { start_suspended: true }
    }

    pub fn running() -> Self {
        Self { start_suspended: false }
    }
}

impl Default for SoftwareHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHost for SoftwareHost {
    fn create_context(&self, config: &AnalyserConfig) -> Result<ProcessingContext> {
        let state = if self.start_suspended {
            ContextState::Suspended
        } else {
            ContextState::Running
        };
        info!("Creating software processing context at {}Hz ({:?})", config.sample_rate, state);
        Ok(ProcessingContext::new(config.sample_rate, state))
    }

    fn host_name(&self) -> &'static str {
        "software"
    }
}

/// Host with no processing primitive at all.
pub struct UnavailableHost;

impl AudioHost for UnavailableHost {
    fn create_context(&self, _config: &AnalyserConfig) -> Result<ProcessingContext> {
        warn!("Audio processing is not supported on this host");
        Err(TapError::UnsupportedEnvironment(
            "no audio-processing primitive available".to_string(),
        ))
    }

    fn host_name(&self) -> &'static str {
        "unavailable"
    }
}
