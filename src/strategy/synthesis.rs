use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{AcquireRequest, AcquisitionStrategy, StrategyKind};
use crate::audio::{OscillatorBank, ProcessingContext, RenderCursor, SharedGains, SourceNode};
use crate::config::SynthesisConfig;
use crate::error::{Result, TapError};
use crate::player::{PlayerHandle, PlayerState};

/// Per-oscillator gains for the control-surface bank.
///
/// Gains follow a deterministic wobble seeded by the playback position and
/// the oscillator index, scaled by volume (0..=100). Oscillator `i` is bounded
/// by `0.1 + 0.05 * i`. Anything other than `Playing` yields silence.
pub fn control_surface_gains(position: f64, volume: u8, state: PlayerState, out: &mut [f32]) {
    if state != PlayerState::Playing {
        out.iter_mut().for_each(|g| *g = 0.0);
        return;
    }

    let volume = volume.min(100) as f64 / 100.0;
    for (index, gain) in out.iter_mut().enumerate() {
        let i = index as f64;
        let t = position * (0.5 + i * 0.3);
        let first = t.sin() * (t * 1.3).cos();
        let second = (t * 2.1).sin() * (t * 0.7).cos();
        let combined = (first + second * 0.5) / 1.5;

        *gain = (combined.abs() * volume * (0.1 + i * 0.05)) as f32;
    }
}

/// Pseudo-audio correlated with the player's public control surface.
///
/// This is not the soundtrack: an oscillator bank whose gains move with the
/// playback position, so a paused video gives a still visualizer.
pub struct ControlSurfaceSynthesis {
    config: SynthesisConfig,
}

impl ControlSurfaceSynthesis {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    /// Build the bank and start the gain timer. Must run inside a tokio runtime.
    pub fn start(
        &self,
        context: &ProcessingContext,
        player: Arc<dyn PlayerHandle>,
        max_block: usize,
    ) -> SynthesisSource {
        let gains = SharedGains::new(vec![0.0; self.config.frequencies.len()]);
        let mut scratch = vec![0.0; self.config.frequencies.len()];
        update_gains(player.as_ref(), &gains, &mut scratch);

        let bank = OscillatorBank::new(
            &self.config.frequencies,
            gains.clone(),
            RenderCursor::new(context.sample_rate(), context.current_time(), max_block),
        );

        let period = Duration::from_millis(self.config.update_interval_ms);
        let timer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                update_gains(player.as_ref(), &gains, &mut scratch);
            }
        });

        info!(
            "Control-surface synthesis running: {} oscillators, {}ms updates",
            self.config.frequencies.len(),
            self.config.update_interval_ms
        );
        SynthesisSource { bank, timer: Some(timer) }
    }
}

fn update_gains(player: &dyn PlayerHandle, gains: &SharedGains, scratch: &mut [f32]) {
    let reading = player
        .current_time()
        .and_then(|position| Ok((position, player.volume()?, player.player_state()?)));

    match reading {
        Ok((position, volume, state)) => {
            control_surface_gains(position, volume, state, scratch);
            gains.set_all(scratch);
        }
        // Keep the previous gains until the player answers again
        Err(e) => warn!("Player API update failed: {}", e),
    }
}

#[async_trait]
impl AcquisitionStrategy for ControlSurfaceSynthesis {
    fn label(&self) -> &str {
        StrategyKind::ControlSurface.label()
    }

    fn requires_player(&self) -> bool {
        true
    }

    async fn acquire(&self, request: AcquireRequest<'_>) -> Result<Box<dyn SourceNode>> {
        let player = request
            .player
            .ok_or_else(|| TapError::unavailable("no player handle"))?;

        // Probe once so a dead player fails here instead of going silent later
        player
            .player_state()
            .map_err(|e| TapError::unavailable(format!("player API not responding: {}", e)))?;

        Ok(Box::new(self.start(request.context, Arc::clone(player), request.max_block)))
    }
}

/// Oscillator bank plus the timer that modulates it.
pub struct SynthesisSource {
    bank: OscillatorBank,
    timer: Option<JoinHandle<()>>,
}

impl SynthesisSource {
    pub fn gains(&self) -> &SharedGains {
        self.bank.gains()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some() && !self.bank.is_stopped()
    }
}

impl SourceNode for SynthesisSource {
    fn render(&mut self, now: f64, out: &mut Vec<f32>) {
        self.bank.render(now, out);
    }

    fn disconnect(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            debug!("Control-surface timer stopped");
        }
        self.bank.stop();
    }
}

impl Drop for SynthesisSource {
    fn drop(&mut self) {
        self.disconnect();
    }
}
