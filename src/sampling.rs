use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::audio::VisualizationSnapshot;
use crate::config::MAX_FRAMES_PER_SECOND;
use crate::tap::AudioTap;

/// Consumer of one snapshot per frame. `None` means nothing is connected.
pub trait Renderer: Send {
    fn render_frame(&mut self, snapshot: Option<&VisualizationSnapshot>);
}

type SharedRenderers = Arc<Mutex<Vec<Box<dyn Renderer>>>>;

/// Frame-rate task that pulls snapshots from the tap and fans them out.
///
/// Every `start` spawns a new task with its own snapshot buffer, and `stop`
/// bumps a generation counter before aborting, so a tick already in flight
/// cannot deliver after the loop was stopped.
pub struct SamplingLoop {
    tap: AudioTap,
    period: Duration,
    renderers: SharedRenderers,
    generation: Arc<AtomicU64>,
    frames: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl SamplingLoop {
    /// `frames_per_second` is clamped to `1..=MAX_FRAMES_PER_SECOND`.
    pub fn new(tap: AudioTap, frames_per_second: u32) -> Self {
        let fps = frames_per_second.clamp(1, MAX_FRAMES_PER_SECOND);
        if fps != frames_per_second {
            warn!("Sampling rate {} fps out of range, using {}", frames_per_second, fps);
        }
        Self {
            tap,
            period: Duration::from_micros(1_000_000 / fps as u64),
            renderers: Arc::new(Mutex::new(Vec::new())),
            generation: Arc::new(AtomicU64::new(0)),
            frames: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    pub fn add_renderer(&self, renderer: Box<dyn Renderer>) {
        self.renderers.lock().push(renderer);
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Frames delivered to renderers since creation.
    pub fn frames_delivered(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    /// Begin sampling. Must run inside a tokio runtime; a no-op when active.
    pub fn start(&mut self) {
        if self.is_active() {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let frames = Arc::clone(&self.frames);
        let renderers = Arc::clone(&self.renderers);
        let tap = self.tap.clone();
        let period = self.period;

        self.task = Some(tokio::spawn(async move {
            let mut snapshot = VisualizationSnapshot::with_length(tap.frequency_bin_count());
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if current.load(Ordering::SeqCst) != generation {
                    break;
                }

                let ready = tap.pull_snapshot_into(&mut snapshot);
                let frame = ready.then_some(&snapshot);
                for renderer in renderers.lock().iter_mut() {
                    renderer.render_frame(frame);
                }
                frames.fetch_add(1, Ordering::Relaxed);
            }
            debug!("Sampling task {} exited", generation);
        }));

        info!("▶️ Sampling started at {:.1} fps", 1.0 / self.period.as_secs_f64());
    }

    /// Cancel the frame task. Safe to call when already stopped.
    pub fn stop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            info!("⏸️ Sampling stopped");
        }
    }

    /// Flip between running and stopped; returns whether it is now active.
    pub fn toggle(&mut self) -> bool {
        if self.is_active() {
            self.stop();
        } else {
            self.start();
        }
        self.is_active()
    }
}

impl Drop for SamplingLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
