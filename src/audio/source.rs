use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

/// Something that can feed the analysis stage.
///
/// Nodes are pulled: on every snapshot the tap asks the attached node for the
/// audio it produced up to the context time `now`.
pub trait SourceNode: Send {
    /// Append the mono samples produced since the previous call.
    fn render(&mut self, now: f64, out: &mut Vec<f32>);

    /// Stop producing audio and release owned resources. Must be idempotent.
    fn disconnect(&mut self);
}

/// Tracks how many frames a generated source owes at a given context time.
#[derive(Debug, Clone)]
pub struct RenderCursor {
    sample_rate: f64,
    start: f64,
    rendered: u64,
    max_block: usize,
}

impl RenderCursor {
    pub fn new(sample_rate: f32, start: f64, max_block: usize) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            start,
            rendered: 0,
            max_block,
        }
    }

    /// Frames to render now. Anything older than one block is skipped.
    pub fn frames_due(&mut self, now: f64) -> usize {
        let target = ((now - self.start).max(0.0) * self.sample_rate) as u64;
        let due = target.saturating_sub(self.rendered);
        if due > self.max_block as u64 {
            self.rendered = target - self.max_block as u64;
        }
        let frames = due.min(self.max_block as u64);
        self.rendered += frames;
        frames as usize
    }
}

/// Gain stages shared between a bank and whatever modulates it.
#[derive(Clone, Default)]
pub struct SharedGains(Arc<Mutex<Vec<f32>>>);

impl SharedGains {
    pub fn new(initial: Vec<f32>) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    pub fn set_all(&self, gains: &[f32]) {
        let mut current = self.0.lock();
        current.clear();
        current.extend_from_slice(gains);
    }

    pub fn silence(&self) {
        self.0.lock().iter_mut().for_each(|g| *g = 0.0);
    }

    pub fn snapshot(&self) -> Vec<f32> {
        self.0.lock().clone()
    }
}

#[derive(Debug, Clone)]
struct Oscillator {
    frequency: f64,
    phase: f64,
}

/// Sine oscillators, each through its own gain stage, summed to mono.
pub struct OscillatorBank {
    oscillators: Vec<Oscillator>,
    gains: SharedGains,
    cursor: RenderCursor,
    sample_rate: f64,
    stopped: bool,
}

impl OscillatorBank {
    pub fn new(frequencies: &[f32], gains: SharedGains, cursor: RenderCursor) -> Self {
        let sample_rate = cursor.sample_rate;
        Self {
            oscillators: frequencies
                .iter()
                .map(|&f| Oscillator { frequency: f as f64, phase: 0.0 })
                .collect(),
            gains,
            cursor,
            sample_rate,
            stopped: false,
        }
    }

    pub fn gains(&self) -> &SharedGains {
        &self.gains
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stopping an already stopped bank does nothing.
    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

impl SourceNode for OscillatorBank {
    fn render(&mut self, now: f64, out: &mut Vec<f32>) {
        let frames = self.cursor.frames_due(now);
        if self.stopped || frames == 0 {
            return;
        }

        let gains = self.gains.snapshot();
        let two_pi = std::f64::consts::TAU;
        for _ in 0..frames {
            let mut mixed = 0.0;
            for (osc, &gain) in self.oscillators.iter_mut().zip(gains.iter()) {
                mixed += gain as f64 * osc.phase.sin();
                osc.phase = (osc.phase + two_pi * osc.frequency / self.sample_rate) % two_pi;
            }
            out.push(mixed as f32);
        }
    }

    fn disconnect(&mut self) {
        self.stop();
    }
}

/// Source fed by a capture thread over a channel.
///
/// Dropping the stop sender on disconnect tells the capture side to shut down.
pub struct ChannelSource {
    receiver: Receiver<Vec<f32>>,
    stop: Option<Sender<()>>,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<Vec<f32>>, stop: Sender<()>) -> Self {
        Self {
            receiver,
            stop: Some(stop),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stop.is_some()
    }
}

impl SourceNode for ChannelSource {
    fn render(&mut self, _now: f64, out: &mut Vec<f32>) {
        if self.stop.is_none() {
            return;
        }
        while let Ok(chunk) = self.receiver.try_recv() {
            out.extend_from_slice(&chunk);
        }
    }

    fn disconnect(&mut self) {
        if self.stop.take().is_some() {
            while self.receiver.try_recv().is_ok() {}
        }
    }
}

impl Drop for ChannelSource {
    fn drop(&mut self) {
        self.disconnect();
    }
}
