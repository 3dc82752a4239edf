use log::{debug, info};

use crate::audio::VisualizationSnapshot;
use crate::sampling::Renderer;

/// Coarse band levels from a frequency buffer, each on a 0.0-1.0 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrequencyBands {
    pub sub_bass: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub presence: f32,
}

impl FrequencyBands {
    /// Split the byte spectrum at 60, 250, 2000 and 8000 Hz.
    pub fn from_snapshot(snapshot: &VisualizationSnapshot, sample_rate: f32) -> Self {
        let spectrum = snapshot.frequency_data();
        let len = spectrum.len();
        if len == 0 {
            return Self::default();
        }

        // Bins cover 0..nyquist
        let bin_width = sample_rate / (len * 2) as f32;
        let bin = |hz: f32| ((hz / bin_width) as usize).min(len);

        let sub_bass_end = bin(60.0);
        let bass_end = bin(250.0);
        let mid_end = bin(2000.0);
        let treble_end = bin(8000.0);

        Self {
            sub_bass: average_range(spectrum, 0, sub_bass_end),
            bass: average_range(spectrum, sub_bass_end, bass_end),
            mid: average_range(spectrum, bass_end, mid_end),
            treble: average_range(spectrum, mid_end, treble_end),
            presence: average_range(spectrum, treble_end, len),
        }
    }
}

fn average_range(data: &[u8], start: usize, end: usize) -> f32 {
    if start >= end || start >= data.len() {
        return 0.0;
    }

    let end = end.min(data.len());
    let sum: u32 = data[start..end].iter().map(|&b| b as u32).sum();
    sum as f32 / ((end - start) as f32 * 255.0)
}

/// Renderer that writes band levels to the log instead of drawing.
pub struct SpectrumLogger {
    sample_rate: f32,
    log_every: u64,
    frames: u64,
    idle_frames: u64,
}

impl SpectrumLogger {
    pub fn new(sample_rate: f32, log_every: u64) -> Self {
        Self {
            sample_rate,
            log_every: log_every.max(1),
            frames: 0,
            idle_frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for SpectrumLogger {
    fn render_frame(&mut self, snapshot: Option<&VisualizationSnapshot>) {
        self.frames += 1;
        let Some(snapshot) = snapshot else {
            self.idle_frames += 1;
            if (self.idle_frames - 1) % self.log_every == 0 {
                debug!("No audio tap connected");
            }
            return;
        };

        if self.frames % self.log_every == 0 {
            let bands = FrequencyBands::from_snapshot(snapshot, self.sample_rate);
            info!(
                "🎵 Frame {}: level={:.2} sub={:.2} bass={:.2} mid={:.2} treble={:.2} presence={:.2}",
                self.frames,
                snapshot.average_level(),
                bands.sub_bass,
                bands.bass,
                bands.mid,
                bands.treble,
                bands.presence
            );
        }
    }
}
