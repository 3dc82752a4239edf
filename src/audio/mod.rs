pub mod analyser;
pub mod capture;
pub mod context;
pub mod media;
pub mod source;

pub use analyser::Analyser;
pub use capture::{CaptureDevice, CpalCapture, DeniedCapture};
pub use context::{AudioHost, ContextState, ProcessingContext, SoftwareHost, UnavailableHost};
pub use media::{DecodedMedia, MediaElement};
pub use source::{ChannelSource, OscillatorBank, RenderCursor, SharedGains, SourceNode};

use tokio::time::Instant;

/// One pulled pair of byte buffers from the analysis stage.
///
/// Both buffers always have the same length, the analyser's
/// `frequency_bin_count`. A snapshot is only meaningful for the instant it
/// was captured.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationSnapshot {
    frequency_data: Vec<u8>,
    time_data: Vec<u8>,
    captured_at: Instant,
}

impl VisualizationSnapshot {
    /// Zeroed snapshot of the given length, for use with `AudioTap::pull_snapshot_into`.
    pub fn with_length(buffer_length: usize) -> Self {
        Self {
            frequency_data: vec![0; buffer_length],
            time_data: vec![128; buffer_length],
            captured_at: Instant::now(),
        }
    }

    pub(crate) fn buffers_mut(&mut self, buffer_length: usize) -> (&mut [u8], &mut [u8]) {
        self.frequency_data.resize(buffer_length, 0);
        self.time_data.resize(buffer_length, 128);
        self.captured_at = Instant::now();
        (&mut self.frequency_data, &mut self.time_data)
    }

    pub fn frequency_data(&self) -> &[u8] {
        &self.frequency_data
    }

    pub fn time_data(&self) -> &[u8] {
        &self.time_data
    }

    pub fn buffer_length(&self) -> usize {
        self.frequency_data.len()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Mean of the frequency buffer on a 0.0-1.0 scale.
    pub fn average_level(&self) -> f32 {
        if self.frequency_data.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.frequency_data.iter().map(|&b| b as u32).sum();
        sum as f32 / (self.frequency_data.len() as f32 * 255.0)
    }
}
