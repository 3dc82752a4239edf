use anyhow::Result;
use log::info;
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::context::ProcessingContext;
use super::source::{RenderCursor, SourceNode};
use crate::error::TapError;

/// A playable media element that can be routed into the analysis stage.
pub trait MediaElement: Send + Sync {
    fn src(&self) -> String;

    fn current_src(&self) -> String {
        self.src()
    }

    /// Create a source node carrying this element's audio.
    ///
    /// An element feeds at most one node at a time; a second tap fails with
    /// `SourceUnavailable` until the first node is disconnected.
    fn create_source(
        &self,
        context: &ProcessingContext,
        max_block: usize,
    ) -> crate::error::Result<Box<dyn SourceNode>>;
}

/// Media element backed by fully decoded mono audio, played on a loop.
pub struct DecodedMedia {
    src: String,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    tapped: Arc<AtomicBool>,
}

impl DecodedMedia {
    pub fn from_samples(src: impl Into<String>, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            src: src.into(),
            samples: Arc::new(samples),
            sample_rate,
            tapped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Decode an audio file and mix it down to mono.
    pub fn open<P: AsRef<Path>>(path: P, src: impl Into<String>) -> Result<Self> {
        let file = BufReader::new(File::open(&path)?);
        let source = Decoder::new(file)?;

        let sample_rate = source.sample_rate();
        let channels = source.channels().max(1) as usize;
        let interleaved: Vec<f32> = source.convert_samples::<f32>().collect();

        let samples: Vec<f32> = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        info!(
            "Decoded media {:?} ({}Hz, {} channels, {} samples)",
            path.as_ref(),
            sample_rate,
            channels,
            samples.len()
        );
        Ok(Self::from_samples(src, samples, sample_rate))
    }

    pub fn is_tapped(&self) -> bool {
        self.tapped.load(Ordering::SeqCst)
    }
}

impl MediaElement for DecodedMedia {
    fn src(&self) -> String {
        self.src.clone()
    }

    fn create_source(
        &self,
        context: &ProcessingContext,
        max_block: usize,
    ) -> crate::error::Result<Box<dyn SourceNode>> {
        if self.samples.is_empty() {
            return Err(TapError::unavailable(format!("media {} has no audio", self.src)));
        }
        if self.tapped.swap(true, Ordering::SeqCst) {
            return Err(TapError::unavailable(format!(
                "media {} is already connected to another source node",
                self.src
            )));
        }

        Ok(Box::new(MediaTap {
            samples: Arc::clone(&self.samples),
            step: self.sample_rate as f64 / context.sample_rate() as f64,
            position: 0.0,
            cursor: RenderCursor::new(context.sample_rate(), context.current_time(), max_block),
            tapped: Arc::clone(&self.tapped),
            connected: true,
        }))
    }
}

struct MediaTap {
    samples: Arc<Vec<f32>>,
    step: f64,
    position: f64,
    cursor: RenderCursor,
    tapped: Arc<AtomicBool>,
    connected: bool,
}

impl SourceNode for MediaTap {
    fn render(&mut self, now: f64, out: &mut Vec<f32>) {
        let frames = self.cursor.frames_due(now);
        if !self.connected {
            return;
        }

        let len = self.samples.len() as f64;
        for _ in 0..frames {
            out.push(self.samples[self.position as usize]);
            self.position = (self.position + self.step) % len;
        }
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.tapped.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for MediaTap {
    fn drop(&mut self) {
        self.disconnect();
    }
}
