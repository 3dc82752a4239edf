use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;

use crate::config::{AnalyserConfig, ConfigError};

/// Transform stage exposing byte-scaled frequency and time-domain buffers.
///
/// Samples are pushed in by whatever source is attached; the analyser keeps
/// the most recent `fft_size` of them in a ring. Frequency data is computed on
/// demand with per-bin temporal smoothing, so two reads in a row without new
/// input still converge towards the current spectrum.
pub struct Analyser {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,

    history: Vec<f32>,
    write_pos: usize,

    smoothed: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Analyser {
    /// Fails when `config` does not pass [`AnalyserConfig::validate`].
    pub fn new(config: &AnalyserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fft_size = config.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        Ok(Self {
            fft_size,
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            fft,
            window: Self::blackman_window(fft_size),
            history: vec![0.0; fft_size],
            write_pos: 0,
            smoothed: vec![0.0; fft_size / 2],
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        })
    }

    fn blackman_window(size: usize) -> Vec<f32> {
        let (a0, a1, a2) = (0.42, 0.5, 0.08);
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
            })
            .collect()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn push_samples(&mut self, samples: &[f32]) {
        let start = samples.len().saturating_sub(self.fft_size);
        for &sample in &samples[start..] {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// Oldest-first view of the ring.
    fn chronological(&self) -> impl Iterator<Item = f32> + '_ {
        self.history[self.write_pos..]
            .iter()
            .chain(self.history[..self.write_pos].iter())
            .copied()
    }

    fn update_spectrum(&mut self) {
        let n = self.fft_size;
        for i in 0..n {
            let sample = self.history[(self.write_pos + i) % n];
            self.buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (bin, value) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[bin].norm() * scale;
            *value = tau * *value + (1.0 - tau) * magnitude;
        }
    }

    /// Fill `out` with smoothed magnitudes mapped from the decibel range onto 0..=255.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.update_spectrum();

        let range = self.max_decibels - self.min_decibels;
        for (byte, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            *byte = if magnitude <= 0.0 {
                0
            } else {
                let db = 20.0 * magnitude.log10();
                (255.0 * (db - self.min_decibels) / range).clamp(0.0, 255.0) as u8
            };
        }
    }

    /// Fill `out` with the newest `out.len()` samples, oldest first, as
    /// `128 * (1 + x)` bytes. A buffer longer than `fft_size` keeps its tail.
    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        let skip = self.fft_size.saturating_sub(out.len());
        for (byte, sample) in out.iter_mut().zip(self.chronological().skip(skip)) {
            *byte = (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8;
        }
    }

    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|s| *s = 0.0);
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyser(fft_size: usize, smoothing: f32) -> Analyser {
        Analyser::new(&AnalyserConfig {
            fft_size,
            smoothing,
            ..AnalyserConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_rejects_unusable_fft_size() {
        for fft_size in [0, 1000, 16] {
            let config = AnalyserConfig { fft_size, ..AnalyserConfig::default() };
            assert!(matches!(Analyser::new(&config), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_silence_is_flat() {
        let mut analyser = analyser(256, 0.0);
        let mut freq = vec![255u8; 128];
        let mut time = vec![0u8; 128];

        analyser.byte_frequency_data(&mut freq);
        analyser.byte_time_domain_data(&mut time);

        assert!(freq.iter().all(|&b| b == 0));
        assert!(time.iter().all(|&b| b == 128));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let fft_size = 1024;
        let sample_rate = 44100.0;
        let mut analyser = analyser(fft_size, 0.0);

        // Exactly on bin 40
        let frequency = 40.0 * sample_rate / fft_size as f32;
        let samples: Vec<f32> = (0..fft_size)
            .map(|n| (2.0 * std::f32::consts::PI * frequency * n as f32 / sample_rate).sin() * 0.5)
            .collect();
        analyser.push_samples(&samples);

        let mut freq = vec![0u8; fft_size / 2];
        analyser.byte_frequency_data(&mut freq);

        let peak = freq
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert!((39..=41).contains(&peak), "peak at bin {}", peak);
        assert!(freq[peak] > 200);
        assert!(freq[400] < freq[peak] / 2);
    }

    #[test]
    fn test_smoothing_decays_gradually() {
        let mut analyser = analyser(256, 0.85);
        let tone: Vec<f32> = (0..256).map(|n| (n as f32 * 0.3).sin()).collect();
        analyser.push_samples(&tone);

        let mut first = vec![0u8; 128];
        analyser.byte_frequency_data(&mut first);

        analyser.push_samples(&vec![0.0; 256]);
        let mut second = vec![0u8; 128];
        analyser.byte_frequency_data(&mut second);

        let first_peak = *first.iter().max().unwrap();
        let second_peak = *second.iter().max().unwrap();
        assert!(second_peak > 0, "smoothing should carry energy over");
        assert!(second_peak <= first_peak);
    }

    #[test]
    fn test_time_domain_keeps_latest_window() {
        let mut analyser = analyser(32, 0.0);
        analyser.push_samples(&vec![-1.0; 40]);
        analyser.push_samples(&[1.0; 4]);

        let mut time = vec![0u8; 32];
        analyser.byte_time_domain_data(&mut time);

        assert!(time[..28].iter().all(|&b| b == 0));
        assert!(time[28..].iter().all(|&b| b == 255));
    }

    #[test]
    fn test_half_length_time_buffer_holds_newest_samples() {
        let mut analyser = analyser(32, 0.0);
        analyser.push_samples(&vec![-1.0; 24]);
        analyser.push_samples(&[1.0; 8]);

        let mut time = vec![128u8; 16];
        analyser.byte_time_domain_data(&mut time);

        assert!(time[..8].iter().all(|&b| b == 0));
        assert!(time[8..].iter().all(|&b| b == 255));
    }
}
