use anyhow::Result;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::{info, warn};

use super::source::{ChannelSource, SourceNode};
use crate::error::TapError;

/// Chunks buffered between the capture callback and the next pull.
const CAPTURE_BACKLOG: usize = 32;

/// Permission-gated live input, such as a microphone.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Ask for access and start capturing. May wait on a permission prompt.
    async fn open(&self) -> crate::error::Result<Box<dyn SourceNode>>;
}

/// Default input device of the default cpal host.
///
/// cpal streams are not `Send`, so each capture owns a dedicated thread that
/// holds the stream until the returned source node is disconnected.
#[derive(Default)]
pub struct CpalCapture;

impl CpalCapture {
    pub fn new() -> Self {
        Self
    }

    fn start_capture_thread() -> Result<ChannelSource> {
        let (audio_sender, audio_receiver) = crossbeam_channel::bounded(CAPTURE_BACKLOG);
        let (ready_sender, ready_receiver) = crossbeam_channel::bounded::<Result<String, String>>(1);
        let (stop_sender, stop_receiver) = crossbeam_channel::bounded::<()>(0);

        std::thread::Builder::new()
            .name("tapline-capture".to_string())
            .spawn(move || Self::run_capture(audio_sender, ready_sender, stop_receiver))?;

        let device_name = ready_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("capture thread exited before reporting"))?
            .map_err(|e| anyhow::anyhow!(e))?;

        info!("Microphone capture started on {}", device_name);
        Ok(ChannelSource::new(audio_receiver, stop_sender))
    }

    fn run_capture(
        audio_sender: Sender<Vec<f32>>,
        ready_sender: Sender<Result<String, String>>,
        stop_receiver: Receiver<()>,
    ) {
        let stream = match Self::open_default_input(audio_sender) {
            Ok((stream, name)) => {
                let _ = ready_sender.send(Ok(name));
                stream
            }
            Err(e) => {
                let _ = ready_sender.send(Err(e.to_string()));
                return;
            }
        };

        // Blocks until the source node drops its stop sender
        let _ = stop_receiver.recv();
        drop(stream);
        info!("Microphone capture stopped");
    }

    fn open_default_input(sender: Sender<Vec<f32>>) -> Result<(Stream, String)> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No input device available"))?;

        let supported = device
            .default_input_config()
            .map_err(|e| anyhow::anyhow!("Failed to get default input config: {}", e))?;

        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Audio input config: {:?}", supported);

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream(&device, &config, sender, |s: f32| s)?,
            SampleFormat::I16 => {
                Self::build_stream(&device, &config, sender, |s: i16| s as f32 / i16::MAX as f32)?
            }
            SampleFormat::U16 => Self::build_stream(&device, &config, sender, |s: u16| {
                (s as f32 - 32768.0) / 32768.0
            })?,
            other => return Err(anyhow::anyhow!("Unsupported sample format {:?}", other)),
        };
        stream.play()?;

        Ok((stream, name))
    }

    fn build_stream<T, F>(
        device: &Device,
        config: &StreamConfig,
        sender: Sender<Vec<f32>>,
        to_f32: F,
    ) -> Result<Stream>
    where
        T: cpal::SizedSample,
        F: Fn(T) -> f32 + Send + 'static,
    {
        let channels = config.channels.max(1) as usize;

        let stream = device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .map(|frame| frame.iter().map(|&s| to_f32(s)).sum::<f32>() / channels as f32)
                    .collect();

                // A full backlog means nobody is pulling; dropping is fine
                if let Err(TrySendError::Disconnected(_)) = sender.try_send(mono) {
                    warn!("Capture receiver is gone");
                }
            },
            |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }
}

#[async_trait]
impl CaptureDevice for CpalCapture {
    async fn open(&self) -> crate::error::Result<Box<dyn SourceNode>> {
        let source = tokio::task::spawn_blocking(Self::start_capture_thread)
            .await
            .map_err(|e| TapError::unavailable(format!("capture task failed: {}", e)))?
            .map_err(|e| TapError::unavailable(format!("microphone unavailable: {}", e)))?;
        Ok(Box::new(source))
    }
}

/// Capture device for hosts where input access is refused or absent.
#[derive(Default)]
pub struct DeniedCapture;

#[async_trait]
impl CaptureDevice for DeniedCapture {
    async fn open(&self) -> crate::error::Result<Box<dyn SourceNode>> {
        Err(TapError::unavailable("microphone permission denied"))
    }
}
