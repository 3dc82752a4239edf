use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use super::{AcquireRequest, AcquisitionStrategy, StrategyKind};
use crate::audio::{CaptureDevice, SourceNode};
use crate::error::Result;

/// Ambient input as a real, if unrelated, signal.
pub struct MicrophoneCapture {
    device: Arc<dyn CaptureDevice>,
}

impl MicrophoneCapture {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self { device }
    }
}

#[async_trait]
impl AcquisitionStrategy for MicrophoneCapture {
    fn label(&self) -> &str {
        StrategyKind::Microphone.label()
    }

    async fn acquire(&self, _request: AcquireRequest<'_>) -> Result<Box<dyn SourceNode>> {
        info!("Requesting microphone access...");
        self.device.open().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ChannelSource, ContextState, DeniedCapture, ProcessingContext};
    use crate::error::TapError;

    struct LoopbackCapture;

    #[async_trait]
    impl CaptureDevice for LoopbackCapture {
        async fn open(&self) -> Result<Box<dyn SourceNode>> {
            let (tx, rx) = crossbeam_channel::unbounded();
            let (stop, _) = crossbeam_channel::bounded(0);
            tx.send(vec![0.5; 32]).unwrap();
            Ok(Box::new(ChannelSource::new(rx, stop)))
        }
    }

    #[tokio::test]
    async fn test_denied_permission_is_unavailable() {
        let context = ProcessingContext::new(44100.0, ContextState::Running);
        let strategy = MicrophoneCapture::new(Arc::new(DeniedCapture));
        let result = strategy
            .acquire(AcquireRequest { context: &context, player: None, max_block: 2048 })
            .await;
        assert!(matches!(result, Err(TapError::SourceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_granted_capture_delivers_samples() {
        let context = ProcessingContext::new(44100.0, ContextState::Running);
        let strategy = MicrophoneCapture::new(Arc::new(LoopbackCapture));
        let mut node = strategy
            .acquire(AcquireRequest { context: &context, player: None, max_block: 2048 })
            .await
            .unwrap();

        let mut out = Vec::new();
        node.render(0.0, &mut out);
        assert_eq!(out.len(), 32);
    }
}
