use async_trait::async_trait;

use super::{AcquireRequest, AcquisitionStrategy, StrategyKind};
use crate::audio::{OscillatorBank, RenderCursor, SharedGains, SourceNode};
use crate::error::Result;

/// Fixed tone that always connects; the end of every fallback chain.
pub struct DemoSignal {
    frequency: f32,
    gain: f32,
}

impl DemoSignal {
    pub fn new(frequency: f32, gain: f32) -> Self {
        Self { frequency, gain }
    }
}

impl Default for DemoSignal {
    fn default() -> Self {
        Self::new(440.0, 0.1)
    }
}

#[async_trait]
impl AcquisitionStrategy for DemoSignal {
    fn label(&self) -> &str {
        StrategyKind::Demo.label()
    }

    async fn acquire(&self, request: AcquireRequest<'_>) -> Result<Box<dyn SourceNode>> {
        let context = request.context;
        Ok(Box::new(OscillatorBank::new(
            &[self.frequency],
            SharedGains::new(vec![self.gain]),
            RenderCursor::new(context.sample_rate(), context.current_time(), request.max_block),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ContextState, ProcessingContext};

    #[tokio::test]
    async fn test_demo_tone_level() {
        let context = ProcessingContext::new(8000.0, ContextState::Suspended);
        let strategy = DemoSignal::default();
        let mut node = strategy
            .acquire(AcquireRequest { context: &context, player: None, max_block: 4096 })
            .await
            .unwrap();

        let mut out = Vec::new();
        node.render(0.5, &mut out);
        assert_eq!(out.len(), 4000);
        let peak = out.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        approx::assert_abs_diff_eq!(peak, 0.1, epsilon = 1e-3);
    }
}
