pub mod demo;
pub mod element;
pub mod microphone;
pub mod synthesis;

pub use demo::DemoSignal;
pub use element::{CrossDocumentTap, DirectElementTap};
pub use microphone::MicrophoneCapture;
pub use synthesis::{control_surface_gains, ControlSurfaceSynthesis, SynthesisSource};

use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::audio::{CaptureDevice, ProcessingContext, SourceNode};
use crate::config::TapConfig;
use crate::document::Document;
use crate::error::Result;
use crate::player::PlayerHandle;

/// The built-in acquisition methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    DirectElement,
    CrossDocument,
    ControlSurface,
    Microphone,
    Demo,
}

impl StrategyKind {
    /// Most faithful to the real soundtrack first.
    pub const DEFAULT_ORDER: [StrategyKind; 5] = [
        StrategyKind::DirectElement,
        StrategyKind::CrossDocument,
        StrategyKind::ControlSurface,
        StrategyKind::Microphone,
        StrategyKind::Demo,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::DirectElement => "Direct Video Access",
            StrategyKind::CrossDocument => "Cross-frame Access",
            StrategyKind::ControlSurface => "YouTube Player API",
            StrategyKind::Microphone => "Microphone",
            StrategyKind::Demo => "Demo Mode",
        }
    }
}

/// Everything a strategy may use while trying to produce a source.
#[derive(Clone, Copy)]
pub struct AcquireRequest<'a> {
    pub context: &'a ProcessingContext,
    pub player: Option<&'a Arc<dyn PlayerHandle>>,
    /// Most frames a generated source renders per pull.
    pub max_block: usize,
}

/// One method of obtaining a live signal for the analyser.
///
/// Implementations only build the source node; attaching it is left to the
/// orchestrator so the tap stays the single place that rewires the graph.
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    /// Human-readable method label reported on success.
    fn label(&self) -> &str;

    fn requires_player(&self) -> bool {
        false
    }

    async fn acquire(&self, request: AcquireRequest<'_>) -> Result<Box<dyn SourceNode>>;
}

/// Collaborators the built-in strategies are constructed from.
#[derive(Clone)]
pub struct AcquisitionEnvironment {
    pub document: Arc<dyn Document>,
    pub capture: Arc<dyn CaptureDevice>,
}

/// Ordered list of strategies, tried front to back.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn AcquisitionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the built-in strategies in the configured order.
    ///
    /// Duplicates keep their first position, and `Demo` is always moved or
    /// appended to the end so the chain finishes with a strategy that cannot fail.
    pub fn from_config(config: &TapConfig, env: &AcquisitionEnvironment) -> Self {
        let mut kinds: Vec<StrategyKind> = Vec::new();
        for &kind in &config.acquisition.strategies {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.last() != Some(&StrategyKind::Demo) {
            if kinds.contains(&StrategyKind::Demo) {
                warn!("Demo strategy configured before other strategies, moving it to the end");
                kinds.retain(|&kind| kind != StrategyKind::Demo);
            } else {
                warn!("Demo strategy missing from configuration, appending it as the last resort");
            }
            kinds.push(StrategyKind::Demo);
        }

        let mut registry = Self::new();
        for kind in kinds {
            let strategy: Box<dyn AcquisitionStrategy> = match kind {
                StrategyKind::DirectElement => Box::new(DirectElementTap::new(
                    Arc::clone(&env.document),
                    config.provider.clone(),
                )),
                StrategyKind::CrossDocument => Box::new(CrossDocumentTap::new(
                    Arc::clone(&env.document),
                    config.provider.clone(),
                )),
                StrategyKind::ControlSurface => {
                    Box::new(ControlSurfaceSynthesis::new(config.synthesis.clone()))
                }
                StrategyKind::Microphone => Box::new(MicrophoneCapture::new(Arc::clone(&env.capture))),
                StrategyKind::Demo => Box::new(DemoSignal::new(
                    config.synthesis.demo_frequency,
                    config.synthesis.demo_gain,
                )),
            };
            registry.push(strategy);
        }
        registry
    }

    pub fn push(&mut self, strategy: Box<dyn AcquisitionStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn with(mut self, strategy: impl AcquisitionStrategy + 'static) -> Self {
        self.push(Box::new(strategy));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn AcquisitionStrategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }

    pub fn labels(&self) -> Vec<&str> {
        self.iter().map(|s| s.label()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
