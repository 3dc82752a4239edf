use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

use super::{AcquireRequest, AcquisitionStrategy, StrategyKind};
use crate::audio::SourceNode;
use crate::config::ProviderConfig;
use crate::document::Document;
use crate::error::{Result, TapError};

/// Taps the media element inside the player's embed frame.
///
/// Only works when the frame's document is reachable, i.e. same-origin.
pub struct DirectElementTap {
    document: Arc<dyn Document>,
    provider: ProviderConfig,
}

impl DirectElementTap {
    pub fn new(document: Arc<dyn Document>, provider: ProviderConfig) -> Self {
        Self { document, provider }
    }
}

#[async_trait]
impl AcquisitionStrategy for DirectElementTap {
    fn label(&self) -> &str {
        StrategyKind::DirectElement.label()
    }

    async fn acquire(&self, request: AcquireRequest<'_>) -> Result<Box<dyn SourceNode>> {
        let frame = self
            .document
            .embed_frames()
            .into_iter()
            .find(|frame| self.provider.matches(&frame.src()))
            .ok_or_else(|| TapError::unavailable("player embed frame not found"))?;

        let inner = frame.content_document().ok_or_else(|| {
            TapError::unavailable(format!("cannot access frame document of {}", frame.src()))
        })?;

        let element = inner
            .media_elements()
            .into_iter()
            .next()
            .ok_or_else(|| TapError::unavailable("no media element inside the embed frame"))?;

        debug!("Tapping media element {} inside embed frame", element.src());
        element.create_source(request.context, request.max_block)
    }
}

/// Scans the top document for a provider media element, skipping the embed frame.
pub struct CrossDocumentTap {
    document: Arc<dyn Document>,
    provider: ProviderConfig,
}

impl CrossDocumentTap {
    pub fn new(document: Arc<dyn Document>, provider: ProviderConfig) -> Self {
        Self { document, provider }
    }
}

#[async_trait]
impl AcquisitionStrategy for CrossDocumentTap {
    fn label(&self) -> &str {
        StrategyKind::CrossDocument.label()
    }

    async fn acquire(&self, request: AcquireRequest<'_>) -> Result<Box<dyn SourceNode>> {
        for element in self.document.media_elements() {
            let src = element.src();
            if !self.provider.matches(&src) && !self.provider.matches(&element.current_src()) {
                continue;
            }

            match element.create_source(request.context, request.max_block) {
                Ok(node) => return Ok(node),
                Err(e) => {
                    warn!("Failed to connect to media element {}: {}", src, e);
                    continue;
                }
            }
        }

        Err(TapError::unavailable("no accessible provider media elements found"))
    }
}
