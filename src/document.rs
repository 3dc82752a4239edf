//! Same-origin view of the page hosting the embedded player.

use std::sync::Arc;

use crate::audio::MediaElement;

/// A document that can be searched for embed frames and media elements.
pub trait Document: Send + Sync {
    fn embed_frames(&self) -> Vec<Arc<dyn EmbedFrame>>;

    fn media_elements(&self) -> Vec<Arc<dyn MediaElement>>;
}

/// An embedded frame, such as the player's iframe.
pub trait EmbedFrame: Send + Sync {
    fn src(&self) -> String;

    /// The frame's document, or `None` when it is cross-origin.
    fn content_document(&self) -> Option<Arc<dyn Document>>;
}

/// In-memory document assembled up front.
#[derive(Default, Clone)]
pub struct StaticDocument {
    frames: Vec<Arc<dyn EmbedFrame>>,
    media: Vec<Arc<dyn MediaElement>>,
}

impl StaticDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(mut self, frame: StaticFrame) -> Self {
        self.frames.push(Arc::new(frame));
        self
    }

    pub fn with_media(mut self, element: Arc<dyn MediaElement>) -> Self {
        self.media.push(element);
        self
    }
}

impl Document for StaticDocument {
    fn embed_frames(&self) -> Vec<Arc<dyn EmbedFrame>> {
        self.frames.clone()
    }

    fn media_elements(&self) -> Vec<Arc<dyn MediaElement>> {
        self.media.clone()
    }
}

pub struct StaticFrame {
    src: String,
    content: Option<Arc<dyn Document>>,
}

impl StaticFrame {
    pub fn same_origin(src: impl Into<String>, content: StaticDocument) -> Self {
        Self {
            src: src.into(),
            content: Some(Arc::new(content)),
        }
    }

    pub fn cross_origin(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            content: None,
        }
    }
}

impl EmbedFrame for StaticFrame {
    fn src(&self) -> String {
        self.src.clone()
    }

    fn content_document(&self) -> Option<Arc<dyn Document>> {
        self.content.clone()
    }
}
