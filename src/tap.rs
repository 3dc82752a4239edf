use log::{debug, info};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::audio::{Analyser, AudioHost, ContextState, ProcessingContext, SourceNode, VisualizationSnapshot};
use crate::config::AnalyserConfig;
use crate::error::Result;

/// Log pipeline levels every this many pulls (~2 seconds at 60fps).
const DEBUG_EVERY_PULLS: u64 = 120;

struct AttachedSource {
    node: Box<dyn SourceNode>,
    label: String,
}

#[derive(Default)]
struct TapState {
    context: Option<ProcessingContext>,
    analyser: Option<Analyser>,
    source: Option<AttachedSource>,
    scratch: Vec<f32>,
    pulls: u64,
}

impl TapState {
    fn release(&mut self) {
        if let Some(mut attached) = self.source.take() {
            attached.node.disconnect();
            info!("Disconnected source '{}'", attached.label);
        }
        if let Some(context) = self.context.take() {
            context.close();
        }
        self.analyser = None;
        self.scratch.clear();
        self.pulls = 0;
    }
}

impl Drop for TapState {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owner of the processing context, the analyser and the one attached source.
///
/// `AudioTap` is a cheap handle; clones share the same graph. `attach_source`
/// and `teardown` are the only operations that change what feeds the
/// analyser, and both run under one lock so a new source is never wired
/// before the previous one is disconnected. The graph is released when the
/// last handle is dropped.
#[derive(Clone)]
pub struct AudioTap {
    host: Arc<dyn AudioHost>,
    config: AnalyserConfig,
    state: Arc<Mutex<TapState>>,
}

impl AudioTap {
    pub fn new(host: Arc<dyn AudioHost>, config: AnalyserConfig) -> Self {
        Self {
            host,
            config,
            state: Arc::new(Mutex::new(TapState::default())),
        }
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    /// Return the live context, creating it (and the analyser) on first use.
    pub fn ensure_context(&self) -> Result<ProcessingContext> {
        let mut state = self.state.lock();
        Self::ensure_context_locked(&mut state, self.host.as_ref(), &self.config)
    }

    fn ensure_context_locked(
        state: &mut TapState,
        host: &dyn AudioHost,
        config: &AnalyserConfig,
    ) -> Result<ProcessingContext> {
        if let Some(context) = &state.context {
            return Ok(context.clone());
        }

        let analyser = Analyser::new(config)?;
        let context = host.create_context(config)?;
        state.analyser = Some(analyser);
        state.context = Some(context.clone());
        info!(
            "Processing context ready on {} host (fft size {}, smoothing {})",
            host.host_name(),
            config.fft_size,
            config.smoothing
        );
        Ok(context)
    }

    /// Resume the context if the host left it suspended. Not an error either way.
    pub async fn resume_if_suspended(&self) -> Result<()> {
        let context = self.state.lock().context.clone();
        match context {
            Some(context) if context.state() == ContextState::Suspended => {
                info!("Resuming suspended processing context");
                context.resume().await
            }
            _ => Ok(()),
        }
    }

    pub fn context(&self) -> Option<ProcessingContext> {
        self.state.lock().context.clone()
    }

    /// Make `node` the one source feeding the analyser.
    ///
    /// Any previous source is disconnected first. Safe to call repeatedly.
    pub fn attach_source(&self, node: Box<dyn SourceNode>, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        let mut state = self.state.lock();
        Self::ensure_context_locked(&mut state, self.host.as_ref(), &self.config)?;

        if let Some(mut previous) = state.source.take() {
            previous.node.disconnect();
            info!("Replaced source '{}' with '{}'", previous.label, label);
        }
        if let Some(analyser) = state.analyser.as_mut() {
            analyser.reset();
        }

        info!("✅ Audio tap connected via {}", label);
        state.source = Some(AttachedSource { node, label });
        Ok(())
    }

    /// Pull the current buffers, or `None` while nothing is attached.
    pub fn pull_snapshot(&self) -> Option<VisualizationSnapshot> {
        let mut snapshot = VisualizationSnapshot::with_length(self.frequency_bin_count());
        self.pull_snapshot_into(&mut snapshot).then_some(snapshot)
    }

    /// Non-allocating variant of [`pull_snapshot`](Self::pull_snapshot).
    ///
    /// Returns false and leaves `snapshot` untouched while nothing is attached.
    pub fn pull_snapshot_into(&self, snapshot: &mut VisualizationSnapshot) -> bool {
        let bin_count = self.frequency_bin_count();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let (Some(context), Some(analyser), Some(attached)) =
            (&state.context, state.analyser.as_mut(), state.source.as_mut())
        else {
            return false;
        };

        state.scratch.clear();
        attached.node.render(context.current_time(), &mut state.scratch);
        analyser.push_samples(&state.scratch);

        let (frequency, time) = snapshot.buffers_mut(bin_count);
        analyser.byte_frequency_data(frequency);
        analyser.byte_time_domain_data(time);

        state.pulls += 1;
        if state.pulls % DEBUG_EVERY_PULLS == 0 {
            debug!(
                "🔍 Tap '{}': {} new samples, avg level {:.3}, peak {}",
                attached.label,
                state.scratch.len(),
                snapshot.average_level(),
                snapshot.frequency_data().iter().max().copied().unwrap_or(0)
            );
        }
        true
    }

    /// Disconnect the source, close the context and forget everything.
    ///
    /// Safe to call any number of times, connected or not.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        if state.context.is_none() && state.source.is_none() {
            return;
        }
        state.release();
        info!("Audio tap torn down");
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().source.is_some()
    }

    pub fn connection_method(&self) -> Option<String> {
        self.state.lock().source.as_ref().map(|s| s.label.clone())
    }

    /// Number of sources wired to the analyser: always 0 or 1.
    pub fn attached_source_count(&self) -> usize {
        usize::from(self.state.lock().source.is_some())
    }
}

impl std::fmt::Debug for AudioTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AudioTap")
            .field("host", &self.host.host_name())
            .field("has_context", &state.context.is_some())
            .field("method", &state.source.as_ref().map(|s| s.label.as_str()))
            .finish()
    }
}
