use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use tapline::audio::{DeniedCapture, SoftwareHost};
use tapline::document::StaticDocument;
use tapline::{
    AcquisitionEnvironment, AcquisitionOrchestrator, Renderer, SamplingLoop, TapConfig, VisualizationSnapshot,
};

#[derive(Clone, Default)]
struct Frames(Arc<Mutex<Vec<Option<Instant>>>>);

impl Frames {
    fn len(&self) -> usize {
        self.0.lock().len()
    }

    fn since(&self, index: usize) -> Vec<Option<Instant>> {
        self.0.lock()[index..].to_vec()
    }
}

struct CaptureTimes(Frames);

impl Renderer for CaptureTimes {
    fn render_frame(&mut self, snapshot: Option<&VisualizationSnapshot>) {
        self.0 .0.lock().push(snapshot.map(|s| s.captured_at()));
    }
}

async fn demo_orchestrator() -> AcquisitionOrchestrator {
    let env = AcquisitionEnvironment {
        document: Arc::new(StaticDocument::new()),
        capture: Arc::new(DeniedCapture),
    };
    let mut orchestrator =
        AcquisitionOrchestrator::from_config(&TapConfig::default(), Arc::new(SoftwareHost::new()), &env);
    orchestrator.connect(None).await.unwrap();
    orchestrator
}

#[tokio::test(start_paused = true)]
async fn test_reactivation_delivers_fresh_snapshots() {
    let orchestrator = demo_orchestrator().await;
    let frames = Frames::default();
    let mut sampling = SamplingLoop::new(orchestrator.tap().clone(), 60);
    sampling.add_renderer(Box::new(CaptureTimes(frames.clone())));

    sampling.start();
    tokio::time::sleep(Duration::from_millis(250)).await;
    sampling.stop();
    assert!(!sampling.is_active());

    let delivered = frames.len();
    assert!(delivered >= 10);

    // Nothing arrives while stopped
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(frames.len(), delivered);

    let restarted_at = Instant::now();
    sampling.start();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let fresh = frames.since(delivered);
    assert!(!fresh.is_empty());
    for captured in fresh {
        let captured = captured.expect("tap is connected");
        assert!(captured >= restarted_at);
    }
}

#[tokio::test(start_paused = true)]
async fn test_teardown_while_sampling_yields_none() {
    let mut orchestrator = demo_orchestrator().await;
    let frames = Frames::default();
    let mut sampling = SamplingLoop::new(orchestrator.tap().clone(), 30);
    sampling.add_renderer(Box::new(CaptureTimes(frames.clone())));

    sampling.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let connected = frames.len();
    orchestrator.teardown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let after = frames.since(connected);
    assert!(!after.is_empty());
    assert!(after.iter().all(|frame| frame.is_none()));
    assert!(sampling.is_active());
}
