use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tapline::audio::{
    DecodedMedia, DeniedCapture, OscillatorBank, RenderCursor, SharedGains, SoftwareHost, SourceNode,
    UnavailableHost,
};
use tapline::document::StaticDocument;
use tapline::strategy::{AcquireRequest, DemoSignal};
use tapline::{
    AcquisitionEnvironment, AcquisitionOrchestrator, AcquisitionStrategy, AttemptOutcome, AudioTap,
    ConnectionState, PlayerHandle, SimulatedPlayer, StrategyRegistry, TapConfig, TapError,
};

#[derive(Clone, Copy)]
enum Script {
    Fail,
    Succeed,
    Hang,
}

/// Strategy with a fixed outcome that records every call and every live node.
struct Scripted {
    label: &'static str,
    script: Script,
    calls: Arc<Mutex<Vec<&'static str>>>,
    live: Arc<AtomicUsize>,
}

struct TrackedNode {
    inner: OscillatorBank,
    live: Arc<AtomicUsize>,
    connected: bool,
}

impl SourceNode for TrackedNode {
    fn render(&mut self, now: f64, out: &mut Vec<f32>) {
        self.inner.render(now, out);
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        self.inner.stop();
    }
}

#[async_trait]
impl AcquisitionStrategy for Scripted {
    fn label(&self) -> &str {
        self.label
    }

    async fn acquire(&self, request: AcquireRequest<'_>) -> tapline::Result<Box<dyn SourceNode>> {
        self.calls.lock().push(self.label);
        match self.script {
            Script::Fail => Err(TapError::unavailable(format!("{} refused", self.label))),
            Script::Hang => std::future::pending().await,
            Script::Succeed => {
                self.live.fetch_add(1, Ordering::SeqCst);
                let context = request.context;
                Ok(Box::new(TrackedNode {
                    inner: OscillatorBank::new(
                        &[220.0],
                        SharedGains::new(vec![0.2]),
                        RenderCursor::new(context.sample_rate(), context.current_time(), request.max_block),
                    ),
                    live: Arc::clone(&self.live),
                    connected: true,
                }))
            }
        }
    }
}

struct Harness {
    calls: Arc<Mutex<Vec<&'static str>>>,
    live: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn strategy(&self, label: &'static str, script: Script) -> Scripted {
        Scripted {
            label,
            script,
            calls: Arc::clone(&self.calls),
            live: Arc::clone(&self.live),
        }
    }

    fn orchestrator(&self, registry: StrategyRegistry, timeout: Option<Duration>) -> AcquisitionOrchestrator {
        let tap = AudioTap::new(Arc::new(SoftwareHost::new()), TapConfig::default().analyser);
        AcquisitionOrchestrator::new(tap, registry, timeout)
    }
}

fn no_sources() -> AcquisitionEnvironment {
    AcquisitionEnvironment {
        document: Arc::new(StaticDocument::new()),
        capture: Arc::new(DeniedCapture),
    }
}

#[tokio::test]
async fn test_stops_at_first_success_in_order() {
    let harness = Harness::new();
    let registry = StrategyRegistry::new()
        .with(harness.strategy("first", Script::Fail))
        .with(harness.strategy("second", Script::Fail))
        .with(harness.strategy("third", Script::Succeed))
        .with(harness.strategy("fourth", Script::Succeed));
    let mut orchestrator = harness.orchestrator(registry, None);

    let outcome = orchestrator.connect(None).await.unwrap();
    assert_eq!(outcome.method, "third");
    assert_eq!(*harness.calls.lock(), vec!["first", "second", "third"]);
    assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Failed(_)));
    assert_eq!(outcome.attempts[2].outcome, AttemptOutcome::Succeeded);
    assert_eq!(orchestrator.tap().connection_method().as_deref(), Some("third"));
}

#[tokio::test]
async fn test_demo_mode_without_player_or_microphone() {
    let mut orchestrator =
        AcquisitionOrchestrator::from_config(&TapConfig::default(), Arc::new(SoftwareHost::new()), &no_sources());

    let outcome = orchestrator.connect(None).await.unwrap();
    assert_eq!(outcome.method, "Demo Mode");
    let tap = orchestrator.tap().clone();
    assert!(tap.is_ready());

    let snapshot = tap.pull_snapshot().unwrap();
    assert_eq!(snapshot.buffer_length(), 1024);
    assert_eq!(snapshot.time_data().len(), 1024);

    orchestrator.teardown();
    assert!(!tap.is_ready());
    assert!(tap.pull_snapshot().is_none());
}

#[tokio::test]
async fn test_at_most_one_source_across_reconnects() {
    let harness = Harness::new();
    let registry = StrategyRegistry::new()
        .with(harness.strategy("flaky", Script::Fail))
        .with(harness.strategy("steady", Script::Succeed));
    let mut orchestrator = harness.orchestrator(registry, None);

    for _ in 0..3 {
        orchestrator.connect(None).await.unwrap();
        assert_eq!(harness.live.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.tap().attached_source_count(), 1);
    }

    orchestrator.teardown();
    assert_eq!(harness.live.load(Ordering::SeqCst), 0);
    assert_eq!(orchestrator.tap().attached_source_count(), 0);

    orchestrator.connect(None).await.unwrap();
    assert_eq!(harness.live.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let harness = Harness::new();
    let mut orchestrator =
        harness.orchestrator(StrategyRegistry::new().with(harness.strategy("only", Script::Succeed)), None);

    // Never connected
    orchestrator.teardown();
    orchestrator.teardown();
    assert!(!orchestrator.tap().is_ready());

    orchestrator.connect(None).await.unwrap();
    orchestrator.teardown();
    orchestrator.teardown();
    assert_eq!(orchestrator.connection_state(), &ConnectionState::Disconnected);
    assert_eq!(harness.live.load(Ordering::SeqCst), 0);
    assert!(orchestrator.tap().context().is_none());
}

#[tokio::test]
async fn test_all_failing_reports_every_attempt() {
    let harness = Harness::new();
    let registry = StrategyRegistry::new()
        .with(harness.strategy("a", Script::Fail))
        .with(harness.strategy("b", Script::Fail));
    let mut orchestrator = harness.orchestrator(registry, None);

    let err = orchestrator.connect(None).await.unwrap_err();
    match &err {
        TapError::SourceUnavailable(message) => {
            assert!(message.contains("a refused"));
            assert!(message.contains("b refused"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!orchestrator.tap().is_ready());
    assert!(matches!(orchestrator.connection_state(), ConnectionState::Failed(_)));
}

#[tokio::test]
async fn test_unsupported_environment_stops_before_strategies() {
    let harness = Harness::new();
    let tap = AudioTap::new(Arc::new(UnavailableHost), TapConfig::default().analyser);
    let mut orchestrator = AcquisitionOrchestrator::new(
        tap,
        StrategyRegistry::new().with(harness.strategy("never", Script::Succeed)),
        None,
    );

    let err = orchestrator.connect(None).await.unwrap_err();
    assert!(matches!(err, TapError::UnsupportedEnvironment(_)));
    assert!(harness.calls.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hung_attempt_times_out_and_chain_continues() {
    let harness = Harness::new();
    let registry = StrategyRegistry::new()
        .with(harness.strategy("prompt", Script::Hang))
        .with(DemoSignal::default());
    let mut orchestrator = harness.orchestrator(registry, Some(Duration::from_millis(500)));

    let outcome = orchestrator.connect(None).await.unwrap();
    assert_eq!(outcome.attempts[0].outcome, AttemptOutcome::TimedOut);
    assert_eq!(outcome.method, "Demo Mode");
}

#[tokio::test]
async fn test_player_strategy_skipped_without_player() {
    let config = TapConfig::default();
    let mut orchestrator = AcquisitionOrchestrator::from_config(&config, Arc::new(SoftwareHost::new()), &no_sources());

    let outcome = orchestrator.connect(None).await.unwrap();
    let skipped: Vec<&str> = outcome
        .attempts
        .iter()
        .filter(|a| matches!(a.outcome, AttemptOutcome::Skipped(_)))
        .map(|a| a.strategy.as_str())
        .collect();
    assert_eq!(skipped, vec!["YouTube Player API"]);
}

#[tokio::test(start_paused = true)]
async fn test_control_surface_follows_player() {
    let mut orchestrator =
        AcquisitionOrchestrator::from_config(&TapConfig::default(), Arc::new(SoftwareHost::new()), &no_sources());

    let player = Arc::new(SimulatedPlayer::new());
    player.seek_to(5.0);
    player.play();
    let handle: Arc<dyn PlayerHandle> = player.clone();

    let outcome = orchestrator.connect(Some(handle)).await.unwrap();
    assert_eq!(outcome.method, "YouTube Player API");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let playing = orchestrator.tap().pull_snapshot().unwrap();
    assert!(playing.frequency_data().iter().any(|&b| b > 0));

    orchestrator.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_paused_player_gives_silent_spectrum() {
    let mut orchestrator =
        AcquisitionOrchestrator::from_config(&TapConfig::default(), Arc::new(SoftwareHost::new()), &no_sources());

    let player = Arc::new(SimulatedPlayer::new());
    player.seek_to(5.0);
    player.play();
    player.pause();
    let handle: Arc<dyn PlayerHandle> = player.clone();

    orchestrator.connect(Some(handle)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = orchestrator.tap().pull_snapshot().unwrap();
    assert!(snapshot.frequency_data().iter().all(|&b| b == 0));
    assert_eq!(orchestrator.tap().connection_method().as_deref(), Some("YouTube Player API"));
}

#[tokio::test]
async fn test_reconnect_reuses_released_media_element() {
    let element = Arc::new(DecodedMedia::from_samples(
        "https://rr3---sn.googlevideo.com/videoplayback?id=7",
        vec![0.3; 4096],
        44100,
    ));
    let env = AcquisitionEnvironment {
        document: Arc::new(StaticDocument::new().with_media(element.clone())),
        capture: Arc::new(DeniedCapture),
    };
    let mut orchestrator =
        AcquisitionOrchestrator::from_config(&TapConfig::default(), Arc::new(SoftwareHost::new()), &env);

    assert_eq!(orchestrator.connect(None).await.unwrap().method, "Cross-frame Access");
    assert!(element.is_tapped());

    // The previous tap is released before the chain runs again
    assert_eq!(orchestrator.connect(None).await.unwrap().method, "Cross-frame Access");
    assert_eq!(orchestrator.tap().attached_source_count(), 1);

    orchestrator.teardown();
    assert!(!element.is_tapped());
}
