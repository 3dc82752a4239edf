use std::sync::Arc;

use tapline::audio::{DeniedCapture, SoftwareHost};
use tapline::document::StaticDocument;
use tapline::{
    AcquisitionEnvironment, AcquisitionOrchestrator, ConnectionState, PlaybackError, PlayerHandle, PlayerSession,
    PlayerStatus, SessionStatus, SimulatedPlayer, TapConfig, TapError,
};

fn load(session: &mut PlayerSession, url: &str) -> tapline::Result<String> {
    Ok(session.load_video(url)?.to_string())
}

#[test]
fn test_invalid_url_surfaces_as_playback_error() {
    let mut session = PlayerSession::new();
    let err = load(&mut session, "https://example.com/not-a-video").unwrap_err();

    match &err {
        TapError::Playback(PlaybackError::InvalidUrl(url)) => assert_eq!(url, "https://example.com/not-a-video"),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!err.is_fatal());
    assert_eq!(session.status(), PlayerStatus::Idle);

    let reported = TapError::from(session.on_error(150));
    assert!(matches!(reported, TapError::Playback(PlaybackError::EmbedNotAllowed(150))));
    assert_eq!(session.status(), PlayerStatus::Error);
}

#[tokio::test]
async fn test_session_status_tracks_player_and_connection() {
    let env = AcquisitionEnvironment {
        document: Arc::new(StaticDocument::new()),
        capture: Arc::new(DeniedCapture),
    };
    let mut orchestrator =
        AcquisitionOrchestrator::from_config(&TapConfig::default(), Arc::new(SoftwareHost::new()), &env);

    let mut session = PlayerSession::new();
    assert_eq!(load(&mut session, "https://youtu.be/dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");
    assert_eq!(
        orchestrator.session_status(session.status()),
        SessionStatus { player: PlayerStatus::Loading, connection: ConnectionState::Disconnected }
    );

    let player = Arc::new(SimulatedPlayer::new());
    session.on_ready();
    player.play();
    session.on_state_change(player.player_state().unwrap());

    let handle: Arc<dyn PlayerHandle> = player.clone();
    let outcome = orchestrator.connect(Some(handle)).await.unwrap();
    assert_eq!(
        orchestrator.session_status(session.status()),
        SessionStatus {
            player: PlayerStatus::Playing,
            connection: ConnectionState::Connected(outcome.method),
        }
    );

    assert_eq!(session.on_error(100), PlaybackError::NotFound);
    orchestrator.teardown();
    assert_eq!(
        orchestrator.session_status(session.status()),
        SessionStatus { player: PlayerStatus::Error, connection: ConnectionState::Disconnected }
    );
}
