use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use tapline::audio::{CaptureDevice, CpalCapture, DecodedMedia, DeniedCapture, SoftwareHost};
use tapline::document::{StaticDocument, StaticFrame};
use tapline::render::SpectrumLogger;
use tapline::{
    AcquisitionEnvironment, AcquisitionOrchestrator, PlayerHandle, PlayerSession, SamplingLoop, SimulatedPlayer,
    TapConfig, TapError,
};

#[derive(Parser)]
#[command(name = "tapline")]
#[command(about = "Acquire a live audio signal for a visualizer, falling back until one works")]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Audio file to expose as a media element (MP3, WAV, OGG, etc.)
    #[arg(short, long)]
    media: Option<String>,

    /// Source URL reported by the media element
    #[arg(long, default_value = "https://rr1---sn.googlevideo.com/videoplayback")]
    media_src: String,

    /// Place the media element inside a same-origin player embed frame
    #[arg(long)]
    same_origin: bool,

    /// Drive a simulated player for the control-surface strategy
    #[arg(long)]
    player: bool,

    /// Video URL to load into the player session
    #[arg(long, default_value = "https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    video: String,

    /// Refuse microphone access
    #[arg(long)]
    no_microphone: bool,

    /// How long to sample before tearing down
    #[arg(long, default_value = "10")]
    seconds: u64,

    /// Sampling frame rate (overrides the config file)
    #[arg(long)]
    fps: Option<u32>,
}

fn build_document(args: &Args) -> Result<StaticDocument> {
    let Some(path) = &args.media else {
        return Ok(StaticDocument::new());
    };

    let media = Arc::new(DecodedMedia::open(path, args.media_src.as_str())?);
    let document = if args.same_origin {
        let inner = StaticDocument::new().with_media(media);
        StaticDocument::new().with_frame(StaticFrame::same_origin(
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            inner,
        ))
    } else {
        StaticDocument::new().with_media(media)
    };
    Ok(document)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Tapline audio acquisition");
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path);
            TapConfig::from_json_file(path)?
        }
        None => TapConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.sampling.frames_per_second = fps;
        config.validate()?;
    }

    let capture: Arc<dyn CaptureDevice> = if args.no_microphone {
        Arc::new(DeniedCapture)
    } else {
        Arc::new(CpalCapture::new())
    };
    let env = AcquisitionEnvironment {
        document: Arc::new(build_document(&args)?),
        capture,
    };

    let mut session = PlayerSession::new();
    let player: Option<Arc<dyn PlayerHandle>> = if args.player {
        let video_id = session.load_video(&args.video).map_err(TapError::from)?;
        info!("Simulating player for video {}", video_id);
        let simulated = Arc::new(SimulatedPlayer::new());
        session.on_ready();
        simulated.play();
        session.on_state_change(simulated.player_state()?);
        Some(simulated)
    } else {
        None
    };

    let mut orchestrator = AcquisitionOrchestrator::from_config(&config, Arc::new(SoftwareHost::new()), &env);
    let outcome = orchestrator.connect(player).await?;
    for attempt in &outcome.attempts {
        info!("  {}", attempt);
    }
    info!("Session status: {:?}", orchestrator.session_status(session.status()));
    if outcome.method == "Demo Mode" {
        warn!("No real audio source available, visualizing a synthetic tone");
    }

    let mut sampling = SamplingLoop::new(orchestrator.tap().clone(), config.sampling.frames_per_second);
    sampling.add_renderer(Box::new(SpectrumLogger::new(
        config.analyser.sample_rate,
        config.sampling.frames_per_second as u64,
    )));
    sampling.start();

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    sampling.stop();
    info!("Delivered {} frames", sampling.frames_delivered());
    orchestrator.teardown();
    Ok(())
}
