use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use story_reader::audio::CpalPlayback;
use story_reader::capture::{CameraSource, FileSource};
use story_reader::session::{CaptureSession, Stage};
use story_reader::{AudioSink, Config, PlaybackStart, PlaybackStatus};

/// Story Reader - photograph a storybook page and hear it read aloud
#[derive(Parser)]
#[command(name = "storyread", version, about)]
struct Cli {
    /// Relay base URL (endpoints live under /api/)
    #[arg(long, env = "STORYREAD_BASE_URL")]
    base_url: Option<String>,

    /// Path to a config file (default: ~/.config/storyread/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Skip the camera and always use the file chooser
    #[arg(long, env = "STORYREAD_NO_CAMERA")]
    no_camera: bool,

    /// Require an explicit read action after capture instead of
    /// auto-advancing
    #[arg(long)]
    manual_read: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline once on an image file and play the narration
    Read {
        /// Image file of the page
        file: PathBuf,
    },
    /// Probe the camera and grab one test frame
    TestCamera,
    /// Play a test tone through the audio output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,story_reader=info",
        1 => "info,story_reader=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.base_url {
        config.endpoints.base_url = url;
    }
    if cli.no_camera {
        config.capture.prefer_camera = false;
    }
    if cli.manual_read {
        config.session.auto_advance = false;
    }

    match cli.command {
        Some(Command::Read { file }) => read_once(&config, file).await,
        Some(Command::TestCamera) => test_camera(&config).await,
        Some(Command::TestSpeaker) => test_speaker().await,
        None => run_interactive(config).await,
    }
}

/// Build a session wired to the real collaborators
fn build_session(
    config: &Config,
    interactive: bool,
) -> anyhow::Result<CaptureSession<CpalPlayback>> {
    let camera = if config.capture.prefer_camera {
        CameraSource::detect(config.capture.camera_device.as_deref())
            .map(|c| Box::new(c) as Box<dyn story_reader::CaptureSource>)
    } else {
        None
    };

    if camera.is_some() {
        tracing::info!("camera available");
    } else {
        tracing::info!("using file chooser");
    }

    let session = CaptureSession::new(
        config,
        camera,
        FileSource::new(interactive),
        CpalPlayback::new(),
    )?;
    Ok(session)
}

/// Interactive session loop: render the view, accept actions
#[allow(clippy::future_not_send)]
async fn run_interactive(config: Config) -> anyhow::Result<()> {
    story_reader::remote::probe_health(&config.endpoints.base_url).await;

    let mut session = build_session(&config, true)?;

    println!("Story Reader - point a page at the camera or choose a file");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        render(&session);

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut parts = line.split_whitespace();

        match parts.next().unwrap_or("") {
            "c" | "capture" => session.trigger_capture().await,
            "f" | "file" => {
                if let Some(path) = parts.next() {
                    session.file_selected(PathBuf::from(path)).await;
                } else {
                    println!("usage: file <path>");
                }
            }
            "r" | "read" => session.read().await,
            "p" | "play" => session.play(),
            "s" | "pause" => session.pause(),
            "n" | "new" => session.new_photo(),
            "q" | "quit" => break,
            "" => {}
            other => println!("unknown action: {other}"),
        }
    }

    session.new_photo();
    Ok(())
}

/// Print the current view and the actions it offers
fn render(session: &CaptureSession<CpalPlayback>) {
    let view = session.view();

    if let Some(banner) = &view.banner {
        println!("! {banner}");
    }
    if view.text_panel {
        if let Some(text) = session.extracted_text() {
            println!("--- {text}");
        }
    }
    if view.busy {
        println!("... working ...");
        return;
    }

    let mut actions = Vec::new();
    if view.capture_button {
        actions.push("capture");
        actions.push("file <path>");
    }
    if view.read_button {
        actions.push("read");
    }
    if view.play_button {
        actions.push("play");
    }
    if view.pause_button {
        actions.push("pause");
    }
    if view.new_photo_button {
        actions.push("new");
    }
    actions.push("quit");
    println!("[{}]", actions.join(" | "));
}

/// Run the pipeline once on a file and wait for the narration to finish
#[allow(clippy::future_not_send)]
async fn read_once(config: &Config, file: PathBuf) -> anyhow::Result<()> {
    let mut session = build_session(config, false)?;

    session.file_selected(file).await;

    match session.stage() {
        Stage::Playing => {
            // Let the narration run to the end
            while session.view().pause_button {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            if let Some(text) = session.extracted_text() {
                println!("{text}");
            }
            session.new_photo();
            Ok(())
        }
        Stage::TextOnly => {
            if let Some(text) = session.extracted_text() {
                println!("{text}");
            }
            eprintln!("(narration unavailable)");
            Ok(())
        }
        _ => {
            let banner = session
                .banner()
                .unwrap_or("Something went wrong. Please try again.")
                .to_string();
            anyhow::bail!(banner)
        }
    }
}

/// Probe the camera and grab one frame
async fn test_camera(config: &Config) -> anyhow::Result<()> {
    use story_reader::CaptureSource;

    println!("Probing for a camera...");

    let Some(mut camera) = CameraSource::detect(config.capture.camera_device.as_deref()) else {
        anyhow::bail!("no camera found (need ffmpeg or fswebcam on PATH plus a video device)");
    };

    println!("Camera found, grabbing a frame...");
    let frame = camera.acquire().await?;

    println!(
        "Got a {}x{} {} frame ({} bytes)",
        frame.width(),
        frame.height(),
        frame.mime(),
        frame.size_bytes()
    );
    println!("\n---");
    println!("If the dimensions look right, your camera is working!");

    Ok(())
}

/// Play a sine tone through the playback sink
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    let mut playback = CpalPlayback::new();
    match playback.attach_pcm(samples, sample_rate) {
        PlaybackStart::Started => {
            while playback.status() == PlaybackStatus::Playing {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            println!("\n---");
            println!("If you heard the tone, your speakers are working!");
        }
        PlaybackStart::Blocked => {
            anyhow::bail!("no usable audio output device");
        }
    }

    Ok(())
}
