mod config;
mod terminal;

use crate::config::Config;
use crate::terminal::TerminalProjection;
use anyhow::{Context, Result};
use clap::Parser;
use dali_voice::client::{Transport, TransportConfig};
use dali_voice::session::{Session, SessionEvent, UserAction};
use dali_voice::speech::{
    CommandRecognizer, CommandSynthesizer, NoRecognizer, NoSynthesizer, RecognitionAdapter,
    RecognitionEngine, SynthesisAdapter, SynthesisEngine,
};
use dali_voice::Runtime;
use std::io::BufRead;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;

const EVENT_QUEUE_CAPACITY: usize = 1024;

#[derive(Parser)]
#[command(version, about = "Terminal client for the DALI voice assistant")]
struct Cli {
    /// Backend WebSocket endpoint, overrides DALI_WS_URL
    #[arg(long)]
    url: Option<String>,
    /// Start with speech output off
    #[arg(long)]
    no_tts: bool,
    /// Start in voice mode
    #[arg(long)]
    voice: bool,
    /// Read settings from this file instead of the environment
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = match &args.env_file {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
    .context("Failed to load application configuration")?;
    if let Some(url) = args.url {
        config.ws_url = url;
    }
    if args.no_tts {
        config.tts_enabled = false;
    }

    // Logs go to stderr so they stay out of the conversation on stdout.
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("connecting to {}", config.ws_url);

    let (events_tx, events_rx) = mpsc::channel::<SessionEvent>(EVENT_QUEUE_CAPACITY);

    let mut transport_config = TransportConfig::builder().with_url(&config.ws_url);
    if let Some(interval) = config.ping_interval {
        transport_config = transport_config.with_ping_interval(interval);
    }
    let transport = Transport::new(transport_config.build(), events_tx.clone());

    let input = RecognitionAdapter::new(recognizer(&config), events_tx.clone());
    let output = SynthesisAdapter::new(synthesizer(&config), events_tx.clone());

    spawn_stdin_reader(events_tx.clone());
    spawn_ctrl_c_handler(events_tx.clone());
    if args.voice {
        events_tx
            .send(UserAction::ToggleVoiceMode.into())
            .await
            .context("Failed to queue voice mode")?;
    }

    let session = Session::new().with_tts_enabled(config.tts_enabled);
    let runtime = Runtime::new(
        transport,
        input,
        output,
        TerminalProjection::stdout(),
        events_tx,
        events_rx,
    )
    .with_session(session)
    .with_reconnect_delay(config.reconnect_delay)
    .with_voice_idle_timeout(config.voice_idle_timeout);

    let session = runtime.run().await;
    tracing::info!(
        "session finished (id={})",
        session.session_id().unwrap_or("none")
    );
    Ok(())
}

fn recognizer(config: &Config) -> Box<dyn RecognitionEngine> {
    match config
        .recognizer_cmd
        .as_deref()
        .and_then(CommandRecognizer::from_command_line)
    {
        Some(recognizer) => {
            tracing::info!("speech recognition via `{}`", recognizer.program());
            Box::new(recognizer)
        }
        None => {
            tracing::info!("no recognizer configured, voice input unavailable");
            Box::new(NoRecognizer)
        }
    }
}

fn synthesizer(config: &Config) -> Box<dyn SynthesisEngine> {
    match config
        .synth_cmd
        .as_deref()
        .and_then(CommandSynthesizer::from_command_line)
    {
        Some(synth) => match &config.synth_language_flag {
            Some(flag) => Box::new(synth.with_language_flag(flag)),
            None => Box::new(synth),
        },
        None => {
            tracing::info!("no synthesizer configured, voice output unavailable");
            Box::new(NoSynthesizer)
        }
    }
}

/// Maps a line typed at the prompt to a user action.
fn parse_line(line: &str) -> Option<UserAction> {
    match line.trim() {
        "" => None,
        "/voice" => Some(UserAction::ToggleVoiceMode),
        "/tts" => Some(UserAction::ToggleTts),
        "/reconnect" => Some(UserAction::Reconnect),
        "/quit" | "/exit" => Some(UserAction::Quit),
        text => Some(UserAction::SubmitText(text.to_string())),
    }
}

// A plain thread, so a read still pending at exit does not hold up runtime shutdown.
fn spawn_stdin_reader(events: mpsc::Sender<SessionEvent>) {
    let spawned = std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || read_lines(std::io::stdin().lock(), &events));
    if let Err(e) = spawned {
        tracing::error!("failed to start stdin reader: {}", e);
    }
}

/// Queues one action per input line. End of input quits.
fn read_lines(reader: impl BufRead, events: &mpsc::Sender<SessionEvent>) {
    let mut lines = reader.lines();
    loop {
        let action = match lines.next() {
            Some(Ok(line)) => match parse_line(&line) {
                Some(action) => action,
                None => continue,
            },
            None => UserAction::Quit,
            Some(Err(e)) => {
                tracing::error!("failed to read stdin: {}", e);
                UserAction::Quit
            }
        };
        let quit = action == UserAction::Quit;
        if events.blocking_send(action.into()).is_err() || quit {
            break;
        }
    }
}

fn spawn_ctrl_c_handler(events: mpsc::Sender<SessionEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            return;
        }
        if let Err(e) = events.send(UserAction::Quit.into()).await {
            tracing::debug!("failed to queue quit: {}", e);
        }
    });
}
