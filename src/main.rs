use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use solace::pipeline::{self, open_chat_session, respond, speak_into, speech_bridge};
use solace::voice::open_playback_sink;
use solace::{CancelToken, Config, EmotionAnalysis};

/// Solace - emotion-aware therapist replies, spoken aloud
#[derive(Parser)]
#[command(name = "solace", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a reply for an emotion analysis and speak it (default)
    Run {
        /// Emotion analysis JSON file; the built-in sample when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Generate and print a reply without speaking it
    Reply {
        /// Emotion analysis JSON file; the built-in sample when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Speak arbitrary text
    Say {
        /// Text to speak
        text: String,
    },
    /// Run the companion HTTP/WebSocket server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,solace=info",
        1 => "info,solace=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
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
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    // Ctrl-C cancels whatever remote call is in flight
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            trigger.cancel();
        }
    });

    match cli.command.unwrap_or(Command::Run { input: None }) {
        Command::Run { input } => run_full(&config, input.as_deref(), &cancel).await,
        Command::Reply { input } => {
            let analysis = load_analysis(input.as_deref())?;
            let reply = pipeline::reply(&config, &analysis, &cancel).await?;
            println!("{reply}");
            Ok(())
        }
        Command::Say { text } => {
            let report = pipeline::speak(&config, &text, &cancel).await?;
            tracing::info!(chunks = report.chunks, bytes = report.bytes, "playback complete");
            Ok(())
        }
        Command::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let state = solace::api::ApiState::from_config(&config, cancel);
            solace::api::serve(state, port).await?;
            Ok(())
        }
    }
}

/// Emotion data → reply (printed) → speech
#[allow(clippy::future_not_send)]
async fn run_full(
    config: &Config,
    input: Option<&Path>,
    cancel: &CancelToken,
) -> anyhow::Result<()> {
    let analysis = load_analysis(input)?;

    // Both credentials are checked before any network call
    let mut session = open_chat_session(config)?;
    let bridge = speech_bridge(config)?;
    let tts = config.tts_config()?;

    let reply = respond(&config.prompt_builder(), &mut session, &analysis, cancel).await;
    session.close();
    let reply = reply?;
    println!("{reply}");

    let sink = open_playback_sink(tts.sampling_rate())?;
    let report = speak_into(&bridge, sink, &reply, &tts, cancel).await?;
    tracing::info!(chunks = report.chunks, bytes = report.bytes, "playback complete");

    Ok(())
}

fn load_analysis(input: Option<&Path>) -> anyhow::Result<EmotionAnalysis> {
    let Some(path) = input else {
        return Ok(EmotionAnalysis::sample());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    Ok(EmotionAnalysis::from_json(&json)?)
}
