//! Tailwatch - follow a file and print each new line.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_stream::StreamExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tailwatch::config::ConfigLoader;
use tailwatch::watcher::{TailEvent, TailSession, WatchOptions};

#[derive(Parser)]
#[command(
    name = "tailwatch",
    about = "Follow a file and print each newly completed line",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Byte offset to resume from (defaults to the end of the file).
    #[arg(short, long)]
    cursor: Option<u64>,

    /// Config file to use instead of the default search paths.
    #[arg(long)]
    config: Option<PathBuf>,

    /// File to follow. It does not have to exist yet.
    path: PathBuf,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = cli.config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tailwatch: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (mut session, mut events) = match TailSession::with_config(&cli.path, &config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("tailwatch: {e}");
            return ExitCode::FAILURE;
        }
    };

    let options = WatchOptions { cursor: cli.cursor };
    if let Err(e) = session.watch(options).await {
        eprintln!("tailwatch: {e}");
        return ExitCode::FAILURE;
    }
    tracing::info!(path = %cli.path.display(), "Following file");

    let status = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break ExitCode::SUCCESS,
            event = events.next() => match event {
                Some(TailEvent::Line(line)) => println!("{line}"),
                Some(TailEvent::Error(e)) => {
                    eprintln!("tailwatch: {e}");
                    break ExitCode::FAILURE;
                }
                None => break ExitCode::SUCCESS,
            },
        }
    };

    // Every line queued by the time unwatch returns is counted in the cursor
    let cursor = session.unwatch().await;
    let mut pending = events.into_inner();
    while let Ok(event) = pending.try_recv() {
        match event {
            TailEvent::Line(line) => println!("{line}"),
            TailEvent::Error(e) => eprintln!("tailwatch: {e}"),
        }
    }
    eprintln!("cursor: {cursor}");
    status
}
