// ABOUTME: Main application entry point.
// ABOUTME: Parses flags, sets up logging, and runs the wall from stdin commands.

mod command;
mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wall_control::LoggingBackend;
use wall_core::Config;

use command::Command;
use session::Session;

#[derive(Parser, Debug)]
#[command(name = "videowall", version, about = "Play many videos at once on a split wall")]
struct Args {
    /// Log every media command
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Open this saved layout instead of the last one
    #[arg(short, long)]
    layout: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else if args.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    tracing::info!("Starting videowall");

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(),
    };

    let mut session = Session::open(config, LoggingBackend::new());
    tracing::info!(
        "Wall ready with {} players",
        session.controller().tree().leaf_count()
    );
    if let Some(name) = args.layout {
        let output = session.execute(Command::Open(name))?;
        println!("{}", output);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    println!("{}", session.render());
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        if !line.trim().is_empty() {
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => match session.execute(command) {
                    Ok(output) if output.is_empty() => {}
                    Ok(output) => println!("{}", output),
                    Err(e) => println!("error: {:#}", e),
                },
                Err(e) => println!("error: {:#}", e),
            }
        }
        print!("> ");
        stdout.flush()?;
    }

    let backend = session.close();
    tracing::info!("Sent {} media commands, exiting", backend.applied());
    Ok(())
}
