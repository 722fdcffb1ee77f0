mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{buffer, init, replay, BufferArgs, InitArgs, ReplayArgs};
use config::Config;

/// Convo CLI - inspect replicated chat sessions
#[derive(Parser, Debug)]
#[command(name = "convo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a convo.config.json
    Init(InitArgs),

    /// Feed recorded server messages through a chat session
    Replay(ReplayArgs),

    /// Show how deltas pass through the streaming buffer
    Buffer(BufferArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    let config = Config::load(&cwd)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Replay(args) => replay(args, &config, &cwd),
        Command::Buffer(args) => buffer(args),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
