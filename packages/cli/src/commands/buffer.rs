use anyhow::Result;
use clap::Args;
use colored::Colorize;
use convo_editor::{MessageBuffer, ResyncStrategy};

#[derive(Debug, Args)]
pub struct BufferArgs {
    /// Deltas to feed, in order
    #[arg(required = true)]
    pub deltas: Vec<String>,

    /// Text already streamed before the first delta
    #[arg(long)]
    pub seed: Option<String>,

    /// Take the seed as confirmed instead of replaying it
    #[arg(long)]
    pub trust_seed: bool,
}

/// Confirmed output and withheld tail after each delta
pub fn trace(args: &BufferArgs) -> (Vec<(String, String)>, String) {
    let strategy = if args.trust_seed {
        ResyncStrategy::TrustSeed
    } else {
        ResyncStrategy::Replay
    };
    let mut buffer = match &args.seed {
        Some(seed) => strategy.attach(seed),
        None => MessageBuffer::new(),
    };

    let steps = args
        .deltas
        .iter()
        .map(|delta| {
            buffer.process_delta(delta);
            (buffer.confirmed().to_string(), buffer.pending().to_string())
        })
        .collect();

    (steps, buffer.finish())
}

pub fn buffer(args: BufferArgs) -> Result<()> {
    let (steps, finished) = trace(&args);

    for (delta, (confirmed, pending)) in args.deltas.iter().zip(&steps) {
        println!(
            "{:>14} │ {}{}",
            format!("{delta:?}").bright_white(),
            confirmed,
            pending.dimmed()
        );
    }

    println!();
    println!("{} {}", "Finished:".green().bold(), finished);
    Ok(())
}
