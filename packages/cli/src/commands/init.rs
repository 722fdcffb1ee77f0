use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use convo_editor::{ResyncStrategy, SessionConfig};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Prefix for request ids issued by this client
    #[arg(short, long, default_value = "client")]
    pub client_id: String,

    /// Trust the text already streamed when attaching to a message
    #[arg(long)]
    pub trust_seed: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let resync_strategy = if args.trust_seed {
        ResyncStrategy::TrustSeed
    } else {
        ResyncStrategy::Replay
    };

    let config = Config {
        session: SessionConfig {
            client_id: args.client_id,
            resync_strategy,
            ..SessionConfig::default()
        },
        ..Config::default()
    };

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. Record server frames to a .jsonl file, one message per line");
    println!("  2. Run: convo replay frames.jsonl --dump");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();

        init(
            InitArgs {
                client_id: "tab".to_string(),
                trust_seed: true,
                force: false,
            },
            cwd,
        )
        .unwrap();

        let config = Config::load(cwd).unwrap();
        assert_eq!(config.session.client_id, "tab");
        assert_eq!(config.session.resync_strategy, ResyncStrategy::TrustSeed);
    }

    #[test]
    fn test_init_keeps_existing_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_str().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "logFilter": "debug" }"#).unwrap();

        init(
            InitArgs {
                client_id: "tab".to_string(),
                trust_seed: false,
                force: false,
            },
            cwd,
        )
        .unwrap();

        assert_eq!(Config::load(cwd).unwrap().log_filter, "debug");
    }
}
