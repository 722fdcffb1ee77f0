use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use convo_editor::{
    ChatSession, EventRecorder, Handled, RecordingTransport, ReplicaEvent, ServerMessage,
    SessionConfig,
};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// File of server messages, one JSON object per line
    pub input: PathBuf,

    /// Chat to subscribe to (defaults to the first snapshot in the file)
    #[arg(short, long)]
    pub chat: Option<String>,

    /// Print the final document as JSON
    #[arg(long)]
    pub dump: bool,

    /// Print confirmed text every time it grows
    #[arg(short, long)]
    pub verbose: bool,
}

/// Counts of what happened to each frame
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub snapshots: usize,
    pub applied: usize,
    pub echoes: usize,
    pub dropped: usize,
    pub ignored: usize,
    pub errors: usize,
}

/// A finished replay
pub struct Replay {
    pub session: ChatSession<RecordingTransport>,
    pub summary: ReplaySummary,
    pub events: EventRecorder,
    /// (line number, error) for every frame that failed
    pub failures: Vec<(usize, String)>,
}

/// Frames worth feeding: blank lines and `#` comments are skipped.
fn frames(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Chat id of the first snapshot in `source`.
fn first_snapshot_chat(source: &str) -> Option<String> {
    frames(source).find_map(|(_, line)| match ServerMessage::decode(line) {
        Ok(ServerMessage::ChatOpened { chat }) => Some(chat.id),
        _ => None,
    })
}

/// Feed every frame of `source` to a fresh session.
pub fn run_replay(source: &str, chat: Option<String>, config: SessionConfig) -> Result<Replay> {
    let chat_id = chat
        .or_else(|| first_snapshot_chat(source))
        .ok_or_else(|| anyhow!("no chat given and no ChatOpenedServerMessage in input"))?;

    let mut session = ChatSession::open(chat_id, RecordingTransport::new(), config)?;
    let events = EventRecorder::new();
    session.subscribe(events.clone());

    let mut summary = ReplaySummary::default();
    let mut failures = Vec::new();

    for (line_number, line) in frames(source) {
        summary.frames += 1;
        match session.handle_text(line) {
            Ok(Handled::Snapshot) => summary.snapshots += 1,
            Ok(Handled::Applied(_)) => summary.applied += 1,
            Ok(Handled::Echo { .. }) => summary.echoes += 1,
            Ok(Handled::Dropped) => summary.dropped += 1,
            Ok(Handled::Ignored) => summary.ignored += 1,
            Err(e) => {
                summary.errors += 1;
                tracing::debug!(line = line_number, error = %e, "frame failed");
                failures.push((line_number, e.to_string()));
            }
        }
    }

    Ok(Replay {
        session,
        summary,
        events,
        failures,
    })
}

pub fn replay(args: ReplayArgs, config: &Config, cwd: &str) -> Result<()> {
    let path = PathBuf::from(cwd).join(&args.input);
    let source =
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;

    println!("{} {}", "▶ Replaying".bright_blue().bold(), path.display());

    let replay = run_replay(&source, args.chat, config.session.clone())?;

    for event in replay.events.events() {
        print_event(&event, args.verbose);
    }

    for (line, error) in &replay.failures {
        println!("  {} line {}: {}", "✗".red(), line, error);
    }

    let summary = &replay.summary;
    println!();
    println!(
        "{} {} frames: {} snapshots, {} applied, {} echoes, {} dropped, {} ignored, {} errors",
        "Done".green().bold(),
        summary.frames,
        summary.snapshots,
        summary.applied,
        summary.echoes,
        summary.dropped,
        summary.ignored,
        summary.errors,
    );
    println!(
        "   Version {}, {} requests sent",
        replay.session.version(),
        replay.session.transport().sent().len()
    );
    if replay.session.needs_resync() {
        println!("   {} replica ended out of sync", "⚠️".yellow());
    }

    if args.dump {
        println!();
        println!("{}", serde_json::to_string_pretty(replay.session.document())?);
    }

    Ok(())
}

fn print_event(event: &ReplicaEvent, verbose: bool) {
    match event {
        ReplicaEvent::ContentConfirmed {
            message_id,
            content,
        } if verbose => {
            println!("  {} {}: {}", "…".dimmed(), message_id, content.dimmed());
        }
        ReplicaEvent::ContentConfirmed { .. } => {}
        ReplicaEvent::StreamFinished {
            message_id,
            content,
        } => {
            println!("  {} {} finished", "✓".green(), message_id.bright_white());
            for line in content.lines() {
                println!("    {}", line);
            }
        }
        ReplicaEvent::SnapshotApplied { chat_id } => {
            println!("  {} snapshot of {}", "●".cyan(), chat_id);
        }
        ReplicaEvent::ResyncRequested { reason } => {
            println!("  {} resync requested: {}", "⚠️".yellow(), reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMES: &str = r#"
# snapshot, then one streamed message
{"type":"ChatOpenedServerMessage","chat":{"id":"c1","message_groups":[{"id":"g1","actor_id":{"type":"agent","id":"coder"},"messages":[{"id":"m1","content":"","is_streaming":true}]}]}}
{"type":"NotifyAboutChatMutationServerMessage","mutation":{"type":"AppendToStringMutation","ref":{"id":"m1","parent_collection":{"id":"messages","parent":{"id":"g1","parent_collection":{"id":"message_groups","parent":{"id":"c1","parent_collection":{"id":"assets","parent":null}}}}}},"key":"content","value":"Hi [there](x)"}}
{"type":"NotifyAboutChatMutationServerMessage","mutation":{"type":"SetValueMutation","ref":{"id":"m1","parent_collection":{"id":"messages","parent":{"id":"g1","parent_collection":{"id":"message_groups","parent":{"id":"c1","parent_collection":{"id":"assets","parent":null}}}}}},"key":"is_streaming","value":false}}
{"type":"NotificationServerMessage","title":"Saved","message":"ok"}
not json
"#;

    #[test]
    fn test_replay_counts_frames() {
        let replay = run_replay(FRAMES, None, SessionConfig::default()).unwrap();

        assert_eq!(
            replay.summary,
            ReplaySummary {
                frames: 5,
                snapshots: 1,
                applied: 2,
                echoes: 0,
                dropped: 0,
                ignored: 1,
                errors: 1,
            }
        );
        assert_eq!(replay.failures[0].0, 7);
        assert_eq!(replay.session.confirmed_content("m1"), Some("Hi [there](x)"));
        assert_eq!(
            replay.events.finished(),
            vec![("m1".to_string(), "Hi [there](x)".to_string())]
        );
    }

    #[test]
    fn test_replay_needs_a_chat() {
        let result = run_replay(
            r#"{"type":"NotificationServerMessage","title":"t","message":"m"}"#,
            None,
            SessionConfig::default(),
        );
        assert!(result.is_err());
    }
}
