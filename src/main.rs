//! Demo REPL for the quill engine.
//!
//! Runs the editing core against a terminal chat loop: type plain messages
//! or slash commands, and replay canned AI responses from a script file to
//! watch edit/write commands land in the document. There is no model
//! behind this binary - the AI relay is a separate concern - so without a
//! script, non-command messages just report that nothing is connected.

use anyhow::{Context as _, Result};
use clap::Parser;
use quill::chat::Role;
use quill::engine::{Engine, UserTurn};
use quill::persistence::{self, DocumentMetadata, StorageContext};
use quill::EngineConfig;
use std::io::{BufRead, Write as _};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// An AI-assisted document editor core, driven from the terminal.
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "AI-assisted rich-text document engine demo", long_about = None)]
struct Args {
    /// Data directory for persisted state (default: platform data dir)
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Path to a JSON configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Script of canned AI responses, separated by lines containing `---`.
    /// Each non-command user message consumes the next response.
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,

    /// Don't load or save persisted state
    #[arg(long)]
    no_persist: bool,
}

fn data_dir(args: &Args) -> Result<PathBuf> {
    if let Some(dir) = &args.data_dir {
        return Ok(dir.clone());
    }
    Ok(dirs::data_dir()
        .context("could not determine data directory")?
        .join("quill"))
}

fn load_script(path: &std::path::Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    let mut replies = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim() == "---" {
            if !current.trim().is_empty() {
                replies.push(current.trim_end().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    if !current.trim().is_empty() {
        replies.push(current.trim_end().to_string());
    }
    Ok(replies)
}

/// Run the active stream to completion, pacing with real sleeps so the
/// typing effect is visible in the printed document.
fn drive_stream(engine: &mut Engine) {
    let interval = Duration::from_millis(engine.config().stream_interval_ms);
    while engine.tick(Instant::now()) {
        std::thread::sleep(interval);
    }
}

/// Print any transcript messages newer than `last_seen`, returning the
/// newest id printed.
fn print_new_messages(engine: &Engine, last_seen: Option<u64>) -> Option<u64> {
    let mut newest = last_seen;
    for message in engine.transcript().messages() {
        if last_seen.is_some_and(|seen| message.id <= seen) {
            continue;
        }
        let prefix = match message.role {
            Role::User => "you",
            Role::Ai => "ai",
            Role::System => "system",
        };
        println!("[{prefix}] {}", message.text);
        newest = Some(message.id);
    }
    newest
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let storage = StorageContext::at(data_dir(&args)?);
    let mut engine = if args.no_persist {
        Engine::new(config)
    } else {
        let saved = persistence::load_state(&storage)?;
        let mut engine =
            Engine::with_document(config, saved.document, saved.metadata.title.clone());
        engine.restore_transcript(saved.messages);
        engine
    };

    let mut script = match &args.script {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };
    script.reverse(); // pop from the back in order

    println!("quill - type /help for commands, :doc to print the document, :quit to exit");
    let mut last_seen = engine.transcript().messages().last().map(|m| m.id);

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        match line {
            ":quit" | ":q" => break,
            ":doc" => {
                println!("{}", engine.document().plain_text());
                continue;
            }
            ":context" => {
                println!("{}", engine.outbound_prompt());
                continue;
            }
            "" => continue,
            _ => {}
        }

        let now = Instant::now();
        if engine.handle_user_message(line, now) == UserTurn::ForwardToAi {
            match script.pop() {
                Some(reply) => engine.handle_ai_response(&reply, Instant::now()),
                None => engine.handle_ai_error("no AI relay connected (use --script)"),
            }
        }
        drive_stream(&mut engine);
        last_seen = print_new_messages(&engine, last_seen);
    }

    if !args.no_persist {
        let metadata = DocumentMetadata {
            title: engine.outbound_context().document_title.clone(),
            last_edit: engine.outbound_context().last_edit,
        };
        persistence::save_state(
            &storage,
            engine.document(),
            engine.transcript().messages(),
            &metadata,
        )?;
    }
    Ok(())
}
