//! chatedit CLI: replay saved model responses through a chat session.
//!
//! Useful for checking what the extractor makes of a response without a
//! live model: events are printed to stdout as JSON lines.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use chatedit::logging::{self, LogTarget};
use chatedit::response::{extract_recommendations, path_classifier};
use chatedit::{ChannelSink, ChatEditConfig, ChatSession, LocalFileIo};

#[derive(Parser, Debug)]
#[command(
    name = "chatedit",
    about = "Turn streamed model responses into reviewable file edits",
    version
)]
struct Args {
    /// Config file (defaults to CHATEDIT_CONFIG or .chatedit/config.yaml found upward)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(long, global = true)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a saved response through a session, printing chat events
    Replay {
        /// File holding the raw model response
        file: PathBuf,

        /// Characters per simulated chunk
        #[arg(long, default_value_t = 16)]
        chunk_size: usize,

        /// Apply every recommendation once the response is finalized
        #[arg(long)]
        apply: bool,
    },
    /// Print the recommendations extracted from a saved response
    Extract {
        file: PathBuf,
    },
    /// Report whether each candidate string is accepted as a file path
    CheckPath {
        #[arg(required = true)]
        candidates: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let target = if args.log_stderr {
        LogTarget::Stderr
    } else {
        LogTarget::DataDir
    };
    logging::init(target).context("failed to initialize logging")?;

    match args.command {
        Command::Replay {
            file,
            chunk_size,
            apply,
        } => {
            let config = ChatEditConfig::load_or_default(args.config.as_deref());
            replay(&config, &file, chunk_size, apply).await
        }
        Command::Extract { file } => {
            let text = read_response(&file)?;
            let recommendations = extract_recommendations(&text);
            println!("{}", serde_json::to_string_pretty(&recommendations)?);
            Ok(())
        }
        Command::CheckPath { candidates } => {
            for candidate in candidates {
                match path_classifier::rejection_reason(&candidate) {
                    Some(reason) => println!("reject\t{candidate}\t{reason}"),
                    None if path_classifier::is_valid_path(&candidate) => {
                        println!("accept\t{candidate}")
                    }
                    None => println!("reject\t{candidate}\tno_path_signal"),
                }
            }
            Ok(())
        }
    }
}

fn read_response(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

async fn replay(config: &ChatEditConfig, file: &Path, chunk_size: usize, apply: bool) -> Result<()> {
    let text = read_response(file)?;

    let (sink, mut events) = ChannelSink::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to serialize chat event"),
            }
        }
    });

    let file_io = Arc::new(LocalFileIo::from_config(config));
    let mut session = ChatSession::from_config(config, file_io, Arc::new(sink));

    let request_id = session.begin_request(&format!("replay {}", file.display())).await;
    let chunks = split_chunks(&text, chunk_size.max(1));
    let stream = futures::stream::iter(chunks.into_iter().map(Ok::<String, Infallible>));

    session
        .stream_response(&request_id, stream)
        .await
        .context("replay stream failed")?;

    if apply {
        let results = session.apply_recommendation(&request_id, "*").await;
        eprintln!("{}", serde_json::to_string(&results)?);
    }

    // Closing the sink ends the printer.
    drop(session);
    printer.await.context("event printer panicked")?;
    Ok(())
}

/// Split on character boundaries into chunks of at most `size` characters.
fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}
