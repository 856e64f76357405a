//! reangle - multi-source content ingestion and rewriting
//!
//! Entry point: turns YouTube videos, web pages, files and text into clean
//! source text and rewrites it with the configured LLM provider.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use reangle::cli::{Args, Commands, SourceArgs, split_list};
use reangle::config::Config;
use reangle::error::ReangleError;
use reangle::ingest::IngestRequest;
use reangle::sources::Source;
use reangle::workflow::Workflow;
use reangle::youtube::TranscriptType;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("reangle.toml").exists() {
                info!("Found reangle.toml in current directory, loading...");
                Config::from_file("reangle.toml")?
            } else {
                Config::default()
            }
        }
    };

    if let Err(e) = run(args.command, config).await {
        error!("{} ({})", e, e.code());
        eprintln!("Error [{}]: {}", e.code(), e);
        std::process::exit(exit_code(&e));
    }

    Ok(())
}

async fn run(command: Commands, config: Config) -> reangle::error::Result<()> {
    match command {
        Commands::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        Commands::Ingest {
            url,
            langs,
            no_any_language,
            length_mode,
            max_chars,
            summarize_instruction,
            json,
            output,
        } => {
            let mut request = IngestRequest::from_config(&url, &config);
            if let Some(langs) = langs {
                request.preferred_languages = Some(split_list(&langs));
            }
            if no_any_language {
                request.allow_any_language_fallback = false;
            }
            if let Some(mode) = length_mode {
                request.length_mode = mode.parse()?;
            }
            if let Some(max_chars) = max_chars {
                request.max_chars = max_chars;
            }
            if summarize_instruction.is_some() {
                request.summarize_instruction = summarize_instruction;
            }

            let workflow = Workflow::new(config)?;
            let outcome = with_spinner("Ingesting video...", workflow.ingest(&request)).await?;
            info!(
                "{} \"{}\": {} chars ({:?})",
                outcome.meta.video_id, outcome.meta.title, outcome.meta.final_length, outcome.meta.length_mode
            );

            let rendered = if json {
                serde_json::to_string_pretty(&outcome)?
            } else {
                outcome.text
            };
            emit(&rendered, output.as_deref()).await?;
        }
        Commands::Rewrite {
            source,
            instruction,
            json,
            output,
        } => {
            let source = to_source(source, &config)?;
            let workflow = Workflow::new(config)?;
            let outcome = with_spinner("Rewriting...", workflow.rewrite(&source, instruction.as_deref())).await?;

            let rendered = if json {
                serde_json::to_string_pretty(&outcome)?
            } else {
                outcome.rewritten
            };
            emit(&rendered, output.as_deref()).await?;
        }
        Commands::Captions { url } => {
            let workflow = Workflow::new(config)?;
            let (identity, tracks) = with_spinner("Listing captions...", workflow.captions(&url)).await?;

            println!("\nCaption tracks for {} ({}):", identity.video_id, identity.source_host);
            println!("{:<15} {:<8} {:<8} {:<30}", "Language", "Type", "Format", "Name");
            println!("{}", "-".repeat(65));
            for track in &tracks {
                let kind = match TranscriptType::of(track) {
                    TranscriptType::Human => "human",
                    TranscriptType::Auto => "auto",
                };
                println!(
                    "{:<15} {:<8} {:<8} {:<30}",
                    track.language_code,
                    kind,
                    track.ext.as_deref().unwrap_or("-"),
                    track.name.as_deref().unwrap_or("")
                );
            }
            if tracks.is_empty() {
                println!("No caption tracks found.");
            }
        }
        Commands::Probe { url } => {
            let workflow = Workflow::new(config)?;
            let metadata = with_spinner("Probing video...", workflow.probe(&url)).await?;

            println!("\nVideo:        {}", metadata.video_id);
            println!("Title:        {}", metadata.title);
            println!("Duration:     {}", format_duration(metadata.duration_seconds));
            println!("Availability: {:?}", metadata.availability);
            println!("Age limit:    {}", metadata.age_limit);
        }
    }

    Ok(())
}

fn to_source(args: SourceArgs, config: &Config) -> reangle::error::Result<Source> {
    match args {
        SourceArgs { text: Some(text), .. } => Ok(Source::Text(text)),
        SourceArgs { url: Some(url), .. } => Ok(Source::Url(url)),
        SourceArgs { file: Some(file), .. } => Ok(Source::File(file)),
        SourceArgs { youtube: Some(url), .. } => Ok(Source::YouTube(IngestRequest::from_config(url, config))),
        _ => Err(ReangleError::InvalidInput("no source given".to_string())),
    }
}

/// Show a spinner while `future` runs
async fn with_spinner<T>(message: &'static str, future: impl Future<Output = T>) -> T {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = future.await;
    pb.finish_and_clear();
    result
}

async fn emit(content: &str, output: Option<&Path>) -> reangle::error::Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, content).await?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn exit_code(e: &ReangleError) -> i32 {
    match e.status_code() {
        400 => 2,
        422 => 3,
        502 => 4,
        _ => 1,
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".reangle").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "reangle.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("reangle.log").display());

    Ok(())
}

/// Format duration in seconds to human readable string
fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
