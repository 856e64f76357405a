use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Turn a YouTube video into normalized transcript text
    Ingest {
        /// Video URL
        #[arg(short, long)]
        url: String,

        /// Caption languages in order of preference (comma-separated)
        #[arg(short, long)]
        langs: Option<String>,

        /// Fail instead of taking captions in another language
        #[arg(long)]
        no_any_language: bool,

        /// How to reduce oversized transcripts: truncate or single_summarize
        #[arg(long)]
        length_mode: Option<String>,

        /// Output budget in characters
        #[arg(long)]
        max_chars: Option<usize>,

        /// Instruction for the summarization call
        #[arg(long)]
        summarize_instruction: Option<String>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite text, a web page, a file or a video transcript
    Rewrite {
        #[command(flatten)]
        source: SourceArgs,

        /// Rewrite instruction, e.g. "Rewrite this as a product announcement"
        #[arg(short, long)]
        instruction: Option<String>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the caption tracks of a video
    Captions {
        /// Video URL
        #[arg(short, long)]
        url: String,
    },

    /// Show video metadata and whether it passes the ingestion checks
    Probe {
        /// Video URL
        #[arg(short, long)]
        url: String,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "reangle.toml")]
        path: PathBuf,
    },
}

/// Exactly one input source
#[derive(ClapArgs)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Text to rewrite
    #[arg(long)]
    pub text: Option<String>,

    /// Web page to extract and rewrite
    #[arg(long)]
    pub url: Option<String>,

    /// Local .txt or .md file
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// YouTube video whose transcript is rewritten
    #[arg(long)]
    pub youtube: Option<String>,
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
