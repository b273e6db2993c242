use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codex_api_client::ApiClient;
use codex_engine::{EngineConfig, TimeCode};

#[derive(Parser, Clone, Debug)]
#[command(name = "codex", version, about = "Upload, search and replay analysed videos")]
pub struct Config {
    /// Backend base URL
    #[arg(long, env = "CODEX_API_URL", default_value = "http://127.0.0.1:8000")]
    pub api_url: String,

    /// Bearer token sent with backend requests
    #[arg(long, env = "CODEX_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Timeout for JSON requests in seconds
    #[arg(long, env = "CODEX_REQUEST_TIMEOUT_SECS", default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout_secs: u64,

    /// Library poll interval in seconds
    #[arg(long, env = "CODEX_POLL_INTERVAL_SECS", default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// How long notifications stay visible in seconds
    #[arg(long, env = "CODEX_NOTIFICATION_SECS", default_value = "4")]
    pub notification_secs: u64,

    /// Log filter, e.g. `info` or `codex_engine=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Command {
    /// Upload a video and register it with the library
    Upload {
        path: PathBuf,

        /// Keep polling until the backend has finished processing the upload
        #[arg(long)]
        wait: bool,
    },
    /// Poll the library and print processing notifications
    Watch,
    /// List the library, newest first
    Library {
        /// Resolve signed playback URLs
        #[arg(long)]
        urls: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Natural-language search over analysed videos
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Replay an asset on a simulated clock, following its chapters
    Play {
        asset_id: u64,

        /// Start offset, e.g. `01:30`
        #[arg(long, value_parser = parse_timecode)]
        start: Option<TimeCode>,

        /// Jump to this chapter (0-based) once playback begins
        #[arg(long, conflicts_with = "start")]
        chapter: Option<usize>,

        /// Media duration in seconds; defaults to one minute past the last chapter
        #[arg(long, value_parser = parse_positive)]
        duration: Option<f64>,

        /// Simulated seconds per wall-clock second
        #[arg(long, default_value = "1.0", value_parser = parse_positive)]
        speed: f64,

        /// Capture a timestamped note line at every chapter change
        #[arg(long)]
        notes: bool,
    },
}

impl Config {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            notification_ttl: Duration::from_secs(self.notification_secs),
            ..EngineConfig::default()
        }
    }

    pub fn api_client(&self) -> codex_api_client::Result<ApiClient> {
        ApiClient::with_request_timeout(
            self.api_url.clone(),
            self.api_token.clone(),
            Duration::from_secs(self.request_timeout_secs),
        )
    }
}

fn parse_timecode(text: &str) -> Result<TimeCode, String> {
    let start = TimeCode::parse(text);
    if start.is_zero() && !text.trim().chars().all(|c| c == '0' || c == ':') {
        return Err(format!("`{text}` is not a [HH:]MM:SS timecode"));
    }
    Ok(start)
}

fn parse_positive(text: &str) -> Result<f64, String> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| format!("`{text}` is not a number"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("`{text}` must be a positive, finite number"));
    }
    Ok(value)
}
