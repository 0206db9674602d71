use crate::fetch::DEFAULT_STATS_PATH;
use crate::report::ImageFormat;
use crate::symbols::SymbolizeMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gom")]
#[command(about = "Live profiling dashboard for processes exposing pprof endpoints")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Base URL of the target's debug server
    #[arg(long, short = 't', global = true, default_value = "http://localhost:6060")]
    pub target: String,

    /// Timeout for every request to the target
    #[arg(long, global = true, default_value = "60s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Dashboard refresh interval
    #[arg(long, short = 'i', default_value = "1s", value_parser = parse_duration)]
    pub interval: Duration,

    /// Profile kind shown when the dashboard starts
    #[arg(long, short = 'p', default_value = "heap")]
    pub profile: String,

    /// How addresses are resolved to function names
    #[arg(long, global = true, value_enum, default_value_t = SymbolizeMode::Auto)]
    pub symbolize: SymbolizeMode,

    /// Target binary for local symbolization
    #[arg(long, short = 'b', global = true)]
    pub binary: Option<PathBuf>,

    /// Show raw addresses when the symbol endpoint fails
    #[arg(long, global = true)]
    pub tolerate_symbol_errors: bool,

    /// Path of the target's stats endpoint
    #[arg(long, global = true, default_value = DEFAULT_STATS_PATH)]
    pub stats_path: String,

    /// Graphviz program used to lay out graph images
    #[arg(long, global = true, default_value = "dot")]
    pub layout_program: String,

    /// Write logs to this file (the dashboard otherwise only keeps warnings)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve reports and stats over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, short = 'l', default_value = "localhost:6464")]
        listen: String,

        /// Format of graph images
        #[arg(long, value_enum, default_value_t = ImageFormat::Svg)]
        image_format: ImageFormat,
    },

    /// Print the top entries of one profile and exit
    Top {
        /// Profile kind (profile, heap, allocs, goroutine, ...)
        #[arg(default_value = "heap")]
        kind: String,

        /// Number of entries to display
        #[arg(long, short = 'n', default_value = "20")]
        top: usize,

        /// Keep only call paths through functions matching this regex
        #[arg(long, short = 'f')]
        filter: Option<String>,

        /// Sort by cumulative value
        #[arg(long)]
        cum: bool,

        /// Sampling duration for CPU profiles (default: 30s)
        #[arg(long, value_parser = parse_duration)]
        seconds: Option<Duration>,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Try bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 30s, 5m, 2h, 1h30m, 90",
        s
    ))
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        let rest = self
            .target
            .strip_prefix("http://")
            .or_else(|| self.target.strip_prefix("https://"))
            .ok_or_else(|| format!("Target must be an http(s) URL, got '{}'", self.target))?;
        if rest.trim_end_matches('/').is_empty() {
            return Err(format!("Target '{}' has no host", self.target));
        }

        if self.interval.is_zero() {
            return Err("Interval must be greater than zero".to_string());
        }
        if self.timeout.is_zero() {
            return Err("Timeout must be greater than zero".to_string());
        }

        if !self.stats_path.starts_with('/') {
            return Err(format!(
                "Stats path must start with '/', got '{}'",
                self.stats_path
            ));
        }

        if self.symbolize == SymbolizeMode::Local && self.binary.is_none() {
            return Err("--symbolize local requires --binary".to_string());
        }

        if let Some(Command::Top {
            filter: Some(filter),
            ..
        }) = &self.command
        {
            regex::Regex::new(filter).map_err(|e| format!("Invalid filter '{}': {}", filter, e))?;
        }

        Ok(())
    }
}
