use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mxdeliver-cli", version)]
#[command(about = "Mail notification records straight to the recipients' mail exchangers")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// log format on stderr: text|json (filter with RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// prepare the configured engines, then mail every JSON record read from the input
    Run {
        /// TOML file with one or more [[engine]] tables
        #[arg(long, short)]
        config: PathBuf,
        /// only start the named engine (repeatable)
        #[arg(long = "engine")]
        engines: Vec<String>,
        /// read records from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// records buffered per engine when several engines run
        #[arg(long, default_value_t = 64)]
        queue: usize,
    },
    /// prepare the configured engines and print their routing tables
    Probe {
        #[arg(long, short)]
        config: PathBuf,
        #[arg(long = "engine")]
        engines: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },
    /// resolve mail exchangers the way the engines do
    Mx {
        #[arg(required = true)]
        domains: Vec<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}
