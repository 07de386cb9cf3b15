use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "gbit-studio", version)]
#[command(
    about = "AI code studio: explain, refactor and generate code, or chat, through a retrying Gemini proxy",
    long_about = "AI code studio: explain, refactor and generate code, or chat, through a retrying Gemini proxy\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/gbit-studio/config.toml\n    2. ~/.config/gbit-studio/config.toml"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backend endpoint the tools post to.
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Total number of attempts per request, first try included.
    #[arg(
        long,
        global = true,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: Option<u32>,

    /// Print redacted HTTP request and response dumps to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Record a session trace file under the XDG state directory.
    #[arg(long, global = true)]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the backend proxy that forwards requests to Gemini.
    Serve {
        #[arg(long, value_name = "N")]
        port: Option<u16>,

        /// Also write daily rotated log files into this directory.
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,
    },
    /// Explain a piece of code read from FILE or stdin.
    Explain {
        file: Option<PathBuf>,

        /// Print escaped HTML instead of terminal output.
        #[arg(long)]
        html: bool,
    },
    /// Rewrite code from FILE or stdin following an instruction.
    Refactor {
        #[arg(long, short, value_name = "TEXT")]
        instruction: String,

        file: Option<PathBuf>,
    },
    /// Generate a script from a description.
    Generate {
        #[arg(required = true, num_args = 1.., value_name = "PROMPT")]
        prompt: Vec<String>,
    },
    /// Start an interactive chat session.
    Chat,
}
