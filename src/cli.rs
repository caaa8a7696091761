use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use ytgen::generate::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "ytgen",
    about = "Turn YouTube captions into summaries, blog posts and video scripts",
    version
)]
pub struct Cli {
    /// Config file (defaults to ~/.config/ytgen/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show extraction and model details on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Print a video's captions
    Transcript {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a summary, blog post or script from a video
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// What to generate
        #[arg(short, long, value_enum, default_value_t = Mode::Summary)]
        mode: Mode,

        /// LLM model for generation (defaults per mode)
        #[arg(long)]
        model: Option<String>,

        /// Replace the default system prompt
        #[arg(long, conflicts_with = "prompt_name")]
        prompt: Option<String>,

        /// Use a saved prompt by name or id
        #[arg(long)]
        prompt_name: Option<String>,

        /// Persona the output should speak as
        #[arg(long)]
        persona: Option<String>,

        /// Target audience
        #[arg(long)]
        audience: Option<String>,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage saved prompts
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },
}

#[derive(Args)]
pub struct SourceArgs {
    /// YouTube video URL or video ID
    pub url: String,

    /// Preferred caption language
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Translate captions to Japanese before use
    #[arg(short, long)]
    pub translate: bool,

    /// LLM model for translation
    #[arg(long, default_value = ytgen::translate::DEFAULT_MODEL)]
    pub translate_model: String,
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List saved prompts
    List,

    /// Save a new prompt
    Add {
        name: String,
        /// Prompt text; read from --file when omitted
        content: Option<String>,
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// Delete a saved prompt by id
    Remove { id: String },
}
