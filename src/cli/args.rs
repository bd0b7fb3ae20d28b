//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate short videos from text prompts across hosted queue backends
#[derive(Parser, Debug)]
#[command(name = "promptreel")]
#[command(version, about = "Prompt-to-video generation with provider fallback", long_about = None)]
#[command(after_help = "EXAMPLES:
    promptreel generate \"a cat on a skateboard\"
    promptreel generate \"a cat on a skateboard\" --style Cyberpunk
    promptreel normalize \"neon city\" --style 3d
    promptreel providers
    promptreel config init

ENVIRONMENT:
    SAHANIJI_VIDEO_URL, KINGNISH_VIDEO_URL, BYTEDANCE_VIDEO_URL
                         Base URLs of the built-in providers.
    DISCORD_WEBHOOK_URL  Webhook receiving finished videos.
    RUST_LOG             Log filter (default: info).")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path (default: ~/.config/promptreel/config.toml)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a video and print its public URL
    Generate {
        /// Text prompt describing the video
        prompt: String,

        /// Visual style (e.g. Anime, Realistic, 3D, or any free-form style)
        #[arg(long, short)]
        style: Option<String>,

        /// Override every provider's poll timeout, in seconds
        #[arg(long, value_parser = parse_poll_timeout)]
        poll_timeout: Option<u64>,
    },
    /// List configured providers in priority order
    Providers,
    /// Show how each provider would rewrite a prompt and style
    Normalize {
        /// Text prompt
        prompt: String,

        /// Visual style
        #[arg(long, short)]
        style: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

/// Parse and validate a poll timeout (1-3600 seconds)
fn parse_poll_timeout(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    if !(1..=3600).contains(&secs) {
        return Err(format!(
            "Poll timeout must be between 1 and 3600 seconds, got {}",
            secs
        ));
    }
    Ok(secs)
}
