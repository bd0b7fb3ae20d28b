mod cli;

use clap::Parser;
use cli::{Args, Command};
use promptreel::config::Config;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Load .env file
///
/// Loads provider URLs and the upload webhook from a .env file in the
/// working directory. Does not override existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

/// Route `log` records to stderr, filtered by RUST_LOG (default: info).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load config from an explicit path (which must exist) or the default location.
fn load_config(path: Option<&Path>) -> Result<Config, String> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
    }
    Config::load(path).map_err(|e| e.to_string())
}

fn run(args: Args) -> Result<(), String> {
    let config_path = args.config.as_deref();

    match args.command {
        Command::Generate {
            prompt,
            style,
            poll_timeout,
        } => {
            let config = load_config(config_path)?;
            cli::run_generate(&config, &prompt, style, poll_timeout)
        }
        Command::Providers => {
            let config = load_config(config_path)?;
            cli::list_providers(&config);
            Ok(())
        }
        Command::Normalize { prompt, style } => {
            let config = load_config(config_path)?;
            cli::normalize(&config, &prompt, style.as_deref())
        }
        Command::Config { action } => cli::handle_config_action(action, config_path),
    }
}

fn main() {
    // Load .env file before anything else
    load_env();
    init_logging();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_explicit_missing_path_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.starts_with("Config file not found"));
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[safety]\nenabled = false\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert!(!config.safety.enabled);
        assert_eq!(config.providers.len(), 3);
    }

    #[test]
    fn test_env_var_not_overridden() {
        std::env::set_var("PROMPTREEL_TEST_EXISTING_VAR", "original_value");

        // Default behavior doesn't override existing vars
        let _ = dotenv::dotenv();

        assert_eq!(
            std::env::var("PROMPTREEL_TEST_EXISTING_VAR").unwrap(),
            "original_value",
            "Existing env vars should not be overridden by dotenv"
        );

        std::env::remove_var("PROMPTREEL_TEST_EXISTING_VAR");
    }
}
