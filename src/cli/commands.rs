//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::args::ConfigAction;
use promptreel::config::{default_path, Config, SinkConfig};
use promptreel::generate::{
    providers_from_config, ContentSafety, DiscordWebhookUploader, FallbackOrchestrator,
    GenerationError, GenerationRequest, KeywordSafetyGate, ResultSink, SupportedStyles,
    VideoUploader,
};

/// Run the generate command: safety check, fallback generation, print the URL.
///
/// Ctrl+C cancels the in-flight provider; nothing is retried afterwards.
pub fn run_generate(
    config: &Config,
    prompt: &str,
    style: Option<String>,
    poll_timeout: Option<u64>,
) -> Result<(), String> {
    let request = GenerationRequest::new(prompt, style).map_err(|e| e.to_string())?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    rt.block_on(async {
        if config.safety.enabled {
            let gate = KeywordSafetyGate::new(&config.safety.blocked_terms);
            let verdict = gate.check(request.prompt()).await;
            if !verdict.is_safe {
                return Err(format!(
                    "Prompt rejected by safety check ({:?}): {}",
                    verdict.risk_level, verdict.reason
                ));
            }
        }

        let orchestrator = build_orchestrator(config, poll_timeout)?;
        log::info!(
            "Generating video with providers: {}",
            orchestrator.provider_names().join(", ")
        );

        tokio::select! {
            result = orchestrator.generate(&request) => match result {
                Ok(video) => {
                    log::info!("Video generated by {}", video.provider);
                    println!("{}", video.video_url);
                    Ok(())
                }
                Err(e) => Err(describe_failure(&e)),
            },
            _ = tokio::signal::ctrl_c() => {
                log::warn!("Generation cancelled");
                Err("Cancelled".to_string())
            }
        }
    })
}

fn build_orchestrator(
    config: &Config,
    poll_timeout: Option<u64>,
) -> Result<FallbackOrchestrator, String> {
    let mut provider_configs = config.providers.clone();
    if let Some(secs) = poll_timeout {
        for provider in &mut provider_configs {
            provider.poll_timeout_secs = secs;
        }
    }

    let providers = providers_from_config(&provider_configs)
        .map_err(|e| format!("Failed to set up providers: {}", e))?;
    if providers.is_empty() {
        return Err("No providers available.\n\n\
            Set a base URL for at least one provider, either in the config file\n\
            or through its environment variable (run 'promptreel providers')."
            .to_string());
    }

    let webhook_url = config.upload.resolve_webhook_url().ok_or_else(|| {
        format!(
            "No upload webhook configured.\n\n\
            Set {} in .env or the environment, or set upload.webhook_url in the config file.",
            config.upload.webhook_url_env
        )
    })?;
    let uploader = DiscordWebhookUploader::new(webhook_url)
        .map_err(|e| format!("Failed to create uploader: {}", e))?;

    let sink = build_sink(&config.sink, Arc::new(uploader))?;
    Ok(FallbackOrchestrator::new(providers, sink))
}

fn build_sink(settings: &SinkConfig, uploader: Arc<dyn VideoUploader>) -> Result<ResultSink, String> {
    let sink = ResultSink::new(uploader)
        .map_err(|e| format!("Failed to create result sink: {}", e))?
        .with_max_bytes(settings.max_bytes)
        .with_download_timeout(Duration::from_secs(settings.download_timeout_secs))
        .with_upload_timeout(Duration::from_secs(settings.upload_timeout_secs));
    Ok(sink)
}

/// Render a generation failure, one line per provider when several failed.
fn describe_failure(e: &GenerationError) -> String {
    let errors = e.provider_errors();
    if errors.is_empty() {
        return e.to_string();
    }
    let mut message = String::from("All providers failed:");
    for error in errors {
        message.push_str("\n  ");
        message.push_str(error);
    }
    message
}

/// Print configured providers in priority order.
pub fn list_providers(config: &Config) {
    if config.providers.is_empty() {
        println!("No providers configured.");
        return;
    }

    println!("Providers (in priority order):");
    for (index, provider) in config.providers.iter().enumerate() {
        let url = match provider.resolve_base_url() {
            Some(url) => url,
            None => format!(
                "(not set: {})",
                provider.base_url_env.as_deref().unwrap_or("base_url")
            ),
        };
        let status = if provider.enabled { "" } else { " [disabled]" };
        println!("  {}. {}{}", index + 1, provider.name, status);
        println!("     URL:      {}", url);
        println!(
            "     Queue:    fn_index={} trigger_id={} steps={}",
            provider.fn_index, provider.trigger_id, provider.step_count
        );
        let styles = if provider.supported_styles.is_empty() {
            "(none)".to_string()
        } else {
            provider.supported_styles.join(", ")
        };
        println!("     Styles:   {}", styles);
        println!("     Timeout:  {}s", provider.poll_timeout_secs);
    }
}

/// Print the payload each provider would send for `prompt` and `style`.
pub fn normalize(config: &Config, prompt: &str, style: Option<&str>) -> Result<(), String> {
    let request =
        GenerationRequest::new(prompt, style.map(str::to_string)).map_err(|e| e.to_string())?;

    for provider in &config.providers {
        let styles = SupportedStyles::new(provider.supported_styles.iter().cloned());
        let payload = styles.normalize(request.prompt(), request.style());
        println!("{}:", provider.name);
        println!("  prompt: {}", payload.prompt);
        println!("  style:  {:?}", provider.style_slot.resolve(&payload.style));
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) -> Result<(), String> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(&config_path)).map_err(|e| e.to_string())?;
            if config_path.exists() {
                println!("# Config file: {} (exists)", config_path.display());
            } else {
                println!("# Config file: {} (not found, showing defaults)", config_path.display());
            }
            println!();
            print!("{}", config.to_toml().map_err(|e| e.to_string())?);
            Ok(())
        }
        ConfigAction::Init => {
            Config::write_default(&config_path).map_err(|e| {
                format!(
                    "{}\nUse 'promptreel config show' to view current settings.",
                    e
                )
            })?;
            println!("Created config file: {}", config_path.display());
            Ok(())
        }
    }
}
