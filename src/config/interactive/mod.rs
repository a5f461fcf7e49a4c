
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::path::{Path, PathBuf};

use super::{Config, DatasetConfig, GeminiConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 AiDvice-Medical Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Chat Model Configuration").bold().yellow());
    eprintln!("Configure the Gemini endpoint used for conversational answers.");
    eprintln!();

    configure_gemini(&mut config.gemini)?;

    eprintln!();
    eprintln!("{}", style("Dataset Configuration").bold().yellow());
    eprintln!("Configure the curated question/answer dataset and match threshold.");
    eprintln!();

    configure_dataset(&mut config.dataset)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_endpoint_connection(&config.gemini) {
        eprintln!("{}", style("✓ Endpoint reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the chat endpoint").yellow()
        );
        eprintln!(
            "You can continue, but answers will only come from the dataset until it is reachable."
        );
    }

    if config.dataset.path.exists() {
        eprintln!("{}", style("✓ Dataset file found!").green());
    } else {
        eprintln!(
            "{}",
            style(format!(
                "⚠ Warning: Dataset file {} does not exist",
                config.dataset.path.display()
            ))
            .yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Gemini Settings:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.gemini.endpoint).cyan());
    eprintln!("  Model: {}", style(&config.gemini.model).cyan());
    eprintln!("  Timeout: {}s", style(config.gemini.timeout_secs).cyan());
    let key_status = if config.gemini.api_key().is_ok() {
        style("set").green()
    } else {
        style("not set").red()
    };
    eprintln!(
        "  API key variable: {} ({})",
        style(&config.gemini.api_key_env).cyan(),
        key_status
    );

    eprintln!();
    eprintln!("{}", style("Dataset Settings:").bold().yellow());
    eprintln!("  Path: {}", style(config.dataset.path.display()).cyan());
    eprintln!("  Match threshold: {}", style(config.dataset.threshold).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config::new(config_dir))
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_gemini(gemini: &mut GeminiConfig) -> Result<()> {
    let endpoint: String = Input::new()
        .with_prompt("API endpoint")
        .default(gemini.endpoint.clone())
        .validate_with(|input: &String| -> Result<(), String> {
            let temp_config = GeminiConfig {
                endpoint: input.clone(),
                ..GeminiConfig::default()
            };
            temp_config.endpoint_url().map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(gemini.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(gemini.api_key_env.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() || input.contains('=') {
                Err("Variable name cannot be empty or contain '='")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let timeout_secs: u64 = Input::new()
        .with_prompt("Request timeout in seconds")
        .default(gemini.timeout_secs)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=600).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 600 seconds")
            }
        })
        .interact_text()?;

    gemini.set_endpoint(endpoint)?;
    gemini.set_model(model)?;
    gemini.set_api_key_env(api_key_env)?;
    gemini.set_timeout_secs(timeout_secs)?;

    Ok(())
}

fn configure_dataset(dataset: &mut DatasetConfig) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("Dataset CSV path")
        .default(dataset.path.display().to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Dataset path cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let threshold: u8 = Input::new()
        .with_prompt("Match threshold (0-100)")
        .default(dataset.threshold)
        .validate_with(|input: &u8| -> Result<(), &str> {
            if *input > 100 {
                Err("Threshold must be 100 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    dataset.set_path(PathBuf::from(path.trim()))?;
    dataset.set_threshold(threshold)?;

    Ok(())
}

fn test_endpoint_connection(gemini: &GeminiConfig) -> bool {
    let Ok(url) = gemini.endpoint_url() else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
