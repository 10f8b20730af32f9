//! Pilot app cli definition and entrypoint.
mod chat;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use pilot_core::config::{Config, load_config, save_config};
use pilot_core::env_template;
use std::path::PathBuf;

use crate::log::setup_logging;

/// Pilot - a terminal chat client for hosted LLM providers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Show verbose logs.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the configured AI model (default).
    Chat,
    /// View or update the persisted configuration.
    Config {
        /// A key=value assignment, or "reset" to restore defaults. Omit to
        /// print the current configuration.
        assignment: Option<String>,
    },
    /// Write a .env template listing the supported provider API keys.
    EnvTemplate {
        /// Destination file.
        #[arg(long, default_value = ".env.template")]
        path: PathBuf,
    },
}

/// Runs the main CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        setup_logging().context("Failed to set up logging")?;
    }

    match cli.command {
        None | Some(Commands::Chat) => chat::execute().await,
        Some(Commands::Config { assignment }) => execute_config(assignment.as_deref()),
        Some(Commands::EnvTemplate { path }) => execute_env_template(&path),
    }
}

fn execute_config(assignment: Option<&str>) -> Result<()> {
    let mut config = load_config(None).context("Failed to load configuration")?;
    match assignment {
        Some("reset") => {
            config.reset();
            save_config(&config, None).context("Failed to save configuration")?;
            println!("Configuration reset to defaults");
        }
        Some(assignment) => {
            let (key, value) = assignment
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected key=value, got '{assignment}'"))?;
            config.set(key.trim(), value.trim())?;
            save_config(&config, None).context("Failed to save configuration")?;
            println!("Updated {}", key.trim());
        }
        None => print!("{}", render_config(&config)),
    }
    Ok(())
}

fn execute_env_template(path: &PathBuf) -> Result<()> {
    std::fs::write(path, env_template())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Human-readable view of the configuration with the API key masked.
pub(crate) fn render_config(config: &Config) -> String {
    let mut out = String::new();
    out.push_str(&format!("apiProvider     {}\n", config.api_provider));
    out.push_str(&format!("apiKey          {}\n", mask_key(&config.api_key)));
    out.push_str(&format!("model           {}\n", config.model));
    out.push_str(&format!("temperature     {}\n", config.temperature));
    out.push_str(&format!("maxTokens       {}\n", config.max_tokens));
    out.push_str(&format!("mode            {}\n", config.mode));
    out.push_str(&format!(
        "workspacePath   {}\n",
        config.workspace_path.display()
    ));
    out.push_str(&format!("isVisionEnabled {}\n", config.is_vision_enabled));
    out.push_str(&format!("checkMcpOnStart {}\n", config.check_mcp_on_start));
    out
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else if key.len() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", &key[key.len() - 4..])
    }
}
