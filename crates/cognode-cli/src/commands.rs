//! CLI command implementations.

use crate::config::{Config, CONFIG_FILE};
use cognode_core::{build_system_prompt, extract_reply};
use cognode_model::{ModelClient, OpenAiClient, RetryingClient};
use cognode_server::CognodeServer;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// How much of the reply `ask` prints.
const SNIPPET_CHARS: usize = 100;

/// Write a default config file into a directory.
pub fn init(path: &Path) -> Result<()> {
    let config_path = path.join(CONFIG_FILE);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    fs::create_dir_all(path)?;
    fs::write(
        &config_path,
        serde_json::to_string_pretty(&Config::default())?,
    )?;

    println!("{} Wrote {}", "✓".green(), config_path.display());
    println!(
        "  Set {} and run {} to start",
        "COGNODE_API_KEY".cyan(),
        "cognode serve".cyan()
    );

    Ok(())
}

/// Start the WebSocket server.
pub async fn serve(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let server_config = config.server_config()?;
    let model = build_model(&config)?;

    println!("{}", "Starting Cognode server...".cyan());
    println!("{} Model {}", "✓".green(), model.name().cyan());
    println!(
        "{} Listening on ws://{}{}",
        "✓".green(),
        server_config.addr,
        server_config.path
    );
    println!("  Press {} to stop", "Ctrl+C".cyan());

    let server = CognodeServer::new(model, server_config);
    server.run().await?;

    Ok(())
}

/// Send one question to the configured model and report what came back.
pub async fn ask(config_path: Option<&Path>, question: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let model = build_model(&config)?;
    let system_prompt = build_system_prompt(None);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Asking {}...", config.model.model));

    let result = model.complete(&system_prompt, question).await;
    spinner.finish_and_clear();
    let completion = result?;

    let extraction = extract_reply(&completion.text);

    println!("{} Model responded", "✓".green());
    println!("  {} {}", "Reply:".dimmed(), snippet(&completion.text));
    println!(
        "  {} {} in / {} out",
        "Tokens:".dimmed(),
        completion.input_tokens,
        completion.output_tokens
    );
    println!(
        "  {} {} ({} nodes)",
        "Parsed:".dimmed(),
        extraction.kind(),
        extraction.reply().nodes.len()
    );

    Ok(())
}

fn build_model(config: &Config) -> Result<Arc<dyn ModelClient>> {
    config.require_api_key()?;
    let client = OpenAiClient::new(config.model.clone())?;
    Ok(Arc::new(RetryingClient::new(client, config.retry.clone())))
}

fn snippet(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_default_config() {
        let dir = tempdir().unwrap();
        init(dir.path()).unwrap();

        let written = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["server"]["path"], "/ws/chat");
        assert_eq!(value["model"]["max_tokens"], 16384);
        assert!(value["model"].get("api_key").is_none());

        let loaded = Config::from_file(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(loaded.server.port, 8000);
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{}").unwrap();

        init(dir.path()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        assert_eq!(snippet("short"), "short");

        let long = "é".repeat(150);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_missing_key_stops_model_setup() {
        let config = Config::default();
        assert!(build_model(&config).is_err());
    }
}
