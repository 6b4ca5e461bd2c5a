
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ConfigError, DatabaseConfig, OllamaConfig};
use crate::embeddings::ollama::OllamaClient;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Semantic Chunks Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Database Configuration").bold().yellow());
    eprintln!("Connection to the PostgreSQL instance with the pgvector extension.");
    eprintln!(
        "The password is not stored here; export {} instead.",
        style("SEMANTIC_CHUNKS_DB_PASSWORD").cyan()
    );
    eprintln!();

    configure_database(&mut config.database)?;

    eprintln!();
    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure your local Ollama instance for embedding generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before indexing.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        // Env overrides are session-only and must not leak into the file
        config.database.password = None;
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
pub fn show_config(config: &Config) {
    for line in describe_config(config) {
        eprintln!("{}", line);
    }
}

/// Render the configuration for display, without the password
fn describe_config(config: &Config) -> Vec<String> {
    let mut lines = vec![
        format!("{}", style("📋 Current Configuration").bold().cyan()),
        String::new(),
        format!("{}", style("Database Settings:").bold().yellow()),
        format!("  URL: {}", style(config.database.display_url()).cyan()),
        format!("  Table: {}", style(&config.database.table).cyan()),
        format!(
            "  Password: {}",
            if config.database.password.is_some() {
                style("set").green()
            } else {
                style("not set").dim()
            }
        ),
        String::new(),
        format!("{}", style("Ollama Settings:").bold().yellow()),
    ];

    match config.ollama_url() {
        Ok(url) => lines.push(format!("  URL: {}", style(url).cyan())),
        Err(e) => lines.push(format!("  URL: {} ({})", style("Invalid").red(), e)),
    }
    lines.push(format!("  Model: {}", style(&config.ollama.model).cyan()));
    lines.push(format!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    ));
    lines.push(format!(
        "  Batch Size: {}",
        style(config.ollama.batch_size).cyan()
    ));
    lines.push(String::new());
    lines.push(format!(
        "{} {} sentences per chunk, top {} results",
        style("Chunking/Search:").bold().yellow(),
        config.chunking.sentences_per_chunk,
        config.search.top_k
    ));
    lines.push(String::new());
    lines.push(format!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    ));

    lines
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load_from(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_database(database: &mut DatabaseConfig) -> Result<()> {
    let host: String = Input::new()
        .with_prompt("Database host")
        .default(database.host.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Host cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Database port")
        .default(database.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let name: String = Input::new()
        .with_prompt("Database name")
        .default(database.name.clone())
        .interact_text()?;

    let user: String = Input::new()
        .with_prompt("Database user")
        .default(database.user.clone())
        .interact_text()?;

    let table: String = Input::new()
        .with_prompt("Table name")
        .default(database.table.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let mut temp_config = DatabaseConfig::default();
            temp_config.set_table(input.clone())
        })
        .interact_text()?;

    database.set_host(host)?;
    database.set_port(port)?;
    database.set_name(name)?;
    database.set_user(user)?;
    database.set_table(table)?;

    Ok(())
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension (must match the model output)")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(embedding_dimension)?;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    OllamaClient::new(ollama)
        .map(|client| client.with_timeout(std::time::Duration::from_secs(5)))
        .and_then(|client| client.ping())
        .is_ok()
}
