// Configuration management module
// TOML settings with environment overrides for the database session

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DatabaseConfig, ENV_PREFIX, OllamaConfig, SearchConfig,
};
