// Configuration management module
// TOML settings plus environment overrides for the service endpoints

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, OllamaConfig, QdrantConfig, RetrievalConfig, ServerConfig,
};

/// Resolve the configuration directory: an explicit override wins over the platform default
#[inline]
pub fn get_config_dir(
    explicit: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    explicit.map_or_else(Config::config_dir, Ok)
}

/// Load configuration from `config_dir` and apply environment overrides
#[inline]
pub fn load_effective(config_dir: std::path::PathBuf) -> anyhow::Result<Config> {
    let mut config = Config::load(&config_dir)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
