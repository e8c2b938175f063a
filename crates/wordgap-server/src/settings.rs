//! Configuration loading: optional TOML file, then `WORDGAP_*` environment

use config::{Config, Environment, File};
use wordgap_core::AppConfig;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_VAR: &str = "WORDGAP_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "wordgap.toml";

/// Load configuration from `$WORDGAP_CONFIG` (default `wordgap.toml`) and
/// environment overrides such as `WORDGAP_ASSEMBLER__CHUNK_SIZE=5`.
/// `WORDGAP_SERVER__CORS_ORIGINS` takes a comma-separated list.
pub fn load() -> anyhow::Result<AppConfig> {
    let path =
        std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from(&path)
}

pub fn load_from(path: &str) -> anyhow::Result<AppConfig> {
    let settings = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("WORDGAP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.cors_origins"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
