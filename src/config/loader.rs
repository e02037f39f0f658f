use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::IngressConfig;

/// Prefix for environment overrides, e.g. `WRP_INGRESS__ADMISSION__MAX_OUTSTANDING`.
pub const ENV_PREFIX: &str = "WRP_INGRESS";

/// Load configuration from a file, then apply `WRP_INGRESS__*` environment overrides.
/// Supports TOML (default), YAML, JSON and INI, picked by extension.
pub fn load_config(config_path: &str) -> Result<IngressConfig> {
    load_config_with_env(config_path, environment())
}

/// Load configuration from a file with an explicit environment source.
pub fn load_config_with_env(config_path: &str, env: Environment) -> Result<IngressConfig> {
    let config_path = Path::new(config_path);

    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml,
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .add_source(env)
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let ingress_config: IngressConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(ingress_config)
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
