use super::ServiceConfig;
use crate::errors::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

/// Loads the service configuration
///
/// # Arguments
///
/// * `file_path` - Optional YAML file; every field is optional and defaults apply
///
/// # Returns
///
/// * `Result<ServiceConfig, Error>` - The file settings with environment overrides applied
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read or parsed
/// * An environment override or the merged result is invalid
pub fn load_service_config(file_path: Option<&Path>) -> Result<ServiceConfig, Error> {
    let base = match file_path {
        Some(path) => {
            let yaml_str = fs::read_to_string(path)?;
            let config: ServiceConfig = serde_yaml::from_str(&yaml_str)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            info!("Loaded service configuration from {}", path.display());
            config
        }
        None => ServiceConfig::default(),
    };
    resolve_service_config(base, |key| std::env::var(key).ok())
}

/// Applies environment overrides from `lookup` on top of `base` and validates the result
pub fn resolve_service_config<F>(base: ServiceConfig, lookup: F) -> Result<ServiceConfig, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = base;
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(port) = var("PORT") {
        config.port = port
            .parse()
            .map_err(|_| Error::Config(format!("PORT must be a port number, got {}", port)))?;
    }
    if let Some(environment) = var("APP_ENV") {
        config.environment = environment;
    }
    if let Some(key) = var("KIE_API_KEY") {
        config.provider.api_key = Some(key);
    }
    if let Some(base_url) = var("KIE_BASE_URL") {
        config.provider.base_url = base_url;
    }
    if let Some(mock) = var("MOCK_IMAGE_GENERATION") {
        config.mock_image_generation = match mock.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        };
    }
    if let Some(origins) = var("ALLOWED_ORIGINS") {
        config.allowed_origins = parse_allowed_origins(&origins);
    }
    if let Some(path) = var("TASK_STORE_PATH") {
        config.task_store_path = PathBuf::from(path);
    }
    if let Some(path) = var("PROMPT_TEMPLATE_PATH") {
        config.prompt_template_path = Some(PathBuf::from(path));
    }
    if let Some(interval) = var("POLL_INTERVAL") {
        config.polling.interval = interval;
    }
    if let Some(attempts) = var("POLL_MAX_ATTEMPTS") {
        config.polling.max_attempts = attempts.parse().map_err(|_| {
            Error::Config(format!("POLL_MAX_ATTEMPTS must be a number, got {}", attempts))
        })?;
    }

    validate(&config)?;
    Ok(config)
}

/// Splits a comma-separated origin list, dropping blanks
pub fn parse_allowed_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate(config: &ServiceConfig) -> Result<(), Error> {
    Url::parse(&config.provider.base_url).map_err(|e| {
        Error::Config(format!(
            "invalid provider base URL {}: {}",
            config.provider.base_url, e
        ))
    })?;
    humantime::parse_duration(&config.polling.interval).map_err(|e| {
        Error::Config(format!(
            "invalid poll interval {}: {}",
            config.polling.interval, e
        ))
    })?;
    if config.polling.max_attempts == 0 {
        return Err(Error::Config(
            "poll max_attempts must be at least 1".to_string(),
        ));
    }
    Ok(())
}
