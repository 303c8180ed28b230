use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::config::schema::{Config, IdentityConfig, CONFIG_VERSION};
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TRACKMYPREP_CONFIG";
/// Replaces the port of `server.bindAddress`.
pub const PORT_ENV: &str = "PORT";
/// Replaces `database.path`.
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the file named by `TRACKMYPREP_CONFIG` (or built-in defaults when
/// it is unset), then applies the environment overrides.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    resolve_config(|name| std::env::var(name).ok())
}

fn resolve_config<F>(env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match env(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        Some(path) => {
            log::info!("Loading config from {}", path);
            load_config(path)?
        }
        None => {
            log::info!("{} not set, using default config", CONFIG_PATH_ENV);
            Config::default()
        }
    };

    let config = apply_env_overrides(config, env)?;
    validate_config(&config)?;
    Ok(config)
}

/// Applies `PORT` and `DATABASE_PATH` from `env` on top of `config`.
pub fn apply_env_overrides<F>(mut config: Config, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = env(PORT_ENV).filter(|p| !p.is_empty()) {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Validation {
            message: format!("{} must be a port number, got '{}'", PORT_ENV, port),
        })?;
        let mut addr = parse_bind_address(&config.server.bind_address)?;
        addr.set_port(port);
        config.server.bind_address = addr.to_string();
    }

    if let Some(path) = env(DATABASE_PATH_ENV).filter(|p| !p.is_empty()) {
        config.database.path = Some(PathBuf::from(path));
    }

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    parse_bind_address(&config.server.bind_address)?;

    validate_http_url("uploads.publicBaseUrl", &config.uploads.public_base_url)?;

    if config.uploads.field_name.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "uploads.fieldName must not be empty".to_string(),
        });
    }

    if config.uploads.max_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "uploads.maxBytes must be positive".to_string(),
        });
    }

    for ext in &config.uploads.allowed_extensions {
        let bare = ext.trim_start_matches('.');
        if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Validation {
                message: format!("Invalid entry in uploads.allowedExtensions: '{}'", ext),
            });
        }
    }

    match &config.identity {
        IdentityConfig::Http(http) => {
            validate_http_url("identity.userinfoUrl", &http.userinfo_url)?;
            validate_http_url("identity.usersUrl", &http.users_url)?;
        }
        IdentityConfig::Static(table) => {
            let mut tokens = HashSet::new();
            for user in &table.users {
                if user.token.is_empty() || user.id.trim().is_empty() {
                    return Err(ConfigError::Validation {
                        message: "Static identity users need a non-empty token and id"
                            .to_string(),
                    });
                }
                if !tokens.insert(user.token.as_str()) {
                    return Err(ConfigError::Validation {
                        message: format!("Duplicate static token for user '{}'", user.id),
                    });
                }
            }
        }
    }

    Ok(())
}

fn parse_bind_address(value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|_| ConfigError::Validation {
        message: format!("server.bindAddress is not a socket address: '{}'", value),
    })
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value).map_err(|e| ConfigError::Validation {
        message: format!("{} is not a valid URL ({}): '{}'", field, e, value),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            message: format!("{} must be an http(s) URL: '{}'", field, value),
        });
    }
    Ok(())
}
