use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            uploads: UploadsConfig::default(),
            identity: IdentityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Browser origins allowed by CORS. Empty means no CORS headers at all.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Falls back to `~/.trackmyprep/data/trackmyprep.db` when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadsConfig {
    #[serde(default = "default_upload_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_field_name")]
    pub field_name: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
    #[serde(default)]
    pub remove_on_delete: bool,
}

fn default_upload_directory() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_base_url() -> String {
    "http://localhost:5000/uploads".to_string()
}

fn default_field_name() -> String {
    "resume".to_string()
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            directory: default_upload_directory(),
            public_base_url: default_public_base_url(),
            field_name: default_field_name(),
            max_bytes: default_max_bytes(),
            allowed_extensions: Vec::new(),
            remove_on_delete: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdentityConfig {
    Http(HttpIdentityConfig),
    Static(StaticIdentityConfig),
}

/// With no identity section nobody can authenticate.
impl Default for IdentityConfig {
    fn default() -> Self {
        IdentityConfig::Static(StaticIdentityConfig::default())
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpIdentityConfig {
    /// Endpoint that answers a bearer token with the caller's claims.
    pub userinfo_url: String,
    /// Backend user lookup, queried as `{usersUrl}/{subject}`.
    pub users_url: String,
    #[serde(default = "default_subject_field")]
    pub subject_field: String,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub secret_key_file: Option<String>,
    #[serde(default)]
    pub secret_key_env_var: Option<String>,
}

fn default_subject_field() -> String {
    "sub".to_string()
}

impl std::fmt::Debug for HttpIdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityConfig")
            .field("userinfo_url", &self.userinfo_url)
            .field("users_url", &self.users_url)
            .field("subject_field", &self.subject_field)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("secret_key_file", &self.secret_key_file)
            .field("secret_key_env_var", &self.secret_key_env_var)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticIdentityConfig {
    #[serde(default)]
    pub users: Vec<StaticUser>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticUser {
    pub token: String,
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl std::fmt::Debug for StaticUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticUser")
            .field("token", &"<redacted>")
            .field("id", &self.id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}
