use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{provider_from_config, IdentityProvider};
use crate::config::Config;
use crate::db::{default_database_path, Database};
use crate::error::{ConfigError, TrackerError};
use crate::sanitize::redact_path;
use crate::storage::ResumeStorage;

/// HTTP-facing knobs taken from [`Config`].
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub allowed_origins: Vec<String>,
    /// Multipart field carrying the resume file.
    pub resume_field: String,
    pub max_upload_bytes: usize,
    pub remove_resume_on_delete: bool,
}

impl ApiSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            allowed_origins: config.server.allowed_origins.clone(),
            resume_field: config.uploads.field_name.clone(),
            max_upload_bytes: config.uploads.max_bytes,
            remove_resume_on_delete: config.uploads.remove_on_delete,
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub storage: Arc<ResumeStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub settings: Arc<ApiSettings>,
}

impl AppState {
    pub fn new(
        db: Database,
        storage: ResumeStorage,
        identity: Arc<dyn IdentityProvider>,
        settings: ApiSettings,
    ) -> Self {
        Self {
            db,
            storage: Arc::new(storage),
            identity,
            settings: Arc::new(settings),
        }
    }

    /// Opens the database, prepares the upload directory and builds the
    /// identity provider described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, TrackerError> {
        let db_path = match &config.database.path {
            Some(path) => path.clone(),
            None => default_database_path().ok_or_else(|| ConfigError::Validation {
                message: "database.path is unset and no home directory was found".to_string(),
            })?,
        };
        let db = Database::open(&db_path)?;

        let storage = ResumeStorage::new(
            &config.uploads.directory,
            &config.uploads.public_base_url,
            config.uploads.allowed_extensions.clone(),
        );
        storage.ensure_directory()?;
        log::info!(
            "Serving uploads from {} at {}",
            redact_path(storage.directory()),
            storage.public_base_url()
        );

        let identity = provider_from_config(&config.identity)?;
        log::info!("Using {} identity provider", identity.provider_tag());

        Ok(Self::new(
            db,
            storage,
            identity,
            ApiSettings::from_config(config),
        ))
    }
}

impl FromRef<AppState> for Arc<dyn IdentityProvider> {
    fn from_ref(state: &AppState) -> Self {
        state.identity.clone()
    }
}
