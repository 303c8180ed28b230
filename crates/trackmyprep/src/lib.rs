pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod sanitize;
pub mod secrets;
pub mod storage;

pub use api::{build_router, ApiError, ApiSettings, AppState};
pub use auth::{HttpIdentityProvider, IdentityProvider, Owner, Profile, StaticIdentityProvider};
pub use config::{load_config, load_config_from_env, Config};
pub use db::Database;
pub use error::{ConfigError, StorageError, TrackerError, ValidationError};
pub use model::{ApplicationRecord, Category, OwnerId, Priority, Status};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use storage::ResumeStorage;
