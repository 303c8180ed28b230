//! Caller identity.
//!
//! Bearer tokens are issued and verified by an external identity provider.
//! The server never stores credentials; it only asks the provider who a
//! token belongs to and, for `/profile`, what that user looks like.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::config::IdentityConfig;
use crate::model::OwnerId;
use crate::secrets::SecretError;

mod extractor;
mod http;
mod static_provider;

pub use extractor::{bearer_token, Owner};
pub use http::HttpIdentityProvider;
pub use static_provider::StaticIdentityProvider;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No bearer credential in request")]
    MissingCredential,

    #[error("Credential rejected by identity provider")]
    InvalidCredential,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("No profile for user '{0}'")]
    ProfileNotFound(String),
}

/// Public profile attributes of a user, as returned by `GET /profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider_tag(&self) -> &'static str;

    /// Resolves a bearer token to the subject it was issued for.
    async fn verify(&self, token: &SecretString) -> Result<OwnerId, AuthError>;

    async fn profile(&self, owner: &OwnerId) -> Result<Profile, AuthError>;
}

/// Builds the configured identity provider.
pub fn provider_from_config(
    config: &IdentityConfig,
) -> Result<Arc<dyn IdentityProvider>, ProviderSetupError> {
    match config {
        IdentityConfig::Http(http) => Ok(Arc::new(HttpIdentityProvider::from_config(http)?)),
        IdentityConfig::Static(table) => {
            if table.users.is_empty() {
                log::warn!("Static identity provider has no users; every request will be rejected");
            }
            Ok(Arc::new(StaticIdentityProvider::from_config(table)))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderSetupError {
    #[error("Failed to resolve identity provider secret key: {0}")]
    Secret(#[from] SecretError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid identity provider URL: {0}")]
    InvalidUrl(String),
}
