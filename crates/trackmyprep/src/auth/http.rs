use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{AuthError, IdentityProvider, Profile, ProviderSetupError};
use crate::config::HttpIdentityConfig;
use crate::model::OwnerId;
use crate::sanitize::truncate_body;
use crate::secrets::resolve_secret_optional;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Upstream error bodies are cut to this many characters.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// User record as returned by the provider's backend users endpoint.
#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

impl TryFrom<UserRecord> for Profile {
    type Error = AuthError;

    fn try_from(user: UserRecord) -> Result<Self, Self::Error> {
        let email = user
            .email_addresses
            .into_iter()
            .next()
            .map(|e| e.email_address)
            .ok_or_else(|| AuthError::Provider(format!("user '{}' has no email address", user.id)))?;
        Ok(Profile {
            id: user.id,
            email,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }
}

/// Identity provider reached over HTTP.
///
/// Tokens are verified by presenting them to the userinfo endpoint and
/// reading the subject claim from the answer. Profiles come from the
/// backend users endpoint, authenticated with the server's secret key.
pub struct HttpIdentityProvider {
    client: Client,
    userinfo_url: Url,
    users_url: Url,
    subject_field: String,
    secret_key: Option<SecretString>,
}

impl HttpIdentityProvider {
    pub fn from_config(config: &HttpIdentityConfig) -> Result<Self, ProviderSetupError> {
        let secret_key = resolve_secret_optional(
            config.secret_key.as_deref(),
            config.secret_key_file.as_deref(),
            config.secret_key_env_var.as_deref(),
        )?;
        if secret_key.is_none() {
            log::warn!("No identity provider secret key configured; profile lookups are unauthenticated");
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        // Both URLs were checked by config validation.
        let userinfo_url = Url::parse(&config.userinfo_url)
            .map_err(|e| ProviderSetupError::InvalidUrl(format!("userinfoUrl: {}", e)))?;
        let users_url = Url::parse(&config.users_url)
            .map_err(|e| ProviderSetupError::InvalidUrl(format!("usersUrl: {}", e)))?;

        Ok(Self {
            client,
            userinfo_url,
            users_url,
            subject_field: config.subject_field.clone(),
            secret_key,
        })
    }

    fn user_url(&self, owner: &OwnerId) -> Result<Url, AuthError> {
        let mut url = self.users_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthError::Provider("usersUrl cannot take a path".to_string()))?
            .pop_if_empty()
            .push(owner.as_str());
        Ok(url)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn provider_tag(&self) -> &'static str {
        "http"
    }

    async fn verify(&self, token: &SecretString) -> Result<OwnerId, AuthError> {
        let response = self
            .client
            .get(self.userinfo_url.clone())
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("userinfo request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidCredential);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "userinfo returned {}: {}",
                status,
                truncate_body(&body, MAX_ERROR_BODY_LENGTH)
            )));
        }

        let claims: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("invalid userinfo response: {}", e)))?;

        subject_from_claims(&claims, &self.subject_field).ok_or(AuthError::InvalidCredential)
    }

    async fn profile(&self, owner: &OwnerId) -> Result<Profile, AuthError> {
        let mut request = self.client.get(self.user_url(owner)?);
        if let Some(key) = &self.secret_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("user lookup failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AuthError::ProfileNotFound(owner.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!(
                "user lookup returned {}: {}",
                status,
                truncate_body(&body, MAX_ERROR_BODY_LENGTH)
            )));
        }

        let user: UserRecord = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("invalid user record: {}", e)))?;

        Profile::try_from(user)
    }
}

fn subject_from_claims(claims: &serde_json::Value, field: &str) -> Option<OwnerId> {
    claims
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(OwnerId::new)
}
