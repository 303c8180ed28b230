use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{AuthError, IdentityProvider, Profile};
use crate::config::StaticIdentityConfig;
use crate::model::OwnerId;

/// Fixed token table for local development and tests.
pub struct StaticIdentityProvider {
    tokens: HashMap<String, OwnerId>,
    profiles: HashMap<OwnerId, Profile>,
}

impl StaticIdentityProvider {
    pub fn from_config(config: &StaticIdentityConfig) -> Self {
        let mut tokens = HashMap::new();
        let mut profiles = HashMap::new();
        for user in &config.users {
            let owner = OwnerId::new(user.id.trim());
            tokens.insert(user.token.clone(), owner.clone());
            profiles.insert(
                owner,
                Profile {
                    id: user.id.trim().to_string(),
                    email: user.email.clone(),
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                },
            );
        }
        Self { tokens, profiles }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn provider_tag(&self) -> &'static str {
        "static"
    }

    async fn verify(&self, token: &SecretString) -> Result<OwnerId, AuthError> {
        self.tokens
            .get(token.expose_secret())
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }

    async fn profile(&self, owner: &OwnerId) -> Result<Profile, AuthError> {
        self.profiles
            .get(owner)
            .cloned()
            .ok_or_else(|| AuthError::ProfileNotFound(owner.to_string()))
    }
}
