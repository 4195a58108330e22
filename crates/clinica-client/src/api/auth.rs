//! Authentication API: login, logout, current user.

use serde::{Deserialize, Serialize};

use clinica_auth::CredentialPair;

use crate::client::ClinicaClient;
use crate::error::Result;
use crate::types::Usuario;

/// Authentication API client.
pub struct AuthApi {
    client: ClinicaClient,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

impl AuthApi {
    pub(crate) fn new(client: ClinicaClient) -> Self {
        Self { client }
    }

    /// Obtain a token pair from `POST token/` and store it in the configured
    /// credential scope.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let pair: TokenPairResponse = self
            .client
            .post("token/", &LoginRequest { username, password })
            .await?;

        self.client.store().set_pair(&CredentialPair {
            access: pair.access,
            refresh: pair.refresh,
        })?;
        tracing::info!("Logged in as {}", username);
        Ok(())
    }

    /// Drop the stored credentials and cached identity.
    pub fn logout(&self) -> Result<()> {
        self.client.store().clear()?;
        Ok(())
    }

    /// Fetch the authenticated user and cache the identity locally.
    pub async fn current_user(&self) -> Result<Usuario> {
        let user: Usuario = self.client.get("usuarios/me/").await?;
        self.client
            .store()
            .set_cached_user(serde_json::to_value(&user)?)?;
        Ok(user)
    }

    /// The locally cached identity, if a user is logged in.
    pub fn cached_user(&self) -> Option<Usuario> {
        let value = self.client.store().cached_user()?;
        serde_json::from_value(value).ok()
    }
}
