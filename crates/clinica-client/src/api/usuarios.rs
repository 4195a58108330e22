//! Usuarios API.

use crate::client::ClinicaClient;
use crate::error::Result;
use crate::types::{Usuario, UsuarioPayload};

/// Usuarios API client.
pub struct UsuariosApi {
    client: ClinicaClient,
}

impl UsuariosApi {
    pub(crate) fn new(client: ClinicaClient) -> Self {
        Self { client }
    }

    /// List all user accounts.
    pub async fn list(&self) -> Result<Vec<Usuario>> {
        self.client.get("usuarios/").await
    }

    /// Get a user by ID.
    pub async fn get(&self, id: i64) -> Result<Usuario> {
        self.client.get(&format!("usuarios/{}/", id)).await
    }

    /// Create a new user.
    pub async fn create(&self, payload: &UsuarioPayload) -> Result<Usuario> {
        self.client.post("usuarios/", payload).await
    }

    /// Replace a user.
    pub async fn update(&self, id: i64, payload: &UsuarioPayload) -> Result<Usuario> {
        self.client.put(&format!("usuarios/{}/", id), payload).await
    }

    /// Enable or disable an account.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<Usuario> {
        self.client
            .patch(
                &format!("usuarios/{}/", id),
                &serde_json::json!({"is_active": active}),
            )
            .await
    }

    /// Delete a user.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("usuarios/{}/", id)).await
    }
}
