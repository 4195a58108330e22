//! Odontólogos API.

use crate::client::ClinicaClient;
use crate::error::Result;
use crate::types::{Odontologo, OdontologoPayload};

/// Odontólogos API client.
pub struct OdontologosApi {
    client: ClinicaClient,
}

impl OdontologosApi {
    pub(crate) fn new(client: ClinicaClient) -> Self {
        Self { client }
    }

    /// List all dentist profiles.
    pub async fn list(&self) -> Result<Vec<Odontologo>> {
        self.client.get("odontologos/").await
    }

    /// Get a dentist by ID.
    pub async fn get(&self, id: i64) -> Result<Odontologo> {
        self.client.get(&format!("odontologos/{}/", id)).await
    }

    /// Create a new dentist profile.
    pub async fn create(&self, payload: &OdontologoPayload) -> Result<Odontologo> {
        self.client.post("odontologos/", payload).await
    }

    /// Replace a dentist profile.
    pub async fn update(&self, id: i64, payload: &OdontologoPayload) -> Result<Odontologo> {
        self.client
            .put(&format!("odontologos/{}/", id), payload)
            .await
    }

    /// Delete a dentist profile.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("odontologos/{}/", id)).await
    }
}
