//! Pacientes API.

use crate::client::ClinicaClient;
use crate::error::Result;
use crate::types::{Paciente, PacientePayload};

/// Pacientes API client.
pub struct PacientesApi {
    client: ClinicaClient,
}

impl PacientesApi {
    pub(crate) fn new(client: ClinicaClient) -> Self {
        Self { client }
    }

    /// List all patient records.
    pub async fn list(&self) -> Result<Vec<Paciente>> {
        self.client.get("pacientes/").await
    }

    /// Search patients by name or national ID.
    pub async fn search(&self, query: &str) -> Result<Vec<Paciente>> {
        self.client
            .get_with_query("pacientes/", &[("search", query)])
            .await
    }

    /// Get a patient by ID.
    pub async fn get(&self, id: i64) -> Result<Paciente> {
        self.client.get(&format!("pacientes/{}/", id)).await
    }

    /// Create a new patient record.
    pub async fn create(&self, payload: &PacientePayload) -> Result<Paciente> {
        self.client.post("pacientes/", payload).await
    }

    /// Replace a patient record.
    pub async fn update(&self, id: i64, payload: &PacientePayload) -> Result<Paciente> {
        self.client.put(&format!("pacientes/{}/", id), payload).await
    }

    /// Delete a patient record.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client.delete(&format!("pacientes/{}/", id)).await
    }
}
