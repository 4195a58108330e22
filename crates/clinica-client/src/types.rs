//! API payload types for the clinic resources.
//!
//! These are the wire shapes of the external REST API; the request pipeline
//! itself treats all bodies as opaque JSON.

use serde::{Deserialize, Serialize};

/// System user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usuario {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

/// Create/update payload for a user account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsuarioPayload {
    pub username: String,
    pub email: String,
    /// Only sent on create or password change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rol: Option<String>,
}

/// Dentist profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Odontologo {
    pub id: i64,
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
    pub email: String,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub especialidad: Option<String>,
    #[serde(default)]
    pub registro_profesional: Option<String>,
}

/// Create/update payload for a dentist profile.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OdontologoPayload {
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub especialidad: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registro_profesional: Option<String>,
}

/// Patient record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paciente {
    pub id: i64,
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    /// ISO 8601 date (`YYYY-MM-DD`).
    #[serde(default)]
    pub fecha_nacimiento: Option<String>,
}

/// Create/update payload for a patient record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PacientePayload {
    pub nombre: String,
    pub apellido: String,
    pub cedula: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_nacimiento: Option<String>,
}
