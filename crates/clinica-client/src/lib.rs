//! Authenticated HTTP client for the Clinica management API.
//!
//! Every request dispatched through the client carries the stored bearer
//! access token. When a request comes back 401, the client runs a single
//! coordinated refresh-token exchange, shared by however many requests failed
//! concurrently, replays each failed request exactly once with the new token,
//! and on unrecoverable failure clears the credential store and notifies the
//! hosting application through a registered hook.
//!
//! # Example
//!
//! ```no_run
//! use clinica_client::ClinicaClient;
//! use clinica_auth::StoreScope;
//!
//! # async fn example() -> clinica_client::Result<()> {
//! let client = ClinicaClient::builder()
//!     .base_url("http://localhost:8000/api")
//!     .storage(StoreScope::Session)
//!     .on_session_invalidated(|| eprintln!("session expired, back to login"))
//!     .build()?;
//!
//! client.auth().login("admin", "secret").await?;
//!
//! // Token attachment and refresh are transparent from here on.
//! let pacientes = client.pacientes().list().await?;
//! for paciente in pacientes {
//!     println!("{} {}", paciente.nombre, paciente.apellido);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Auth**: login (token obtain pair), logout, current user
//! - **Usuarios**: CRUD for user accounts
//! - **Odontólogos**: CRUD for dentist profiles
//! - **Pacientes**: CRUD and search for patient records

pub mod api;
pub mod client;
pub mod error;
pub mod types;

mod refresh;

pub use client::{
    ApiRequest, BASE_URL_ENV, ClientBuilder, ClinicaClient, DEFAULT_BASE_URL,
    SessionInvalidatedHook,
};
pub use error::{Error, Result};
pub use types::*;

// Re-export the storage types callers need to configure the client.
pub use clinica_auth::{CredentialStore, StoreScope};
