//! Credential handling for the Clinica management API.
//!
//! # Components
//!
//! - [`tokens`] — credential pair model and the refresh-token exchange call
//! - [`store`] — scoped credential storage (durable file or session memory)

pub mod error;
pub mod store;
pub mod tokens;

pub use error::{AuthError, Result};
pub use store::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreScope, open_store,
};
pub use tokens::{CredentialPair, refresh_access_token};
