//! Scoped credential storage.
//!
//! Credentials live in exactly one of two scopes, chosen once at client
//! construction: a durable JSON document on disk that survives restarts, or
//! process-lifetime memory for session-only logins. The document keys
//! (`accessToken`, `refreshToken`, `usuario`) match the keys the web frontend
//! uses, so a shared durable store stays interoperable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::tokens::CredentialPair;

/// File name of the durable credential document.
pub const CREDENTIAL_FILE: &str = "credentials.json";

/// Storage scope for credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreScope {
    /// Survives process restarts.
    #[default]
    #[serde(rename = "local")]
    Durable,
    /// Lives only for the current process.
    #[serde(rename = "session")]
    Session,
}

/// The stored document: at most one active credential pair per scope, plus a
/// cached copy of the authenticated user's identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CredentialDocument {
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(rename = "usuario", skip_serializing_if = "Option::is_none")]
    usuario: Option<serde_json::Value>,
}

/// Storage for the active credential pair and cached session identity.
///
/// Implementations are synchronous; all I/O is small and local. Reads treat
/// an unreadable or malformed backing store as empty.
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// The current access token, if any.
    fn access_token(&self) -> Option<String>;

    /// The current refresh token, if any.
    fn refresh_token(&self) -> Option<String>;

    /// Store a full pair (login, or any exchange returning both tokens).
    fn set_pair(&self, pair: &CredentialPair) -> Result<()>;

    /// Replace only the access token, keeping the stored refresh token.
    fn set_access_token(&self, token: &str) -> Result<()>;

    /// The cached identity of the authenticated user, if any.
    fn cached_user(&self) -> Option<serde_json::Value>;

    /// Cache the authenticated user's identity.
    fn set_cached_user(&self, user: serde_json::Value) -> Result<()>;

    /// Remove both tokens and the cached identity.
    fn clear(&self) -> Result<()>;
}

/// Open the store for the given scope.
///
/// `data_dir` is only consulted for the durable scope.
pub fn open_store(scope: StoreScope, data_dir: &Path) -> Arc<dyn CredentialStore> {
    match scope {
        StoreScope::Durable => Arc::new(FileCredentialStore::new(data_dir)),
        StoreScope::Session => Arc::new(MemoryCredentialStore::new()),
    }
}

// ============================================================================
// FileCredentialStore
// ============================================================================

/// Durable credential store backed by a JSON document on disk, with a
/// read-through in-memory cache.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cache: RwLock<Option<CredentialDocument>>,
}

impl FileCredentialStore {
    /// Create a store rooted at the given data directory.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(CREDENTIAL_FILE),
            cache: RwLock::new(None),
        }
    }

    /// Create a store with a custom document path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            cache: RwLock::new(None),
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> CredentialDocument {
        if let Some(doc) = self.cache.read().clone() {
            return doc;
        }

        let doc = match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(
                    "Ignoring malformed credential file {}: {}",
                    self.path.display(),
                    e
                );
                CredentialDocument::default()
            }),
            Err(_) => CredentialDocument::default(),
        };

        *self.cache.write() = Some(doc.clone());
        doc
    }

    fn persist(&self, doc: CredentialDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AuthError::Storage(format!("Failed to create credential directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&doc).map_err(|e| {
            AuthError::Serialization(format!("Failed to serialize credentials: {}", e))
        })?;

        std::fs::write(&self.path, json)
            .map_err(|e| AuthError::Storage(format!("Failed to write credential file: {}", e)))?;

        *self.cache.write() = Some(doc);
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.load().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.load().refresh_token
    }

    fn set_pair(&self, pair: &CredentialPair) -> Result<()> {
        let mut doc = self.load();
        doc.access_token = Some(pair.access.clone());
        doc.refresh_token = Some(pair.refresh.clone());
        self.persist(doc)?;
        tracing::info!("Credentials saved to {}", self.path.display());
        Ok(())
    }

    fn set_access_token(&self, token: &str) -> Result<()> {
        let mut doc = self.load();
        doc.access_token = Some(token.to_string());
        self.persist(doc)
    }

    fn cached_user(&self) -> Option<serde_json::Value> {
        self.load().usuario
    }

    fn set_cached_user(&self, user: serde_json::Value) -> Result<()> {
        let mut doc = self.load();
        doc.usuario = Some(user);
        self.persist(doc)
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| {
                AuthError::Storage(format!("Failed to delete credential file: {}", e))
            })?;
        }
        *self.cache.write() = Some(CredentialDocument::default());
        tracing::info!("Stored credentials cleared");
        Ok(())
    }
}

// ============================================================================
// MemoryCredentialStore
// ============================================================================

/// Session-scoped credential store. Also used by tests, which inject a fresh
/// instance per case.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    doc: RwLock<CredentialDocument>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.doc.read().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.doc.read().refresh_token.clone()
    }

    fn set_pair(&self, pair: &CredentialPair) -> Result<()> {
        let mut doc = self.doc.write();
        doc.access_token = Some(pair.access.clone());
        doc.refresh_token = Some(pair.refresh.clone());
        Ok(())
    }

    fn set_access_token(&self, token: &str) -> Result<()> {
        self.doc.write().access_token = Some(token.to_string());
        Ok(())
    }

    fn cached_user(&self) -> Option<serde_json::Value> {
        self.doc.read().usuario.clone()
    }

    fn set_cached_user(&self, user: serde_json::Value) -> Result<()> {
        self.doc.write().usuario = Some(user);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.doc.write() = CredentialDocument::default();
        Ok(())
    }
}
