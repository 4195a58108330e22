//! Main client implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

use clinica_auth::{CredentialStore, StoreScope, open_store};

use crate::api::{AuthApi, OdontologosApi, PacientesApi, UsuariosApi};
use crate::error::{Error, ErrorBody, Result};
use crate::refresh::RefreshCoordinator;

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable naming the API base address.
pub const BASE_URL_ENV: &str = "CLINICA_API_URL";

/// Development default used when the environment provides no base address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Callback invoked after an unrecoverable authentication failure, once the
/// stored credentials have been cleared. The hosting application decides what
/// "return to login" means (navigation, re-prompt, process exit).
pub type SessionInvalidatedHook = Arc<dyn Fn() + Send + Sync>;

/// Description of an outgoing API request.
///
/// Paths are relative to the configured base URL. Any caller-supplied
/// `Authorization` header is overwritten by the stored access token.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// A request plus its retry bookkeeping. Replaying after a refresh produces a
/// new envelope rather than mutating the caller's request, and an envelope
/// passes through the refresh path at most once.
#[derive(Debug, Clone)]
struct Envelope {
    request: ApiRequest,
    attempt: u8,
}

impl Envelope {
    fn first(request: ApiRequest) -> Self {
        Self {
            request,
            attempt: 0,
        }
    }

    fn retried(&self) -> Self {
        Self {
            request: self.request.clone(),
            attempt: 1,
        }
    }
}

/// Clinica API client.
///
/// Every request dispatched through [`ClinicaClient::send`] carries the
/// stored bearer token. A 401 response triggers one coordinated token
/// refresh shared by all concurrently failing requests, and one replay of
/// each failed request; an unrecoverable 401 clears the credential store and
/// fires the session-invalidated hook.
///
/// # Example
///
/// ```no_run
/// use clinica_client::ClinicaClient;
///
/// # async fn example() -> clinica_client::Result<()> {
/// let client = ClinicaClient::builder()
///     .base_url("http://localhost:8000/api")
///     .build()?;
///
/// client.auth().login("admin", "secret").await?;
/// let pacientes = client.pacientes().list().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ClinicaClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) refresh: RefreshCoordinator,
    pub(crate) on_session_invalidated: Option<SessionInvalidatedHook>,
}

impl ClinicaClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client from the environment (`CLINICA_API_URL`), falling
    /// back to the local development server.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Get the credential store (for API implementations).
    pub(crate) fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the authentication API.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the usuarios API.
    pub fn usuarios(&self) -> UsuariosApi {
        UsuariosApi::new(self.clone())
    }

    /// Access the odontólogos API.
    pub fn odontologos(&self) -> OdontologosApi {
        OdontologosApi::new(self.clone())
    }

    /// Access the pacientes API.
    pub fn pacientes(&self) -> PacientesApi {
        PacientesApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request pipeline
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Dispatch a request through the authenticated pipeline.
    ///
    /// This is the sole dispatch entry point: the stored access token is
    /// attached as the bearer header, a first 401 enters the coordinated
    /// refresh protocol and replays the request once with the refreshed
    /// token, and a 401 on the replay is final. When no refresh is possible
    /// the store is cleared, the session-invalidated hook fires, and the
    /// original 401 surfaces as [`Error::Auth`]. All other failures pass
    /// through untouched, with no refresh attempt.
    pub async fn send(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let mut envelope = Envelope::first(request);
        let mut refreshed_token: Option<String> = None;

        loop {
            let response = self.transmit(&envelope, refreshed_token.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return self.check_status(response).await;
            }
            if envelope.attempt > 0 {
                // The replay itself was rejected; no second refresh cycle.
                return Err(self.extract_error(response).await);
            }

            match self
                .inner
                .refresh
                .refresh(
                    self.inner.http.clone(),
                    self.inner.base_url.clone(),
                    Arc::clone(&self.inner.store),
                )
                .await
            {
                Some(token) => {
                    refreshed_token = Some(token);
                    envelope = envelope.retried();
                }
                None => {
                    self.invalidate_session();
                    return Err(self.extract_error(response).await);
                }
            }
        }
    }

    /// Perform one transport dispatch of an envelope.
    ///
    /// The bearer header comes from `token` when given (the replay path),
    /// otherwise from the credential store; either way it overwrites any
    /// caller-supplied `Authorization` value.
    async fn transmit(&self, envelope: &Envelope, token: Option<&str>) -> Result<reqwest::Response> {
        let url = self.url(&envelope.request.path)?;

        let mut headers = envelope.request.headers.clone();
        let bearer = match token {
            Some(t) => Some(t.to_string()),
            None => self.inner.store.access_token(),
        };
        if let Some(t) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {}", t))
                .map_err(|_| Error::Config("Invalid access token".to_string()))?;
            // insert, not append: a caller-supplied Authorization value must
            // not survive alongside the stored token.
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self
            .inner
            .http
            .request(envelope.request.method.clone(), url)
            .timeout(self.inner.timeout)
            .headers(headers);

        if !envelope.request.query.is_empty() {
            builder = builder.query(&envelope.request.query);
        }
        if let Some(body) = &envelope.request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Pass successful responses through, convert failures to errors.
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => format!("HTTP {}", status),
        };

        match status {
            401 => Error::Auth(detail),
            404 => Error::NotFound(detail),
            _ => Error::Api { status, detail },
        }
    }

    /// Tear down the session: clear stored credentials and notify the host.
    fn invalidate_session(&self) {
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!("Failed to clear stored credentials: {}", e);
        }
        tracing::info!("Session invalidated");
        if let Some(hook) = &self.inner.on_session_invalidated {
            hook();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Typed helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(ApiRequest::get(path)).await?;
        Ok(response.json().await?)
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let mut request = ApiRequest::get(path);
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Make a POST request.
    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let request = ApiRequest::post(path, serde_json::to_value(body)?);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Make a PUT request.
    pub(crate) async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let request = ApiRequest::put(path, serde_json::to_value(body)?);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Make a PATCH request.
    pub(crate) async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let request =
            ApiRequest::new(Method::PATCH, path).with_body(serde_json::to_value(body)?);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Make a DELETE request.
    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }
}

/// Builder for creating a [`ClinicaClient`].
pub struct ClientBuilder {
    base_url: Option<String>,
    storage: StoreScope,
    data_dir: Option<PathBuf>,
    store: Option<Arc<dyn CredentialStore>>,
    on_session_invalidated: Option<SessionInvalidatedHook>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            storage: StoreScope::default(),
            data_dir: None,
            store: None,
            on_session_invalidated: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the API base URL. When unset, `CLINICA_API_URL` is consulted and
    /// the local development server is the final fallback.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Select the credential storage scope (durable by default).
    pub fn storage(mut self, scope: StoreScope) -> Self {
        self.storage = scope;
        self
    }

    /// Set the data directory holding the durable credential document.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Inject a credential store directly, overriding the scope selection.
    /// Tests use this to reset credential state between cases.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register the hook fired after an unrecoverable authentication failure.
    pub fn on_session_invalidated(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_session_invalidated = Some(Arc::new(hook));
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ClinicaClient> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let store = match self.store {
            Some(store) => store,
            None => {
                let data_dir = match self.data_dir {
                    Some(dir) => dir,
                    None => default_data_dir()?,
                };
                open_store(self.storage, &data_dir)
            }
        };

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("clinica-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(ClinicaClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                store,
                refresh: RefreshCoordinator::default(),
                on_session_invalidated: self.on_session_invalidated,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("clinica"))
        .ok_or_else(|| Error::Config("Could not determine a data directory".to_string()))
}
