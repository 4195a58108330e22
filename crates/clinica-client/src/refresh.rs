//! Single-flight coordination of the refresh-token exchange.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use url::Url;

use clinica_auth::CredentialStore;

/// Outcome shared by every waiter of one refresh cycle: the new access token,
/// or `None` when the session cannot be recovered (no refresh token stored,
/// or the exchange failed in any way).
type Outcome = Option<String>;

type PendingRefresh = Shared<BoxFuture<'static, Outcome>>;

/// Coordinates the refresh-token exchange so that any number of requests
/// failing with 401 in the same window share exactly one exchange call.
///
/// The slot is guarded by a synchronous mutex: the check-and-set deciding
/// which caller starts the exchange is atomic, and every later caller clones
/// the already-pending shared future instead of issuing its own call. Once
/// the shared outcome has been consumed the slot resets to idle, so a later
/// 401 starts a fresh cycle.
#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    pending: Mutex<Option<PendingRefresh>>,
}

impl RefreshCoordinator {
    /// Obtain a refreshed access token, joining an in-flight exchange when
    /// one exists.
    pub(crate) async fn refresh(
        &self,
        http: reqwest::Client,
        base_url: Url,
        store: Arc<dyn CredentialStore>,
    ) -> Outcome {
        let pending = {
            let mut slot = self.pending.lock();
            match slot.as_ref() {
                Some(inflight) => {
                    tracing::debug!("Joining in-flight token refresh");
                    inflight.clone()
                }
                None => {
                    let fut = run_refresh(http, base_url, store).boxed().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let outcome = pending.clone().await;

        // Back to idle once the outcome is consumed. A newer cycle may
        // already occupy the slot, so only clear our own future.
        let mut slot = self.pending.lock();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&pending)) {
            *slot = None;
        }

        outcome
    }
}

/// One refresh cycle: a single exchange attempt, no internal retries.
/// Failures of any kind collapse into `None`; waiters cannot distinguish an
/// unreachable server from a rejected refresh token.
async fn run_refresh(
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn CredentialStore>,
) -> Outcome {
    let Some(refresh_token) = store.refresh_token() else {
        tracing::warn!("No refresh token stored, session cannot be recovered");
        return None;
    };

    match clinica_auth::refresh_access_token(&http, &base_url, &refresh_token).await {
        Ok(access) => {
            if let Err(e) = store.set_access_token(&access) {
                tracing::warn!("Failed to persist refreshed access token: {}", e);
            }
            tracing::info!("Access token refreshed");
            Some(access)
        }
        Err(e) => {
            tracing::warn!("Token refresh failed: {}", e);
            None
        }
    }
}
