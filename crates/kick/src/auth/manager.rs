//! Credential lifecycle management.
//!
//! [`CredentialManager`] owns the current [`Credential`], decides when it is
//! stale and coordinates refreshes. Refreshes are single-flight: while one
//! refresh call is in flight every other caller awaits the same outcome
//! instead of spending the (single-use) refresh token a second time.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::credential::Credential;
use crate::config::DEFAULT_REFRESH_THRESHOLD_SECS;
use crate::error::{BoxError, KickError, Result};

/// Performs the refresh-token grant.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchange `refresh_token` for a brand new credential.
    async fn refresh(&self, refresh_token: &str) -> Result<Credential>;
}

#[async_trait]
impl<F, Fut> TokenRefresher for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Credential>> + Send + 'static,
{
    async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        (self)(refresh_token.to_string()).await
    }
}

/// Receives every credential the manager installs.
///
/// This is the only persistence hook; the manager itself stores nothing.
#[async_trait]
pub trait CredentialSink: Send + Sync {
    async fn persist(&self, credential: &Credential) -> std::result::Result<(), BoxError>;
}

#[async_trait]
impl<F> CredentialSink for F
where
    F: Fn(&Credential) + Send + Sync,
{
    async fn persist(&self, credential: &Credential) -> std::result::Result<(), BoxError> {
        (self)(credential);
        Ok(())
    }
}

type RefreshOutcome = std::result::Result<Credential, Arc<KickError>>;

/// An in-flight refresh.
#[derive(Clone)]
pub struct RefreshState {
    id: u64,
    started_at: DateTime<Utc>,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

impl RefreshState {
    /// When the refresh call was issued.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[derive(Default)]
struct ManagerState {
    credential: Option<Credential>,
    refreshing: Option<RefreshState>,
    /// Bumped on every install. A refresh or sink update carrying an older
    /// generation has been superseded.
    generation: u64,
}

impl ManagerState {
    fn install(&mut self, credential: Credential) -> u64 {
        self.credential = Some(credential);
        self.generation += 1;
        self.generation
    }

    fn clear_refresh(&mut self, id: u64) {
        if self.refreshing.as_ref().is_some_and(|r| r.id == id) {
            self.refreshing = None;
        }
    }
}

struct ManagerInner {
    state: Mutex<ManagerState>,
    refresher: Arc<dyn TokenRefresher>,
    sink: Option<Arc<dyn CredentialSink>>,
    /// Serializes sink updates so they reach the sink in install order.
    sink_order: tokio::sync::Mutex<()>,
    refresh_threshold: Duration,
    next_refresh_id: AtomicU64,
}

impl ManagerInner {
    /// Hand the credential installed as `generation` to the sink, unless a
    /// newer install has happened since.
    async fn notify_sink(&self, credential: &Credential, generation: u64) {
        let Some(sink) = &self.sink else {
            return;
        };
        let _ordered = self.sink_order.lock().await;
        let current = self.state.lock().generation;
        if current != generation {
            debug!(generation, current, "Skipping superseded credential update");
            return;
        }
        if let Err(e) = sink.persist(credential).await {
            warn!(error = %e, "Failed to persist credential update (non-fatal)");
        }
    }

    /// Install the outcome of refresh `id`, started at `generation`.
    ///
    /// Returns the new generation, or the credential installed in the
    /// meantime when `initialize` superseded the refresh.
    fn install_refreshed(
        &self,
        id: u64,
        generation: u64,
        refreshed: Credential,
    ) -> std::result::Result<u64, Credential> {
        let mut state = self.state.lock();
        state.clear_refresh(id);
        if state.generation != generation {
            return Err(state.credential.clone().unwrap_or(refreshed));
        }
        Ok(state.install(refreshed))
    }

    fn abandon_refresh(&self, id: u64) {
        self.state.lock().clear_refresh(id);
    }
}

/// Builder for [`CredentialManager`].
pub struct CredentialManagerBuilder {
    refresher: Arc<dyn TokenRefresher>,
    sink: Option<Arc<dyn CredentialSink>>,
    refresh_threshold: Duration,
}

impl CredentialManagerBuilder {
    /// Notify `sink` on every install and refresh.
    pub fn sink(mut self, sink: Arc<dyn CredentialSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Refresh this long before expiry (default 60s).
    pub fn refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    pub fn build(self) -> CredentialManager {
        CredentialManager {
            inner: Arc::new(ManagerInner {
                state: Mutex::new(ManagerState::default()),
                refresher: self.refresher,
                sink: self.sink,
                sink_order: tokio::sync::Mutex::new(()),
                refresh_threshold: self.refresh_threshold,
                next_refresh_id: AtomicU64::new(1),
            }),
        }
    }
}

/// Owns the current credential and keeps it fresh.
///
/// Cloning is cheap; clones share the same credential and refresh state.
#[derive(Clone)]
pub struct CredentialManager {
    inner: Arc<ManagerInner>,
}

impl CredentialManager {
    /// Start building a manager around `refresher`.
    pub fn builder(refresher: Arc<dyn TokenRefresher>) -> CredentialManagerBuilder {
        CredentialManagerBuilder {
            refresher,
            sink: None,
            refresh_threshold: Duration::from_secs(DEFAULT_REFRESH_THRESHOLD_SECS),
        }
    }

    /// Create a manager with the default threshold and no sink.
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self::builder(refresher).build()
    }

    /// Install a credential, replacing any previous one.
    ///
    /// A refresh still in flight for the replaced credential is discarded
    /// when it completes.
    pub async fn initialize(&self, credential: Credential) {
        let generation = {
            let mut state = self.inner.state.lock();
            state.refreshing = None;
            state.install(credential.clone())
        };
        debug!(expires_at = ?credential.expires_at, "Credential installed");
        self.inner.notify_sink(&credential, generation).await;
    }

    /// Snapshot of the installed credential.
    pub fn current(&self) -> Option<Credential> {
        self.inner.state.lock().credential.clone()
    }

    /// Whether a credential has been installed.
    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().credential.is_some()
    }

    /// Whether a refresh call is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.state.lock().refreshing.is_some()
    }

    /// Return an access token, refreshing first if it is inside the refresh window.
    ///
    /// If the refresh fails but the old token has not hit its hard expiry yet,
    /// the old token is returned and the next call retries the refresh.
    #[instrument(skip(self))]
    pub async fn get_valid_access_token(&self) -> Result<String> {
        let pending = {
            let mut state = self.inner.state.lock();
            let credential = state
                .credential
                .as_ref()
                .ok_or(KickError::CredentialUninitialized)?;

            if !credential.needs_refresh(Utc::now(), self.inner.refresh_threshold) {
                return Ok(credential.access_token.clone());
            }

            debug!(expires_at = ?credential.expires_at, "Access token inside refresh window");
            self.begin_refresh(&mut state)
        };

        let outcome = match pending {
            Ok(refresh) => refresh.outcome.await,
            Err(e) => Err(Arc::new(e)),
        };

        match outcome {
            Ok(credential) => Ok(credential.access_token),
            Err(cause) => self.stale_token_or(cause),
        }
    }

    /// Refresh unconditionally, joining an in-flight refresh if there is one.
    #[instrument(skip(self))]
    pub async fn force_refresh(&self) -> Result<String> {
        let refresh = {
            let mut state = self.inner.state.lock();
            if state.credential.is_none() {
                return Err(KickError::CredentialUninitialized);
            }
            self.begin_refresh(&mut state)
                .map_err(|e| KickError::RefreshFailed(Arc::new(e)))?
        };

        refresh
            .outcome
            .await
            .map(|credential| credential.access_token)
            .map_err(KickError::RefreshFailed)
    }

    /// Join the in-flight refresh or start a new one.
    ///
    /// Must be called with the state lock held so that at most one refresh
    /// is ever started per staleness event.
    fn begin_refresh(&self, state: &mut ManagerState) -> Result<RefreshState> {
        if let Some(refresh) = &state.refreshing {
            debug!("Joining in-flight token refresh");
            return Ok(refresh.clone());
        }

        let refresh_token = state
            .credential
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
            .ok_or(KickError::MissingRefreshToken)?;

        let id = self.inner.next_refresh_id.fetch_add(1, Ordering::Relaxed);
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);

        info!(refresh_id = id, "Starting token refresh");

        // Detached: dropping a waiter never cancels the refresh.
        let task = tokio::spawn(async move {
            match inner.refresher.refresh(&refresh_token).await {
                Ok(credential) => {
                    match inner.install_refreshed(id, generation, credential.clone()) {
                        Ok(installed) => {
                            info!(
                                refresh_id = id,
                                expires_at = ?credential.expires_at,
                                "Token refresh successful"
                            );
                            inner.notify_sink(&credential, installed).await;
                            Ok(credential)
                        }
                        Err(current) => {
                            warn!(
                                refresh_id = id,
                                "Credential replaced during refresh; discarding refreshed token"
                            );
                            Ok(current)
                        }
                    }
                }
                Err(e) => {
                    inner.abandon_refresh(id);
                    error!(refresh_id = id, error = %e, "Token refresh failed");
                    Err(Arc::new(e))
                }
            }
        });

        let inner = Arc::clone(&self.inner);
        let outcome = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    inner.abandon_refresh(id);
                    Err(Arc::new(KickError::Io(std::io::Error::other(join_error))))
                }
            }
        }
        .boxed()
        .shared();

        let refresh = RefreshState {
            id,
            started_at: Utc::now(),
            outcome,
        };
        state.refreshing = Some(refresh.clone());
        Ok(refresh)
    }

    fn stale_token_or(&self, cause: Arc<KickError>) -> Result<String> {
        let state = self.inner.state.lock();
        match &state.credential {
            Some(credential) if !credential.is_expired(Utc::now()) => {
                warn!(
                    error = %cause,
                    expires_at = ?credential.expires_at,
                    "Token refresh failed; serving current token until it expires"
                );
                Ok(credential.access_token.clone())
            }
            _ => Err(KickError::RefreshFailed(cause)),
        }
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CredentialManager")
            .field("credential", &state.credential)
            .field("refreshing", &state.refreshing.is_some())
            .field("refresh_threshold", &self.inner.refresh_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::AtomicUsize;

    struct CountingRefresher {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingRefresher {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::from_millis(10),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<Credential> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(KickError::TokenEndpoint {
                    status: 400,
                    body: "invalid_grant".to_string(),
                });
            }
            Ok(Credential::new(format!("access-{n}"), Some(format!("refresh-{n}")))
                .with_expires_at(Utc::now() + ChronoDuration::seconds(3600)))
        }
    }

    fn credential_expiring_in(secs: i64) -> Credential {
        Credential::new("access-0", Some("refresh-0".to_string()))
            .with_expires_at(Utc::now() + ChronoDuration::seconds(secs))
    }

    #[tokio::test]
    async fn test_uninitialized() {
        let manager = CredentialManager::new(CountingRefresher::new(Duration::ZERO));
        assert!(matches!(
            manager.get_valid_access_token().await,
            Err(KickError::CredentialUninitialized)
        ));
        assert!(matches!(
            manager.force_refresh().await,
            Err(KickError::CredentialUninitialized)
        ));
    }

    #[tokio::test]
    async fn test_fresh_token_is_returned_without_refresh() {
        let refresher = CountingRefresher::new(Duration::ZERO);
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(credential_expiring_in(3600)).await;

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "access-0");
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_token_without_expiry_is_opaque() {
        let refresher = CountingRefresher::new(Duration::ZERO);
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(Credential::new("external", None)).await;

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "external");
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = CountingRefresher::new(Duration::from_millis(50));
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(credential_expiring_in(60)).await;

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get_valid_access_token().await })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert_eq!(task.unwrap().unwrap(), "access-1");
        }
        assert_eq!(refresher.calls(), 1);
        assert!(!manager.is_refreshing());
    }

    #[tokio::test]
    async fn test_refreshed_token_is_reused() {
        let refresher = CountingRefresher::new(Duration::ZERO);
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(credential_expiring_in(30)).await;

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "access-1");
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "access-1");
        assert_eq!(refresher.calls(), 1);
        assert_eq!(
            manager.current().unwrap().refresh_token.as_deref(),
            Some("refresh-1")
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_stale_token_and_retries() {
        let refresher = CountingRefresher::failing();
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(credential_expiring_in(30)).await;

        assert_eq!(manager.get_valid_access_token().await.unwrap(), "access-0");
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "access-0");
        assert_eq!(refresher.calls(), 2);
        assert_eq!(manager.current().unwrap().access_token, "access-0");
    }

    #[tokio::test]
    async fn test_failed_refresh_of_expired_token_surfaces_error() {
        let refresher = CountingRefresher::failing();
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(credential_expiring_in(-10)).await;

        let err = manager.get_valid_access_token().await.unwrap_err();
        assert!(matches!(err, KickError::RefreshFailed(_)));
        // the last good credential survives
        assert_eq!(manager.current().unwrap().access_token, "access-0");
    }

    #[tokio::test]
    async fn test_force_refresh_without_refresh_token() {
        let refresher = CountingRefresher::new(Duration::ZERO);
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(Credential::new("a", None)).await;

        let err = manager.force_refresh().await.unwrap_err();
        match err {
            KickError::RefreshFailed(cause) => {
                assert!(matches!(*cause, KickError::MissingRefreshToken))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_threshold() {
        let refresher = CountingRefresher::new(Duration::ZERO);
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(credential_expiring_in(3600)).await;

        assert_eq!(manager.force_refresh().await.unwrap(), "access-1");
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_sink_sees_every_install() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |credential: &Credential| {
            sink_seen.lock().push(credential.access_token.clone());
        };

        let manager = CredentialManager::builder(CountingRefresher::new(Duration::ZERO))
            .sink(Arc::new(sink))
            .build();
        manager.initialize(credential_expiring_in(30)).await;
        manager.get_valid_access_token().await.unwrap();

        assert_eq!(*seen.lock(), vec!["access-0", "access-1"]);
    }

    #[tokio::test]
    async fn test_sink_follows_install_order_across_refreshes() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |credential: &Credential| {
            sink_seen.lock().push(credential.access_token.clone());
        };

        let manager = CredentialManager::builder(CountingRefresher::new(Duration::from_millis(5)))
            .sink(Arc::new(sink))
            .build();
        manager.initialize(credential_expiring_in(30)).await;
        manager.get_valid_access_token().await.unwrap();
        manager.force_refresh().await.unwrap();

        assert_eq!(*seen.lock(), vec!["access-0", "access-1", "access-2"]);
        assert_eq!(
            seen.lock().last().cloned(),
            manager.current().map(|c| c.access_token)
        );
    }

    #[tokio::test]
    async fn test_initialize_during_refresh_wins() {
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |credential: &Credential| {
            sink_seen.lock().push(credential.access_token.clone());
        };

        let refresher = CountingRefresher::new(Duration::from_millis(50));
        let manager = CredentialManager::builder(refresher.clone())
            .sink(Arc::new(sink))
            .build();
        manager.initialize(credential_expiring_in(30)).await;

        let waiter = tokio::spawn({
            let manager = manager.clone();
            async move { manager.get_valid_access_token().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(manager.is_refreshing());

        let reauthorized = Credential::new("reauthorized", Some("fresh".to_string()))
            .with_expires_at(Utc::now() + ChronoDuration::seconds(3600));
        manager.initialize(reauthorized).await;
        assert!(!manager.is_refreshing());

        // the waiter gets the credential installed while it waited
        assert_eq!(waiter.await.unwrap().unwrap(), "reauthorized");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(manager.current().unwrap().access_token, "reauthorized");
        assert_eq!(manager.get_valid_access_token().await.unwrap(), "reauthorized");
        assert_eq!(refresher.calls(), 1);
        assert_eq!(*seen.lock(), vec!["access-0", "reauthorized"]);
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_cancel_refresh() {
        let refresher = CountingRefresher::new(Duration::from_millis(50));
        let manager = CredentialManager::new(refresher.clone());
        manager.initialize(credential_expiring_in(30)).await;

        let gave_up =
            tokio::time::timeout(Duration::from_millis(5), manager.get_valid_access_token()).await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(manager.current().unwrap().access_token, "access-1");
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_closure_refresher() {
        let refresher = |token: String| async move {
            Ok::<_, KickError>(Credential::new(
                format!("from-{token}"),
                Some("next".to_string()),
            ))
        };
        let manager = CredentialManager::builder(Arc::new(refresher))
            .refresh_threshold(Duration::from_secs(120))
            .build();
        manager.initialize(credential_expiring_in(90)).await;

        assert_eq!(
            manager.get_valid_access_token().await.unwrap(),
            "from-refresh-0"
        );
    }
}
