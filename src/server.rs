//! Stub server: the operations a transport front end calls into.

use crate::config::{GlobalSettings, StubDefinition, StubServerConfig};
use crate::error::StubError;
use crate::matcher;
use crate::requests::{RequestLog, StoredRequest};
use crate::store::StubStore;
use crate::stub::{FindRequest, MethodName, Output, Stub};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Operations exposed to the transport layer.
///
/// Inputs are already decoded; wire formats and status mapping stay on the
/// caller's side.
#[async_trait]
pub trait StubService: Send + Sync {
    /// Validate and store a stub.
    async fn register_stub(&self, definition: StubDefinition) -> Result<(), StubError>;

    /// All registered stubs in registration order.
    async fn list_stubs(&self) -> Vec<Stub>;

    /// Resolve a call to the output of the first matching stub.
    ///
    /// Every call is recorded, whether or not a stub matched.
    async fn find_stub(&self, request: FindRequest) -> Result<Output, StubError>;

    /// Drop all stubs and all recorded calls.
    ///
    /// Lookups in flight finish (and are logged) before the clear; lookups
    /// started afterwards see no stubs and count from zero.
    async fn clear_all(&self);

    /// How many lookups were made for `service`/`method` since the last clear.
    async fn count_calls(&self, service: &str, method: &str) -> usize;

    /// All recorded lookups in arrival order.
    async fn list_requests(&self) -> Vec<StoredRequest>;
}

/// Lookup counters over the life of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LookupStats {
    pub total: u64,
    pub matched: u64,
    pub unmatched: u64,
}

/// In-memory stub server.
///
/// Construct once at startup and share by reference (or `Arc`) with every
/// request handler.
pub struct StubServer {
    settings: GlobalSettings,
    store: StubStore,
    requests: RequestLog,
    /// Held shared by each find-then-log and exclusively by `clear_all`.
    lookup_gate: RwLock<()>,
    /// Total lookups processed.
    lookups_total: AtomicU64,
    /// Lookups that matched a stub.
    lookups_matched: AtomicU64,
    /// Lookups with no matching stub.
    lookups_unmatched: AtomicU64,
}

impl StubServer {
    /// Create a server preloaded with the configured stubs.
    ///
    /// Fails on the first invalid stub; nothing is registered in that case.
    pub fn new(config: StubServerConfig) -> Result<Self, StubError> {
        let stubs = config
            .stubs
            .into_iter()
            .map(Stub::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            stubs = stubs.len(),
            log_matches = config.settings.log_matches,
            "Stub server initialized"
        );

        Ok(Self {
            settings: config.settings,
            store: StubStore::with_stubs(stubs),
            requests: RequestLog::new(),
            lookup_gate: RwLock::new(()),
            lookups_total: AtomicU64::new(0),
            lookups_matched: AtomicU64::new(0),
            lookups_unmatched: AtomicU64::new(0),
        })
    }

    /// Create from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config = StubServerConfig::from_yaml(yaml)?;
        Ok(Self::new(config)?)
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            total: self.lookups_total.load(Ordering::Relaxed),
            matched: self.lookups_matched.load(Ordering::Relaxed),
            unmatched: self.lookups_unmatched.load(Ordering::Relaxed),
        }
    }
}

impl Default for StubServer {
    fn default() -> Self {
        Self {
            settings: GlobalSettings::default(),
            store: StubStore::new(),
            requests: RequestLog::new(),
            lookup_gate: RwLock::new(()),
            lookups_total: AtomicU64::new(0),
            lookups_matched: AtomicU64::new(0),
            lookups_unmatched: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl StubService for StubServer {
    async fn register_stub(&self, definition: StubDefinition) -> Result<(), StubError> {
        let stub = Stub::try_from(definition).inspect_err(|e| {
            warn!(error = %e, "Rejected stub registration");
        })?;

        info!(
            service = %stub.service,
            method = %stub.method,
            strategy = stub.input.kind(),
            "Registered stub"
        );
        self.store.insert(stub).await;
        Ok(())
    }

    async fn list_stubs(&self) -> Vec<Stub> {
        self.store.list().await
    }

    async fn find_stub(&self, request: FindRequest) -> Result<Output, StubError> {
        let _gate = self.lookup_gate.read().await;
        self.lookups_total.fetch_add(1, Ordering::Relaxed);

        let method = MethodName::new(&request.method);
        let candidates = self.store.candidates_for(&request.service, &method).await;

        let outcome = match matcher::find_match(&candidates, &request.data) {
            Some(result) => {
                self.lookups_matched.fetch_add(1, Ordering::Relaxed);
                if self.settings.log_matches {
                    info!(
                        service = %request.service,
                        method = %method,
                        candidate = result.index,
                        strategy = result.stub.input.kind(),
                        "Lookup matched stub"
                    );
                }
                Ok(result.stub.output.clone())
            }
            None => {
                self.lookups_unmatched.fetch_add(1, Ordering::Relaxed);
                if self.settings.log_unmatched {
                    warn!(
                        service = %request.service,
                        method = %method,
                        candidates = candidates.len(),
                        "No matching stub found"
                    );
                }
                Err(StubError::NotFound {
                    service: request.service.clone(),
                    method: method.to_string(),
                    closest: matcher::closest_match(&candidates, &request.data)
                        .map(|stub| Box::new(stub.clone())),
                })
            }
        };

        self.requests
            .record(&request.service, method, request.data)
            .await;
        outcome
    }

    async fn clear_all(&self) {
        let _gate = self.lookup_gate.write().await;
        self.store.clear().await;
        self.requests.clear().await;
        info!("Cleared all stubs and recorded requests");
    }

    async fn count_calls(&self, service: &str, method: &str) -> usize {
        self.requests.count_calls(service, method).await
    }

    async fn list_requests(&self) -> Vec<StoredRequest> {
        self.requests.list_all().await
    }
}
