//! In-memory stub store.
//!
//! Stubs are kept in registration order and indexed by (service, method) so a
//! lookup only evaluates its own candidates.

use crate::stub::{MethodName, Stub};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StubKey {
    service: String,
    method: MethodName,
}

impl StubKey {
    fn of(stub: &Stub) -> Self {
        Self {
            service: stub.service.clone(),
            method: stub.method.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    /// All stubs, in registration order
    stubs: Vec<Arc<Stub>>,
    /// Per-method candidates, each in registration order
    index: HashMap<StubKey, Vec<Arc<Stub>>>,
}

impl StoreInner {
    fn push(&mut self, stub: Stub) {
        let stub = Arc::new(stub);
        self.index
            .entry(StubKey::of(&stub))
            .or_default()
            .push(Arc::clone(&stub));
        self.stubs.push(stub);
    }
}

/// Shared store of registered stubs.
///
/// Accepts only validated [`Stub`]s. Duplicates for the same method are kept;
/// registration order decides which one matches.
#[derive(Debug, Default)]
pub struct StubStore {
    inner: RwLock<StoreInner>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with `stubs`, in order.
    pub fn with_stubs(stubs: impl IntoIterator<Item = Stub>) -> Self {
        let mut inner = StoreInner::default();
        for stub in stubs {
            inner.push(stub);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Append a stub.
    pub async fn insert(&self, stub: Stub) {
        self.inner.write().await.push(stub);
    }

    /// All stubs in registration order.
    pub async fn list(&self) -> Vec<Stub> {
        self.inner
            .read()
            .await
            .stubs
            .iter()
            .map(|stub| stub.as_ref().clone())
            .collect()
    }

    /// Remove every stub.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.stubs.clear();
        inner.index.clear();
    }

    /// Stubs registered for `service`/`method`, in registration order.
    pub async fn candidates_for(&self, service: &str, method: &MethodName) -> Vec<Arc<Stub>> {
        let key = StubKey {
            service: service.to_string(),
            method: method.clone(),
        };
        self.inner
            .read()
            .await
            .index
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.stubs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
