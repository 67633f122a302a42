//! Request log for call verification.
//!
//! Every lookup is recorded here, matched or not. Call counts are derived from
//! the log rather than kept as separate counters.

use crate::config::Payload;
use crate::stub::MethodName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// A recorded lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRequest {
    /// Arrival order, starting at 0 after each clear
    pub sequence: u64,
    pub service: String,
    pub method: MethodName,
    pub data: Payload,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LogInner {
    entries: Vec<StoredRequest>,
    next_sequence: u64,
}

/// Append-only log of lookups, reset by [`RequestLog::clear`].
#[derive(Debug, Default)]
pub struct RequestLog {
    inner: RwLock<LogInner>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lookup. Returns its sequence number.
    pub async fn record(&self, service: &str, method: MethodName, data: Payload) -> u64 {
        let mut inner = self.inner.write().await;
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.entries.push(StoredRequest {
            sequence,
            service: service.to_string(),
            method,
            data,
            received_at: Utc::now(),
        });
        sequence
    }

    /// Number of recorded lookups for `service`/`method`.
    ///
    /// `method` is canonicalized the same way as at registration.
    pub async fn count_calls(&self, service: &str, method: &str) -> usize {
        let method = MethodName::new(method);
        self.inner
            .read()
            .await
            .entries
            .iter()
            .filter(|entry| entry.service == service && entry.method == method)
            .count()
    }

    /// All recorded lookups in arrival order.
    pub async fn list_all(&self) -> Vec<StoredRequest> {
        self.inner.read().await.entries.clone()
    }

    /// Drop every entry and restart sequence numbering.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.next_sequence = 0;
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn payload(n: i64) -> Payload {
        let mut data = Payload::new();
        data.insert("n".to_string(), json!(n));
        data
    }

    #[tokio::test]
    async fn test_record_and_count() {
        let log = RequestLog::new();
        log.record("Greeter", MethodName::new("sayHello"), payload(1)).await;
        log.record("Greeter", MethodName::new("SayHello"), payload(2)).await;
        log.record("Greeter", MethodName::new("Other"), payload(3)).await;

        assert_eq!(log.count_calls("Greeter", "SayHello").await, 2);
        assert_eq!(log.count_calls("Greeter", "sayhello").await, 2);
        assert_eq!(log.count_calls("Greeter", "Other").await, 1);
        assert_eq!(log.count_calls("Greeter", "Never").await, 0);
        assert_eq!(log.count_calls("Unknown", "SayHello").await, 0);
    }

    #[tokio::test]
    async fn test_list_all_in_order() {
        let log = RequestLog::new();
        for n in 0..3 {
            let seq = log.record("Greeter", MethodName::new("SayHello"), payload(n)).await;
            assert_eq!(seq, n as u64);
        }

        let entries = log.list_all().await;
        assert_eq!(entries.len(), 3);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.sequence, i as u64);
            assert_eq!(entry.data, payload(i as i64));
            assert_eq!(entry.method.as_str(), "Sayhello");
        }
        assert!(entries[0].received_at <= entries[2].received_at);
    }

    #[tokio::test]
    async fn test_clear_resets_sequence() {
        let log = RequestLog::new();
        log.record("Greeter", MethodName::new("SayHello"), payload(1)).await;
        log.record("Greeter", MethodName::new("SayHello"), payload(2)).await;

        log.clear().await;
        assert!(log.is_empty().await);
        assert_eq!(log.count_calls("Greeter", "SayHello").await, 0);

        let seq = log.record("Greeter", MethodName::new("SayHello"), payload(3)).await;
        assert_eq!(seq, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_all_kept() {
        let log = Arc::new(RequestLog::new());
        let mut handles = Vec::new();
        for n in 0..50 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                log.record("Greeter", MethodName::new("SayHello"), payload(n)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let entries = log.list_all().await;
        assert_eq!(entries.len(), 50);
        let mut sequences: Vec<u64> = entries.iter().map(|e| e.sequence).collect();
        sequences.dedup();
        assert_eq!(sequences, (0..50).collect::<Vec<u64>>());
    }
}
