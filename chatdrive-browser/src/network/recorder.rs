//! Request/response pairing for CDP network events.

use crate::handle::Exchange;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Completed exchanges kept in memory; older ones are discarded.
const MAX_RETAINED: usize = 256;

/// Requests awaiting completion; the oldest is evicted beyond this.
const MAX_PENDING: usize = 512;

/// Network request being tracked until its body is available.
#[derive(Debug, Clone)]
struct PendingExchange {
    method: String,
    url: String,
    status: Option<u16>,
    start_time: std::time::Instant,
    /// Arrival order, used for eviction.
    seq: u64,
}

/// Completed exchanges with stable positions across trimming.
#[derive(Debug, Default)]
struct ExchangeLog {
    discarded: usize,
    retained: VecDeque<Exchange>,
}

impl ExchangeLog {
    fn push(&mut self, exchange: Exchange) {
        self.retained.push_back(exchange);
        while self.retained.len() > MAX_RETAINED {
            self.retained.pop_front();
            self.discarded += 1;
        }
    }

    fn count(&self) -> usize {
        self.discarded + self.retained.len()
    }

    fn since(&self, mark: usize) -> Vec<Exchange> {
        let skip = mark.saturating_sub(self.discarded);
        self.retained.iter().skip(skip).cloned().collect()
    }
}

/// Pairs `requestWillBeSent` / `responseReceived` / `loadingFinished`
/// events into completed [`Exchange`]s.
#[derive(Debug, Clone)]
pub struct ExchangeRecorder {
    ignored_methods: Arc<Vec<String>>,
    pending: Arc<RwLock<HashMap<String, PendingExchange>>>,
    next_seq: Arc<AtomicU64>,
    completed: Arc<RwLock<ExchangeLog>>,
}

impl ExchangeRecorder {
    /// Create a recorder that skips the given HTTP methods.
    pub fn new(ignored_methods: &[String]) -> Self {
        Self {
            ignored_methods: Arc::new(ignored_methods.iter().map(|m| m.to_uppercase()).collect()),
            pending: Arc::new(RwLock::new(HashMap::new())),
            next_seq: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(RwLock::new(ExchangeLog::default())),
        }
    }

    /// Check if a request with this method should be recorded.
    pub fn should_record(&self, method: &str) -> bool {
        let method = method.to_uppercase();
        !self.ignored_methods.iter().any(|m| *m == method)
    }

    /// Handle a request event.
    pub async fn on_request(&self, request_id: &str, url: &str, method: &str) {
        if !self.should_record(method) {
            return;
        }

        let pending = PendingExchange {
            method: method.to_uppercase(),
            url: url.to_string(),
            status: None,
            start_time: std::time::Instant::now(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };

        let mut tracked = self.pending.write().await;
        if tracked.len() >= MAX_PENDING {
            // Long-lived streams never finish; forget the oldest.
            let oldest = tracked
                .iter()
                .min_by_key(|(_, p)| p.seq)
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                tracing::trace!(request_id = %id, "Evicting stale pending request");
                tracked.remove(&id);
            }
        }
        tracked.insert(request_id.to_string(), pending);
    }

    /// Handle a response headers event.
    pub async fn on_response(&self, request_id: &str, status: u16) {
        if let Some(pending) = self.pending.write().await.get_mut(request_id) {
            pending.status = Some(status);
        }
    }

    /// Whether the request is awaiting completion.
    pub async fn is_tracked(&self, request_id: &str) -> bool {
        self.pending.read().await.contains_key(request_id)
    }

    /// Handle the end of loading, with the body if it could be fetched.
    pub async fn on_finished(&self, request_id: &str, body: Option<Vec<u8>>) {
        let pending = self.pending.write().await.remove(request_id);

        let Some(pending) = pending else {
            // Request wasn't being tracked
            return;
        };

        tracing::trace!(
            method = %pending.method,
            url = %pending.url,
            status = ?pending.status,
            duration_ms = pending.start_time.elapsed().as_millis() as u64,
            "Exchange recorded"
        );

        self.completed.write().await.push(Exchange {
            method: pending.method,
            url: pending.url,
            status: pending.status,
            body,
        });
    }

    /// Handle a failed request. Failed requests never produce an exchange.
    pub async fn on_failed(&self, request_id: &str) {
        self.pending.write().await.remove(request_id);
    }

    /// Position the next completed exchange will take.
    pub async fn exchange_count(&self) -> usize {
        self.completed.read().await.count()
    }

    /// Completed exchanges at or after `mark`, oldest first.
    pub async fn exchanges_since(&self, mark: usize) -> Vec<Exchange> {
        self.completed.read().await.since(mark)
    }

    /// Get count of pending requests.
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}
