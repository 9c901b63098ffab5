//! Bridge session identity, state and lifetime tracking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::bridge::subscription::ClientSubscription;

/// Relaxed ordering is enough: ids only need to be unique.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tap-{}", self.0)
    }
}

/// Bridge session state machine.
///
/// ```text
/// AwaitingSubscription ──first client message──▶ Streaming
///          │                                        │
///          └──────── close / error / shutdown ──────┴──▶ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Client connected; upstream not opened yet.
    AwaitingSubscription,
    /// Upstream open and subscribed; frames relayed to the client.
    Streaming,
    /// Both sides closed or being closed.
    Closed,
}

/// One client↔upstream pairing.
#[derive(Debug)]
pub struct BridgeSession {
    id: SessionId,
    state: SessionState,
    subscription: Option<ClientSubscription>,
}

impl BridgeSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::AwaitingSubscription,
            subscription: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn subscription(&self) -> Option<&ClientSubscription> {
        self.subscription.as_ref()
    }

    /// AwaitingSubscription → Streaming. Returns false if the session was not
    /// waiting for a subscription; the first subscription wins.
    pub fn start_streaming(&mut self, subscription: ClientSubscription) -> bool {
        if self.state != SessionState::AwaitingSubscription {
            return false;
        }
        self.subscription = Some(subscription);
        self.state = SessionState::Streaming;
        true
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}

/// Counts live bridge sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active_count: Arc<AtomicU64>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session. The returned guard decrements the count on drop.
    pub fn track(&self) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every session has ended or `limit` elapses.
    /// Returns true if all sessions ended.
    pub async fn wait_idle(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while self.active_count() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        true
    }
}

/// Guard tied to one session's lifetime.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    id: SessionId,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(session_id = %self.id, "Session released");
    }
}
