//!
//! Session manager
//! ---------------
//! Owns the single authoritative `Session` and reconciles the identity
//! provider's auth-event stream with profile lookups into it.
//!
//! Responsibilities:
//! - Replay-last subscription: every observer receives the current session
//!   immediately, then every subsequent publication, in subscription order.
//! - Monotonic publications: `Unknown` is never re-published once replaced.
//! - Last-identity-wins: a lookup completing after a newer auth event is
//!   discarded; only the result matching the most recent event is published.
//! - Degraded lookups: store failures and key-mismatched records publish
//!   `Authenticated { profile: None }` and go to the tracing channel, never to
//!   the subscriber as an error.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::identity::{AuthEvent, Identity};
use crate::profile::ProfileStore;
use crate::session::Session;

pub type SubscriptionId = u64;

/// Synchronous session observer. Called with the state lock held, so an
/// observer must not call back into the manager.
type Observer = Box<dyn Fn(&Session) + Send + Sync>;

struct ManagerState {
    current: Session,
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: SubscriptionId,
}

struct Inner {
    store: Arc<dyn ProfileStore>,
    state: Mutex<ManagerState>,
    /// Bumped on every auth event; lookup results carry the epoch they were
    /// issued under and are dropped if it is no longer current.
    epoch: AtomicU64,
    started: AtomicBool,
    watch_tx: watch::Sender<Session>,
}

/// Merges identity events with profile lookups into one `Session` value.
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        let (watch_tx, _) = watch::channel(Session::Unknown);
        Self {
            inner: Arc::new(Inner {
                store,
                state: Mutex::new(ManagerState {
                    current: Session::Unknown,
                    observers: Vec::new(),
                    next_id: 0,
                }),
                epoch: AtomicU64::new(0),
                started: AtomicBool::new(false),
                watch_tx,
            }),
        }
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Session {
        self.inner.state.lock().current.clone()
    }

    /// Async mirror of the session for callers that need to await the next
    /// publication (the shell's pending-guard wait).
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.inner.watch_tx.subscribe()
    }

    /// Register an observer. It is called with the current session
    /// immediately, then with every subsequent publication, in subscription
    /// order, until unsubscribed.
    pub fn subscribe(&self, observer: impl Fn(&Session) + Send + Sync + 'static) -> SubscriptionId {
        let mut state = self.inner.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        observer(&state.current);
        state.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.state.lock().observers.retain(|(sub, _)| *sub != id);
    }

    /// Begin consuming the identity provider's event stream. Idempotent:
    /// a second call is a no-op.
    pub fn start(&self, events: broadcast::Receiver<AuthEvent>) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!(target: "pursuva::session", "start() called twice; ignoring");
            return;
        }
        let inner = self.inner.clone();
        tokio::spawn(run_event_loop(inner, events));
    }
}

async fn run_event_loop(inner: Arc<Inner>, mut events: broadcast::Receiver<AuthEvent>) {
    info!(target: "pursuva::session", "session manager listening for auth events");
    loop {
        match events.recv().await {
            Ok(AuthEvent::SignedOut) => {
                inner.epoch.fetch_add(1, Ordering::SeqCst);
                let mut state = inner.state.lock();
                if !matches!(state.current, Session::Anonymous) {
                    publish(&inner, &mut state, Session::Anonymous);
                }
            }
            Ok(AuthEvent::SignedIn(identity)) => {
                let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                // The lookup runs as its own task so a newer event can
                // supersede it while it is still in flight.
                tokio::spawn(resolve_profile(inner.clone(), identity, epoch));
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Each event carries the full successor state, and lag only
                // drops the oldest entries while newer ones stay buffered, so
                // the next recv delivers an event that re-converges the
                // session. Nothing authenticated can go stale past this loop
                // iteration.
                warn!(
                    target: "pursuva::session",
                    "auth event stream lagged; skipped {} events", skipped
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(target: "pursuva::session", "auth event stream closed");
                return;
            }
        }
    }
}

/// Look up the profile for a signed-in identity and publish the merged
/// session, unless a newer auth event superseded this lookup.
async fn resolve_profile(inner: Arc<Inner>, identity: Identity, epoch: u64) {
    let profile = match inner.store.get(&identity.uid).await {
        Ok(Some(record)) if record.uid == identity.uid => Some(record),
        Ok(Some(record)) => {
            // Fatal to this lookup only: drop the record, keep the session
            error!(
                target: "pursuva::session",
                "profile key mismatch: identity uid='{}' record uid='{}'",
                identity.uid, record.uid
            );
            None
        }
        Ok(None) => {
            debug!(target: "pursuva::session", "no profile for uid='{}'", identity.uid);
            None
        }
        Err(e) => {
            // Degrade to signed-in-without-profile rather than blocking
            warn!(
                target: "pursuva::session",
                "profile lookup failed for uid='{}': {}", identity.uid, e
            );
            None
        }
    };
    let mut state = inner.state.lock();
    if inner.epoch.load(Ordering::SeqCst) != epoch {
        debug!(
            target: "pursuva::session",
            "discarding stale lookup for uid='{}'", identity.uid
        );
        return;
    }
    publish(&inner, &mut state, Session::Authenticated { identity, profile });
}

/// Set the current session and notify, in order: the watch mirror, then every
/// observer in subscription order. Caller holds the state lock, so
/// publications are strictly serialized.
fn publish(inner: &Inner, state: &mut ManagerState, session: Session) {
    state.current = session.clone();
    let _ = inner.watch_tx.send(session);
    for (_, observer) in &state.observers {
        observer(&state.current);
    }
}
