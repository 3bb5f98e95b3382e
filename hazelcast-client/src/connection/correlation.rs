//! Correlation id allocation and the per-connection table of pending calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use hazelcast_core::{ClientMessage, HazelcastError, Result};
use tokio::sync::oneshot;

/// Outcome delivered to a pending call: the response message, or the error
/// that ended the call (connection closed, client shutting down).
pub type CallOutcome = Result<ClientMessage>;

/// Allocates correlation ids for one client.
///
/// Ids increase monotonically and are never handed out twice, so an id is
/// live for at most one call at a time.
#[derive(Debug)]
pub struct CorrelationIdGenerator {
    next: AtomicI64,
}

impl CorrelationIdGenerator {
    /// Creates a generator whose first id is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
        }
    }

    /// Returns the next unused correlation id.
    pub fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for CorrelationIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered call waiting for its response.
///
/// Obtained from [`CorrelationRegistry::resolve`]; whoever holds it is the
/// only party able to complete the call.
#[derive(Debug)]
pub struct PendingCall {
    correlation_id: i64,
    sender: oneshot::Sender<CallOutcome>,
}

impl PendingCall {
    /// Returns the correlation id this call was registered under.
    pub fn correlation_id(&self) -> i64 {
        self.correlation_id
    }

    /// Completes the call. Returns `false` if the caller already gave up.
    pub fn complete(self, outcome: CallOutcome) -> bool {
        self.sender.send(outcome).is_ok()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    pending: HashMap<i64, oneshot::Sender<CallOutcome>>,
    closed: bool,
}

/// Maps correlation ids to the calls awaiting a response on one connection.
///
/// Removal and completion happen under one lock acquisition, so a call is
/// observed by at most one resolver. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct CorrelationRegistry {
    state: Mutex<RegistryState>,
}

impl CorrelationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call under `correlation_id` and returns the receiving end
    /// of its completion slot.
    ///
    /// Fails if the id is already live or the registry has been drained.
    pub fn register(&self, correlation_id: i64) -> Result<oneshot::Receiver<CallOutcome>> {
        let mut state = self.lock();
        if state.closed {
            return Err(HazelcastError::Connection(
                "connection is closed".to_string(),
            ));
        }
        if state.pending.contains_key(&correlation_id) {
            return Err(HazelcastError::Protocol(format!(
                "correlation id {} is already in use",
                correlation_id
            )));
        }
        let (tx, rx) = oneshot::channel();
        state.pending.insert(correlation_id, tx);
        Ok(rx)
    }

    /// Removes and returns the call registered under `correlation_id`.
    pub fn resolve(&self, correlation_id: i64) -> Option<PendingCall> {
        self.lock()
            .pending
            .remove(&correlation_id)
            .map(|sender| PendingCall {
                correlation_id,
                sender,
            })
    }

    /// Forgets the call registered under `correlation_id`. A response that
    /// arrives later is dropped.
    pub fn remove(&self, correlation_id: i64) -> bool {
        self.lock().pending.remove(&correlation_id).is_some()
    }

    /// Closes the registry and returns every call still pending. Later
    /// registrations fail.
    pub fn drain(&self) -> Vec<PendingCall> {
        let mut state = self.lock();
        state.closed = true;
        state
            .pending
            .drain()
            .map(|(correlation_id, sender)| PendingCall {
                correlation_id,
                sender,
            })
            .collect()
    }

    /// Returns the number of pending calls.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns `true` if no call is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_generator_starts_at_one_and_increases() {
        let ids = CorrelationIdGenerator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
    }

    #[test]
    fn test_generator_unique_across_threads() {
        let ids = Arc::new(CorrelationIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..12_500).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate correlation id {}", id);
            }
        }
        assert_eq!(seen.len(), 100_000);
    }

    #[test]
    fn test_hundred_thousand_live_registrations() {
        let ids = CorrelationIdGenerator::new();
        let registry = CorrelationRegistry::new();
        let receivers: Vec<_> = (0..100_000)
            .map(|_| registry.register(ids.next_id()).unwrap())
            .collect();
        assert_eq!(registry.len(), 100_000);
        drop(receivers);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = CorrelationRegistry::new();
        let _rx = registry.register(7).unwrap();
        assert!(matches!(
            registry.register(7),
            Err(HazelcastError::Protocol(_))
        ));
    }

    #[test]
    fn test_resolve_is_at_most_once() {
        let registry = CorrelationRegistry::new();
        let _rx = registry.register(1).unwrap();
        assert!(registry.resolve(1).is_some());
        assert!(registry.resolve(1).is_none());
        assert!(!registry.remove(1));
    }

    #[test]
    fn test_concurrent_resolvers_observe_each_call_once() {
        let registry = Arc::new(CorrelationRegistry::new());
        let receivers: Vec<_> = (0..1_000).map(|id| registry.register(id).unwrap()).collect();
        let resolved = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let resolved = Arc::clone(&resolved);
                std::thread::spawn(move || {
                    for id in 0..1_000 {
                        if let Some(call) = registry.resolve(id) {
                            resolved.fetch_add(1, Ordering::SeqCst);
                            call.complete(Ok(ClientMessage::new()));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(resolved.load(Ordering::SeqCst), 1_000);
        assert!(registry.is_empty());
        for mut rx in receivers {
            assert!(rx.try_recv().unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_drain_hands_back_pending_and_closes() {
        let registry = CorrelationRegistry::new();
        let rx = registry.register(10).unwrap();
        let _rx2 = registry.register(11).unwrap();

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        for call in drained {
            call.complete(Err(HazelcastError::TargetDisconnected("closed".into())));
        }

        assert!(matches!(
            rx.await.unwrap(),
            Err(HazelcastError::TargetDisconnected(_))
        ));
        assert!(matches!(
            registry.register(12),
            Err(HazelcastError::Connection(_))
        ));
    }

    #[test]
    fn test_complete_after_receiver_dropped() {
        let registry = CorrelationRegistry::new();
        let rx = registry.register(3).unwrap();
        drop(rx);
        let call = registry.resolve(3).unwrap();
        assert_eq!(call.correlation_id(), 3);
        assert!(!call.complete(Ok(ClientMessage::new())));
    }
}
