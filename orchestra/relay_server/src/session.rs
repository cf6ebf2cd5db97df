use axum::extract::ws::Message;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;
use uuid::Uuid;

/// Relayed frames buffered per session before new ones are dropped
pub const SESSION_QUEUE_CAPACITY: usize = 64;

/// Per-connection state owned by the registry
struct ClientSession {
    outbound: mpsc::Sender<Message>,
    close: Option<oneshot::Sender<()>>,
    last_heartbeat: Instant,
    subscribed: bool,
}

/// What the socket task keeps for its own session
pub struct SessionHandle {
    pub id: String,
    pub outbound: mpsc::Receiver<Message>,
    pub close: oneshot::Receiver<()>,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, ClientSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, now: Instant) -> SessionHandle {
        let id = Uuid::new_v4().to_string();
        let (outbound_tx, outbound_rx) = mpsc::channel(SESSION_QUEUE_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();

        self.sessions.insert(
            id.clone(),
            ClientSession {
                outbound: outbound_tx,
                close: Some(close_tx),
                last_heartbeat: now,
                subscribed: false,
            },
        );

        SessionHandle {
            id,
            outbound: outbound_rx,
            close: close_rx,
        }
    }

    /// Refresh liveness. Returns false for unknown sessions.
    pub fn touch(&mut self, id: &str, now: Instant) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.last_heartbeat = now;
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&mut self, id: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.subscribed = true;
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, id: &str) -> bool {
        self.sessions.get(id).is_some_and(|session| session.subscribed)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop every session silent for longer than `timeout` and signal its
    /// socket task to close. Returns the evicted ids.
    pub fn evict_stale(&mut self, now: Instant, timeout: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, session)| now.saturating_duration_since(session.last_heartbeat) > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            if let Some(mut session) = self.sessions.remove(id) {
                if let Some(close) = session.close.take() {
                    let _ = close.send(());
                }
            }
        }

        stale
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Queue `text` for every subscribed session except `sender`. A session
    /// whose queue is full misses this frame. Returns the delivered count.
    pub fn broadcast_to_subscribers(&self, sender: &str, text: &str) -> usize {
        self.sessions
            .iter()
            .filter(|(id, session)| session.subscribed && id.as_str() != sender)
            .filter(|(id, session)| match session.outbound.try_send(Message::Text(text.to_string())) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(client_id = %id, "Outbound queue full, dropping frame");
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_unique_ids() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        let first = registry.register(now);
        let second = registry.register(now);

        assert_ne!(first.id, second.id);
        assert!(Uuid::parse_str(&first.id).is_ok());
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_evict_stale_sessions() {
        let mut registry = SessionRegistry::new();
        let start = Instant::now();
        let timeout = Duration::from_secs(30);

        let mut silent = registry.register(start);
        let chatty = registry.register(start);

        assert!(registry.touch(&chatty.id, start + Duration::from_secs(20)));

        let evicted = registry.evict_stale(start + Duration::from_secs(31), timeout);
        assert_eq!(evicted, vec![silent.id.clone()]);
        assert_eq!(registry.count(), 1);
        assert_eq!(silent.close.try_recv(), Ok(()));

        // exactly at the limit is still alive
        let evicted = registry.evict_stale(start + Duration::from_secs(50), timeout);
        assert!(evicted.is_empty());
        assert!(!registry.touch(&silent.id, start));
    }

    #[test]
    fn test_broadcast_skips_sender_and_unsubscribed() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        let sender = registry.register(now);
        let mut consumer = registry.register(now);
        let mut idle = registry.register(now);

        registry.subscribe(&sender.id);
        registry.subscribe(&consumer.id);
        assert!(registry.is_subscribed(&consumer.id));
        assert!(!registry.is_subscribed(&idle.id));

        let delivered = registry.broadcast_to_subscribers(&sender.id, "90,90,90,0");
        assert_eq!(delivered, 1);

        match consumer.outbound.try_recv() {
            Ok(Message::Text(text)) => assert_eq!(text, "90,90,90,0"),
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(idle.outbound.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_drops_when_queue_full() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        let sender = registry.register(now);
        let mut slow = registry.register(now);
        registry.subscribe(&slow.id);

        for _ in 0..SESSION_QUEUE_CAPACITY {
            assert_eq!(registry.broadcast_to_subscribers(&sender.id, "90,90,90,0"), 1);
        }
        assert_eq!(registry.broadcast_to_subscribers(&sender.id, "0,0,30,180"), 0);

        // draining one slot lets the next frame through
        assert!(slow.outbound.try_recv().is_ok());
        assert_eq!(registry.broadcast_to_subscribers(&sender.id, "0,0,30,180"), 1);
        assert!(registry.touch(&slow.id, now));
    }

    #[test]
    fn test_remove_unknown_session() {
        let mut registry = SessionRegistry::new();
        let handle = registry.register(Instant::now());

        assert!(registry.remove(&handle.id));
        assert!(!registry.remove(&handle.id));
        assert!(!registry.subscribe(&handle.id));
        assert_eq!(registry.count(), 0);
    }
}
