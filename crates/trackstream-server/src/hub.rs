//! Connection hub: the map of live sessions and the broadcast fan-out.
//!
//! Each session registers a [`ClientHandle`] holding an unbounded outbound
//! channel and a shared count of bytes queued but not yet written to the
//! socket. The session's writer task decrements that count after every
//! frame it writes.
//!
//! Broadcasts go only to sessions that are open, have completed the
//! handshake, and have fewer than `max_buffered_bytes` pending. Anyone
//! else misses that message. Nothing is queued on their behalf, so a slow
//! consumer costs at most one ceiling's worth of memory and never stalls
//! the ticker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use trackstream_types::ConnectionId;

/// A frame queued for a session's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A text frame.
    Text(Utf8Bytes),
    /// Close the socket and stop writing.
    Close,
}

/// Hub-side view of one session.
#[derive(Debug)]
struct ClientHandle {
    tx: mpsc::UnboundedSender<Outbound>,
    pending_bytes: Arc<AtomicUsize>,
    ready: bool,
}

impl ClientHandle {
    fn enqueue(&self, text: Utf8Bytes) -> bool {
        let len = text.as_str().len();
        self.pending_bytes.fetch_add(len, Ordering::AcqRel);
        if self.tx.send(Outbound::Text(text)).is_err() {
            self.pending_bytes.fetch_sub(len, Ordering::AcqRel);
            return false;
        }
        true
    }
}

/// Session-side end of a registration: the outbound queue and its byte count.
#[derive(Debug)]
pub struct ClientChannel {
    /// The session's identity in the hub.
    pub id: ConnectionId,
    /// Frames to write, in order.
    pub rx: mpsc::UnboundedReceiver<Outbound>,
    /// Bytes queued but not yet written. Decrement after each write.
    pub pending_bytes: Arc<AtomicUsize>,
}

impl ClientChannel {
    /// Record that `len` bytes have been written to the socket.
    pub fn mark_written(&self, len: usize) {
        self.pending_bytes.fetch_sub(len, Ordering::AcqRel);
    }
}

/// Per-call delivery counts from [`ConnectionHub::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Sessions the message was queued for.
    pub delivered: usize,
    /// Ready sessions skipped because their buffer was over the ceiling.
    pub skipped_backpressure: usize,
    /// Sessions that have not completed the handshake.
    pub not_ready: usize,
    /// Sessions whose writer has already gone away.
    pub closed: usize,
}

/// Owns every live session's handle.
#[derive(Debug)]
pub struct ConnectionHub {
    clients: Mutex<HashMap<ConnectionId, ClientHandle>>,
    next_id: AtomicU64,
    max_buffered_bytes: usize,
}

impl ConnectionHub {
    /// Create an empty hub with the given per-client buffer ceiling.
    pub fn new(max_buffered_bytes: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_buffered_bytes,
        }
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<ConnectionId, ClientHandle>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new session in the `Connected` phase.
    pub fn register(&self) -> ClientChannel {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        let pending_bytes = Arc::new(AtomicUsize::new(0));
        self.clients().insert(
            id,
            ClientHandle {
                tx,
                pending_bytes: Arc::clone(&pending_bytes),
                ready: false,
            },
        );
        ClientChannel {
            id,
            rx,
            pending_bytes,
        }
    }

    /// Admit a session to broadcasts. Returns `false` if it is not registered.
    pub fn mark_ready(&self, id: ConnectionId) -> bool {
        let mut clients = self.clients();
        let Some(client) = clients.get_mut(&id) else {
            return false;
        };
        client.ready = true;
        true
    }

    /// Drop a session's state. Returns `false` if it was already gone.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.clients().remove(&id).is_some()
    }

    /// Queue a direct reply. Replies ignore the buffer ceiling.
    pub fn send_to(&self, id: ConnectionId, text: impl Into<Utf8Bytes>) -> bool {
        self.clients()
            .get(&id)
            .is_some_and(|client| client.enqueue(text.into()))
    }

    /// Ask a session's writer to close the socket.
    pub fn close(&self, id: ConnectionId) -> bool {
        self.clients()
            .get(&id)
            .is_some_and(|client| client.tx.send(Outbound::Close).is_ok())
    }

    /// Queue `payload` for every eligible session.
    pub fn broadcast(&self, payload: impl Into<Utf8Bytes>) -> BroadcastReport {
        let payload = payload.into();
        let mut report = BroadcastReport::default();
        for client in self.clients().values() {
            if !client.ready {
                report.not_ready = report.not_ready.saturating_add(1);
            } else if client.tx.is_closed() {
                report.closed = report.closed.saturating_add(1);
            } else if client.pending_bytes.load(Ordering::Acquire) >= self.max_buffered_bytes {
                report.skipped_backpressure = report.skipped_backpressure.saturating_add(1);
            } else if client.enqueue(payload.clone()) {
                report.delivered = report.delivered.saturating_add(1);
            } else {
                report.closed = report.closed.saturating_add(1);
            }
        }
        report
    }

    /// Registered sessions.
    pub fn connection_count(&self) -> usize {
        self.clients().len()
    }

    /// Sessions that completed the handshake.
    pub fn ready_count(&self) -> usize {
        self.clients().values().filter(|c| c.ready).count()
    }

    /// Bytes currently pending for `id`, if registered.
    pub fn pending_bytes(&self, id: ConnectionId) -> Option<usize> {
        self.clients()
            .get(&id)
            .map(|c| c.pending_bytes.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(channel: &mut ClientChannel) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(frame) = channel.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn only_ready_clients_receive_broadcasts() {
        let hub = ConnectionHub::new(1024);
        let mut pending = hub.register();
        let mut ready = hub.register();
        assert!(hub.mark_ready(ready.id));

        let report = hub.broadcast(String::from("page"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.not_ready, 1);
        assert!(drain(&mut pending).is_empty());
        assert_eq!(
            drain(&mut ready),
            vec![Outbound::Text(Utf8Bytes::from(String::from("page")))]
        );
    }

    #[test]
    #[allow(clippy::arithmetic_side_effects)]
    fn clients_over_the_ceiling_are_skipped() {
        let hub = ConnectionHub::new(10);
        let slow = hub.register();
        let mut fast = hub.register();
        hub.mark_ready(slow.id);
        hub.mark_ready(fast.id);

        // `slow` never writes; `fast` writes everything it receives.
        let mut fast_frames = 0;
        let mut skipped = 0;
        for _ in 0..5 {
            skipped += hub.broadcast(String::from("123456")).skipped_backpressure;
            for frame in drain(&mut fast) {
                if let Outbound::Text(text) = frame {
                    fast.mark_written(text.as_str().len());
                    fast_frames += 1;
                }
            }
        }

        // 0 and 6 pending are under the ceiling, 12 is not.
        assert_eq!(hub.pending_bytes(slow.id), Some(12));
        assert_eq!(skipped, 3);
        assert_eq!(fast_frames, 5);
        assert_eq!(hub.pending_bytes(fast.id), Some(0));
    }

    #[test]
    fn slow_client_misses_every_message_while_over_ceiling() {
        let hub = ConnectionHub::new(100);
        let slow = hub.register();
        let fast = hub.register();
        hub.mark_ready(slow.id);
        hub.mark_ready(fast.id);
        slow.pending_bytes.store(500, Ordering::Release);

        for _ in 0..3 {
            let report = hub.broadcast(String::from("tick"));
            assert_eq!(report.delivered, 1);
            assert_eq!(report.skipped_backpressure, 1);
        }
        assert_eq!(hub.pending_bytes(slow.id), Some(500));
        assert_eq!(hub.pending_bytes(fast.id), Some(12));
    }

    #[test]
    fn replies_bypass_the_ceiling() {
        let hub = ConnectionHub::new(1);
        let mut client = hub.register();
        client.pending_bytes.store(50, Ordering::Release);
        assert!(hub.send_to(client.id, String::from("hello")));
        assert_eq!(drain(&mut client).len(), 1);
    }

    #[test]
    fn removed_and_closed_clients_are_not_delivered_to() {
        let hub = ConnectionHub::new(1024);
        let gone = hub.register();
        let dropped = hub.register();
        hub.mark_ready(gone.id);
        hub.mark_ready(dropped.id);

        assert!(hub.remove(gone.id));
        assert!(!hub.remove(gone.id));
        let dropped_id = dropped.id;
        drop(dropped);

        let report = hub.broadcast(String::from("x"));
        assert_eq!(report.delivered, 0);
        assert_eq!(report.closed, 1);
        assert!(!hub.send_to(gone.id, String::from("x")));
        assert!(!hub.mark_ready(gone.id));
        assert!(hub.remove(dropped_id));
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn close_queues_a_close_frame() {
        let hub = ConnectionHub::new(1024);
        let mut client = hub.register();
        assert!(hub.close(client.id));
        assert_eq!(drain(&mut client), vec![Outbound::Close]);
    }

    #[test]
    fn counts_track_registration_and_handshake() {
        let hub = ConnectionHub::new(1024);
        let a = hub.register();
        let b = hub.register();
        assert_ne!(a.id, b.id);
        assert_eq!(hub.connection_count(), 2);
        assert_eq!(hub.ready_count(), 0);
        hub.mark_ready(a.id);
        assert_eq!(hub.ready_count(), 1);
    }
}
