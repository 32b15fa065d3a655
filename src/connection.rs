use std::sync::atomic::{AtomicBool, Ordering};

use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use warp::ws::Message;

use crate::metrics::SFU_SIGNALING_FRAMES_DROPPED_TOTAL;
use crate::protocol::ServerMessage;

/// The buffered send half of one client's signaling channel.
///
/// Frames are enqueued onto a bounded queue and drained by a dedicated writer
/// task, so callers never block on a slow client. Overflow drops the frame.
/// The receive half stays with the per-connection read loop in `sfu_service`.
pub struct Connection {
    outbound: mpsc::Sender<Message>,
    closed: AtomicBool,
}

impl Connection {
    /// Creates the queue pair. The returned receiver is handed to
    /// [`Connection::spawn_writer`] together with the WebSocket sink.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (outbound, rx) = mpsc::channel(capacity);
        (
            Connection {
                outbound,
                closed: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Spawns the writer task draining the queue into the sink in FIFO order.
    ///
    /// The task ends after forwarding a close frame, when every queue sender
    /// is gone, or when the sink errors; it then closes the sink.
    pub fn spawn_writer<S>(mut queue: mpsc::Receiver<Message>, mut sink: S) -> JoinHandle<()>
    where
        S: Sink<Message> + Unpin + Send + 'static,
        S::Error: std::fmt::Display,
    {
        tokio::spawn(async move {
            while let Some(msg) = queue.recv().await {
                let is_close = msg.is_close();
                if let Err(e) = sink.send(msg).await {
                    debug!(error = %e, "Signaling sink closed while writing");
                    break;
                }
                if is_close {
                    break;
                }
            }
            let _ = sink.close().await;
        })
    }

    /// Serializes and enqueues one frame.
    pub fn send(&self, msg: &ServerMessage) {
        self.send_text(msg.to_json());
    }

    /// Enqueues an already-serialized frame (broadcasts serialize once).
    /// Non-blocking; drops the frame when the queue is full.
    pub fn send_text(&self, frame: String) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        match self.outbound.try_send(Message::text(frame)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                SFU_SIGNALING_FRAMES_DROPPED_TOTAL.inc();
                warn!("Outbound signaling queue full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Idempotent close: stops further sends and asks the writer to close the
    /// socket.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Best effort: a full queue means the writer is going away with the
        // connection anyway.
        let _ = self.outbound.try_send(Message::close());
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_send_preserves_fifo_order() {
        let (conn, mut rx) = Connection::new(8);
        conn.send_text("one".into());
        conn.send_text("two".into());
        conn.send_text("three".into());

        assert_eq!(rx.recv().await.unwrap().to_str().unwrap(), "one");
        assert_eq!(rx.recv().await.unwrap().to_str().unwrap(), "two");
        assert_eq!(rx.recv().await.unwrap().to_str().unwrap(), "three");
    }

    #[tokio::test]
    async fn test_overflow_drops_frame() {
        let (conn, mut rx) = Connection::new(2);
        conn.send_text("one".into());
        conn.send_text("two".into());
        conn.send_text("dropped".into());

        assert_eq!(rx.recv().await.unwrap().to_str().unwrap(), "one");
        assert_eq!(rx.recv().await.unwrap().to_str().unwrap(), "two");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_stops_sends() {
        let (conn, mut rx) = Connection::new(8);
        conn.close();
        conn.close();
        conn.send_text("late".into());

        let first = rx.recv().await.unwrap();
        assert!(first.is_close());
        assert!(rx.try_recv().is_err());
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_writer_drains_queue_into_sink() {
        let (conn, rx) = Connection::new(8);
        let (sink, mut out) = futures::channel::mpsc::unbounded::<Message>();

        let writer = Connection::spawn_writer(rx, sink);
        conn.send_text("a".into());
        conn.send_text("b".into());
        drop(conn); // all senders gone -> writer ends

        writer.await.unwrap();
        assert_eq!(out.next().await.unwrap().to_str().unwrap(), "a");
        assert_eq!(out.next().await.unwrap().to_str().unwrap(), "b");
        assert!(out.next().await.is_none());
    }

    #[tokio::test]
    async fn test_writer_stops_after_close_frame() {
        let (conn, rx) = Connection::new(8);
        let (sink, mut out) = futures::channel::mpsc::unbounded::<Message>();

        let writer = Connection::spawn_writer(rx, sink);
        conn.send_text("before".into());
        conn.close();

        writer.await.unwrap();
        assert_eq!(out.next().await.unwrap().to_str().unwrap(), "before");
        assert!(out.next().await.unwrap().is_close());
        assert!(out.next().await.is_none());
    }
}
