//! Registry of live move streams.
//!
//! Every attached WebSocket is represented by the sending half of its writer channel.
//! Broadcasts go to every attached stream, in attachment order.

use axum::extract::ws::Message;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier handed to each attached stream.
pub type StreamId = Uuid;

/// Sending half of a stream's writer channel.
pub type StreamSender = mpsc::UnboundedSender<Message>;

/// Insertion-ordered set of attached streams behind a single async lock.
#[derive(Default)]
pub struct SessionRegistry {
    streams: Mutex<IndexMap<StreamId, StreamSender>>,
}

impl SessionRegistry {
    /// Registry with no attached streams.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stream. Attaching an id twice keeps the first sender and its position.
    pub async fn attach(&self, id: StreamId, sender: StreamSender) {
        let mut streams = self.streams.lock().await;
        if streams.contains_key(&id) {
            debug!(stream_id = %id, "stream already attached");
            return;
        }
        streams.insert(id, sender);
        info!(stream_id = %id, attached = streams.len(), "stream attached");
    }

    /// Remove a stream; returns whether it was attached.
    pub async fn detach(&self, id: StreamId) -> bool {
        let mut streams = self.streams.lock().await;
        let removed = streams.shift_remove(&id).is_some();
        if removed {
            info!(stream_id = %id, attached = streams.len(), "stream detached");
        }
        removed
    }

    /// Number of attached streams.
    pub async fn len(&self) -> usize {
        self.streams.lock().await.len()
    }

    /// Whether no stream is attached.
    pub async fn is_empty(&self) -> bool {
        self.streams.lock().await.is_empty()
    }

    /// Serialize `event` once and queue it on every attached stream.
    ///
    /// Streams whose writer has gone away are detached. Returns how many streams
    /// accepted the event.
    pub async fn broadcast<T>(&self, event: &T) -> usize
    where
        T: ?Sized + Serialize,
    {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize broadcast event");
                return 0;
            }
        };

        let targets: Vec<(StreamId, StreamSender)> = {
            let streams = self.streams.lock().await;
            streams
                .iter()
                .map(|(id, sender)| (*id, sender.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, sender) in targets {
            if sender.send(Message::Text(payload.clone().into())).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        for id in dead {
            warn!(stream_id = %id, "stream writer closed during broadcast");
            self.detach(id).await;
        }

        delivered
    }
}
