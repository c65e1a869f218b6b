use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::MoveStreamInbound,
    services::turn_service,
    state::{SharedState, StreamId},
};

/// Failures that end a move stream. Only the affected stream is torn down.
#[derive(Debug, Error)]
enum StreamError {
    /// The socket reported an error while reading.
    #[error("websocket receive failed")]
    Receive(#[source] axum::Error),
    /// A text frame was not a valid move stream message.
    #[error("malformed frame")]
    Malformed(#[source] serde_json::Error),
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle of one move stream: attach, read loop, detach.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps broadcasts flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let stream_id = Uuid::new_v4();
    state.sessions().attach(stream_id, outbound_tx.clone()).await;

    match run_stream(&state, stream_id, &mut receiver, &outbound_tx).await {
        Ok(()) => info!(%stream_id, "move stream closed"),
        Err(err) => warn!(%stream_id, error = %err, "move stream terminated"),
    }

    state.sessions().detach(stream_id).await;
    finalize(writer_task, outbound_tx).await;
}

/// Read frames until the peer closes or a transport error occurs.
async fn run_stream<S>(
    state: &SharedState,
    stream_id: StreamId,
    receiver: &mut S,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), StreamError>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(frame) = receiver.next().await {
        match frame.map_err(StreamError::Receive)? {
            Message::Text(text) => {
                let inbound =
                    MoveStreamInbound::from_json_str(&text).map_err(StreamError::Malformed)?;
                dispatch(state, stream_id, inbound).await;
            }
            Message::Ping(payload) => {
                outbound_tx
                    .send(Message::Pong(payload))
                    .map_err(|_| StreamError::ConnectionClosed)?;
            }
            Message::Close(frame) => {
                let _ = outbound_tx.send(Message::Close(frame));
                return Ok(());
            }
            Message::Binary(_) | Message::Pong(_) => {}
        }

        if outbound_tx.is_closed() {
            return Err(StreamError::ConnectionClosed);
        }
    }

    Ok(())
}

async fn dispatch(state: &SharedState, stream_id: StreamId, inbound: MoveStreamInbound) {
    match inbound {
        MoveStreamInbound::Fire(request) => {
            info!(
                %stream_id,
                game_id = %request.game_id,
                firer = %request.firer,
                x = request.x,
                y = request.y,
                "fire received"
            );
            if let Err(err) = turn_service::handle_fire(state, request).await {
                warn!(%stream_id, error = %err, "dropping fire event");
            }
        }
        MoveStreamInbound::Unknown => {
            debug!(%stream_id, "ignoring message of unknown type");
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::stream;
    use serde_json::json;

    use super::*;
    use crate::{
        dao::game_store::{GameStore, memory::MemoryGameStore},
        state::AppState,
    };

    fn text(value: serde_json::Value) -> Result<Message, axum::Error> {
        Ok(Message::Text(value.to_string().into()))
    }

    async fn attached(
        state: &SharedState,
    ) -> (
        StreamId,
        mpsc::UnboundedSender<Message>,
        mpsc::UnboundedReceiver<Message>,
    ) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.sessions().attach(id, tx.clone()).await;
        (id, tx, rx)
    }

    #[tokio::test]
    async fn fire_frames_are_resolved_and_echoed() {
        let store = MemoryGameStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let game = store.create_game(a, b).await.unwrap();
        let state = AppState::new(Arc::new(store));
        let (id, tx, mut rx) = attached(&state).await;

        let fire = json!({
            "type": "FIRE",
            "game_id": game.id,
            "firer": a,
            "target_player": b,
            "x": 2,
            "y": 3,
        });
        let mut frames = stream::iter(vec![
            text(json!({"type": "hello"})),
            text(fire.clone()),
            text(fire),
            Ok(Message::Close(None)),
        ]);

        run_stream(&state, id, &mut frames, &tx).await.unwrap();

        let mut outcomes = Vec::new();
        while let Ok(Message::Text(payload)) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
            outcomes.push(value["type"].as_str().unwrap().to_owned());
        }
        assert_eq!(outcomes, vec!["MISS", "DUPLICATE"]);
    }

    #[tokio::test]
    async fn rejected_fire_keeps_stream_open() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));
        let (id, tx, mut rx) = attached(&state).await;

        let mut frames = stream::iter(vec![
            text(json!({
                "type": "FIRE",
                "game_id": Uuid::new_v4(),
                "firer": Uuid::new_v4(),
                "target_player": Uuid::new_v4(),
                "x": 0,
                "y": 0,
            })),
            Ok(Message::Ping(vec![1u8, 2].into())),
        ]);

        run_stream(&state, id, &mut frames, &tx).await.unwrap();
        assert!(matches!(rx.try_recv(), Ok(Message::Pong(_))));
    }

    #[tokio::test]
    async fn malformed_frame_ends_stream() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));
        let (id, tx, _rx) = attached(&state).await;

        let mut frames = stream::iter(vec![
            Ok(Message::Text("{not json".into())),
            text(json!({"type": "hello"})),
        ]);

        let err = run_stream(&state, id, &mut frames, &tx).await.unwrap_err();
        assert!(matches!(err, StreamError::Malformed(_)));
    }

    #[tokio::test]
    async fn receive_error_ends_stream() {
        let state = AppState::new(Arc::new(MemoryGameStore::new()));
        let (id, tx, _rx) = attached(&state).await;

        let mut frames = stream::iter(vec![Err::<Message, _>(axum::Error::new(std::io::Error::other(
            "reset by peer",
        )))]);

        let err = run_stream(&state, id, &mut frames, &tx).await.unwrap_err();
        assert!(matches!(err, StreamError::Receive(_)));
    }
}
