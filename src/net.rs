// src/net.rs
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::accept_async;
use tungstenite::Message;

use crate::physics::PhysicsWorld;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::SharedGameState;
use crate::storage::KeyValueStore;

pub async fn start_websocket_server<S>(
    listener: TcpListener,
    state: Arc<Mutex<SharedGameState<S>>>,
    physics: Arc<Mutex<PhysicsWorld>>,
) where
    S: KeyValueStore + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "websocket listening");
    }

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };

        tokio::spawn(handle_connection(
            raw,
            peer,
            Arc::clone(&state),
            Arc::clone(&physics),
        ));
    }
}

async fn handle_connection<S>(
    raw: TcpStream,
    peer: SocketAddr,
    state: Arc<Mutex<SharedGameState<S>>>,
    physics: Arc<Mutex<PhysicsWorld>>,
) where
    S: KeyValueStore + Send + 'static,
{
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(%peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Player + car body
    //    (lock order matches the tick loop: physics, then game)
    // -------------------------------
    let player_id = {
        let mut phys = physics.lock().await;
        let mut game = state.lock().await;
        let id = game.add_player(tx, &mut phys);

        let welcome = ServerMessage::Welcome {
            player_id: id.clone(),
            tuning: game.tuning.clone(),
        };
        game.send_to(&id, &welcome);
        id
    };

    tracing::info!(player_id = %player_id, %peer, "player connected");

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(player_id = %player_id, error = %e, "read failed");
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let parsed = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(player_id = %player_id, error = %e, "ignoring malformed message");
                continue;
            }
        };

        let mut game = state.lock().await;
        match parsed {
            ClientMessage::Input(controls) => game.update_controls(&player_id, controls),
            ClientMessage::Ping => game.send_to(&player_id, &ServerMessage::Pong),
            ClientMessage::Tuning(tuning) => {
                if let Err(e) = game.replace_tuning(tuning) {
                    tracing::warn!(player_id = %player_id, error = %e, "tuning rejected");
                    game.send_to(&player_id, &ServerMessage::TuningRejected { reason: e.to_string() });
                }
            }
        }
    }

    tracing::info!(player_id = %player_id, "player disconnected");
    let mut phys = physics.lock().await;
    let mut game = state.lock().await;
    game.remove_player(&player_id, &mut phys);
}
