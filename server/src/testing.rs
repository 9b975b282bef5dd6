//! Fake client connections for driving lobbies and sessions in tests.

use crate::player::{ConnectionId, PlayerConnection};
use std::time::Duration;
use tokio::sync::mpsc;
use trivia_lobby_protocol::Envelope;

/// The receiving end of a connection, standing in for a WebSocket client.
pub struct TestClient {
    conn: PlayerConnection,
    rx: mpsc::Receiver<String>,
}

impl TestClient {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (conn, rx) = PlayerConnection::channel(capacity);
        Self { conn, rx }
    }

    pub fn connection(&self) -> PlayerConnection {
        self.conn.clone()
    }

    pub fn id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// Next queued envelope, if any.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        let text = self.rx.try_recv().ok()?;
        Some(Envelope::from_text(&text).expect("server sent invalid envelope"))
    }

    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Envelope> {
        let text = tokio::time::timeout(timeout, self.rx.recv()).await.ok()??;
        Some(Envelope::from_text(&text).expect("server sent invalid envelope"))
    }

    /// Everything queued so far.
    pub fn drain(&mut self) -> Vec<Envelope> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
