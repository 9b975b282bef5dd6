//! Join protocol for one live connection.
//!
//! Each connection owns a `JoinSession` and feeds it inbound text frames one
//! at a time. Nothing here is shared between connections except the registry
//! and the lobbies it hands out.
//!
//! Per message:
//! 1. Parse a bare code or `{"code", "nickname"}`.
//! 2. Resolve the lobby. Unknown codes get an `err` envelope and the
//!    connection stays usable.
//! 3. Attach this connection to the player (new or returning).
//! 4. Confirm with `joinedLobby`, then broadcast `playersJoined` to the lobby.

use crate::error::LobbyError;
use crate::lobby::Lobby;
use crate::player::{ConnectionId, PlayerConnection};
use crate::registry::LobbyRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;
use trivia_lobby_protocol::{Envelope, JoinRequest};

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined {
        code: String,
        nickname: String,
        rejoined: bool,
    },
    /// An `err` envelope was sent back with this text.
    Rejected(String),
}

struct Membership {
    lobby: Arc<Lobby>,
    nickname: String,
}

pub struct JoinSession {
    registry: Arc<LobbyRegistry>,
    conn: PlayerConnection,
    membership: Option<Membership>,
}

impl JoinSession {
    pub fn new(registry: Arc<LobbyRegistry>, conn: PlayerConnection) -> Self {
        Self {
            registry,
            conn,
            membership: None,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// `(code, nickname)` this connection is currently attached as.
    pub fn membership(&self) -> Option<(&str, &str)> {
        self.membership
            .as_ref()
            .map(|m| (m.lobby.code(), m.nickname.as_str()))
    }

    pub async fn handle_text(&mut self, text: &str) -> JoinOutcome {
        match JoinRequest::parse(text) {
            Ok(request) => self.join(request).await,
            Err(e) => self.reject(e.to_string()),
        }
    }

    pub async fn join(&mut self, request: JoinRequest) -> JoinOutcome {
        let Some(lobby) = self.registry.lookup(&request.code) else {
            tracing::info!(code = %request.code, "Join for unknown lobby");
            return self.reject(LobbyError::LobbyNotFound(request.code).to_string());
        };

        // A bare code from a connection already in this lobby keeps its name.
        let nickname = request.nickname.or_else(|| {
            self.membership
                .as_ref()
                .filter(|m| Arc::ptr_eq(&m.lobby, &lobby))
                .map(|m| m.nickname.clone())
        });

        // Also queues `joinedLobby` on this connection.
        let joined = match lobby.join(nickname.as_deref(), self.conn.clone()).await {
            Ok(joined) => joined,
            Err(e) => return self.reject(e.to_string()),
        };
        let nickname = joined.player.nickname;

        if let Some(previous) = self.membership.take() {
            let moved = !Arc::ptr_eq(&previous.lobby, &lobby) || previous.nickname != nickname;
            if moved {
                previous.lobby.detach(&previous.nickname, self.conn.id()).await;
            }
        }
        self.membership = Some(Membership {
            lobby: Arc::clone(&lobby),
            nickname: nickname.clone(),
        });

        let (roster, report) = lobby.broadcast_roster().await;
        tracing::info!(
            lobby = %lobby.code(),
            player = %nickname,
            rejoined = joined.rejoined,
            players = roster.len(),
            delivered = report.delivered,
            "Player joined"
        );

        JoinOutcome::Joined {
            code: lobby.code().to_string(),
            nickname,
            rejoined: joined.rejoined,
        }
    }

    /// Detach from the current lobby. The player stays on the roster.
    pub async fn close(&mut self) {
        if let Some(membership) = self.membership.take() {
            if membership
                .lobby
                .detach(&membership.nickname, self.conn.id())
                .await
            {
                tracing::info!(
                    lobby = %membership.lobby.code(),
                    player = %membership.nickname,
                    "Player disconnected"
                );
            }
        }
    }

    /// Handle inbound frames until the transport drops its sender.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<String>) {
        while let Some(text) = inbound.recv().await {
            self.handle_text(&text).await;
        }
        self.close().await;
    }

    fn reject(&self, err: String) -> JoinOutcome {
        self.send(&Envelope::failure(err.clone()));
        JoinOutcome::Rejected(err)
    }

    fn send(&self, envelope: &Envelope) {
        let Ok(text) = envelope.to_text() else {
            return;
        };
        if let Err(e) = self.conn.send(text) {
            tracing::debug!(connection = ?self.conn.id(), kind = envelope.kind(), "Couldn't reply: {}", e);
        }
    }
}
