//! Players and their outbound connections.
//!
//! A player is identified by nickname within its lobby. Once joined it is
//! paired with one outbound connection; that link can go stale (client
//! disconnected) and be replaced when the same nickname joins again.

use crate::error::{DeliveryError, LobbyError};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use trivia_lobby_protocol::PlayerInfo;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

/// Sending half of a client connection.
///
/// Carries serialized envelopes to the transport task that owns the socket.
#[derive(Debug, Clone)]
pub struct PlayerConnection {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
}

impl PlayerConnection {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            id: ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            tx,
        }
    }

    /// Create a connection together with the receiver the transport drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message without waiting.
    pub fn send(&self, text: String) -> Result<(), DeliveryError> {
        self.tx.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Where a player's link currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unattached,
    Attached,
    Detached,
}

#[derive(Debug)]
enum Link {
    Unattached,
    Attached(PlayerConnection),
    Detached,
}

#[derive(Debug)]
pub struct Player {
    nickname: String,
    points: u32,
    link: Link,
}

impl Player {
    pub fn new(nickname: &str) -> Result<Self, LobbyError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(LobbyError::InvalidNickname);
        }
        Ok(Self {
            nickname: nickname.to_string(),
            points: 0,
            link: Link::Unattached,
        })
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn state(&self) -> LinkState {
        match self.link {
            Link::Unattached => LinkState::Unattached,
            Link::Attached(_) => LinkState::Attached,
            Link::Detached => LinkState::Detached,
        }
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        match &self.link {
            Link::Attached(conn) => Some(conn.id()),
            _ => None,
        }
    }

    /// Pair this player with a connection, replacing any previous one.
    /// Returns the id of the replaced connection.
    pub fn attach(&mut self, conn: PlayerConnection) -> Option<ConnectionId> {
        let previous = self.connection_id();
        self.link = Link::Attached(conn);
        previous
    }

    /// Drop the link if it is still the given connection.
    pub fn detach(&mut self, id: ConnectionId) -> bool {
        if self.connection_id() == Some(id) {
            self.link = Link::Detached;
            true
        } else {
            false
        }
    }

    /// Deliver one message.
    ///
    /// A closed or full connection leaves the player detached: a client that
    /// missed a message holds a stale roster and must join again.
    pub fn send(&mut self, text: &str) -> Result<(), DeliveryError> {
        let Link::Attached(conn) = &self.link else {
            return Err(DeliveryError::Detached);
        };
        match conn.send(text.to_string()) {
            Err(e @ (DeliveryError::Closed | DeliveryError::Full)) => {
                self.link = Link::Detached;
                Err(e)
            }
            other => other,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            nickname: self.nickname.clone(),
            points: self.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nickname_is_trimmed_and_required() {
        assert_eq!(Player::new("  alice ").unwrap().nickname(), "alice");
        assert_eq!(Player::new("   ").unwrap_err(), LobbyError::InvalidNickname);
    }

    #[test]
    fn link_lifecycle() {
        let mut player = Player::new("alice").unwrap();
        assert_eq!(player.state(), LinkState::Unattached);
        assert_eq!(player.send("hi"), Err(DeliveryError::Detached));

        let (conn, mut rx) = PlayerConnection::channel(4);
        let id = conn.id();
        assert_eq!(player.attach(conn), None);
        assert_eq!(player.state(), LinkState::Attached);

        player.send("hi").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hi");

        drop(rx);
        assert_eq!(player.send("again"), Err(DeliveryError::Closed));
        assert_eq!(player.state(), LinkState::Detached);
        assert!(!player.detach(id));
    }

    #[test]
    fn stale_detach_keeps_newer_link() {
        let mut player = Player::new("alice").unwrap();
        let (old, _old_rx) = PlayerConnection::channel(4);
        let (new, _new_rx) = PlayerConnection::channel(4);
        let old_id = old.id();
        let new_id = new.id();
        assert_ne!(old_id, new_id);

        player.attach(old);
        assert_eq!(player.attach(new), Some(old_id));
        assert!(!player.detach(old_id));
        assert_eq!(player.connection_id(), Some(new_id));
        assert!(player.detach(new_id));
        assert_eq!(player.state(), LinkState::Detached);
    }

    #[test]
    fn full_buffer_detaches() {
        let mut player = Player::new("alice").unwrap();
        let (conn, mut rx) = PlayerConnection::channel(1);
        player.attach(conn);
        player.send("one").unwrap();
        assert_eq!(player.send("two"), Err(DeliveryError::Full));
        assert_eq!(player.state(), LinkState::Detached);

        // Later sends are skipped until the client joins again.
        rx.try_recv().unwrap();
        assert_eq!(player.send("three"), Err(DeliveryError::Detached));

        let (fresh, mut fresh_rx) = PlayerConnection::channel(1);
        player.attach(fresh);
        player.send("four").unwrap();
        assert_eq!(fresh_rx.try_recv().unwrap(), "four");
    }
}
