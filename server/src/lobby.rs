//! A single trivia session: its board, its creator and its roster.
//!
//! The roster sits behind one `RwLock`. Joins and broadcasts take it
//! exclusively, so a broadcast never sees a half-appended roster and
//! concurrent joins never lose an append. Sends never await while the lock
//! is held.

use crate::error::{DeliveryError, LobbyError};
use crate::player::{ConnectionId, LinkState, Player, PlayerConnection};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use trivia_lobby_protocol::{Envelope, GameState, LobbyInfo, PlayerInfo};

/// Outcome of attaching a nickname to a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub player: PlayerInfo,
    /// The nickname was already on the roster and was re-attached.
    pub rejoined: bool,
}

/// Per-recipient delivery tally of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct Lobby {
    code: String,
    creator: String,
    initial_state: GameState,
    created_at_unix: u64,
    /// Join order; the creator is always first.
    players: RwLock<Vec<Player>>,
}

impl Lobby {
    pub(crate) fn new(code: String, creator: Player, initial_state: GameState) -> Self {
        let created_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            code,
            creator: creator.nickname().to_string(),
            initial_state,
            created_at_unix,
            players: RwLock::new(vec![creator]),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Display name of the lobby. Always the code.
    pub fn name(&self) -> &str {
        &self.code
    }

    /// Nickname of the creator.
    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn initial_state(&self) -> &GameState {
        &self.initial_state
    }

    pub fn created_at(&self) -> u64 {
        self.created_at_unix
    }

    /// Append a player, or return the existing one with the same nickname.
    pub async fn add_player(&self, nickname: &str) -> Result<Joined, LobbyError> {
        let candidate = Player::new(nickname)?;
        let mut players = self.players.write().await;
        let (index, rejoined) = upsert(&mut players, candidate);
        Ok(Joined {
            player: players[index].info(),
            rejoined,
        })
    }

    /// Add-or-find the player, attach the connection and queue the
    /// `joinedLobby` confirmation, all under one write lock.
    ///
    /// The confirmation is queued before the lock is released, so no roster
    /// broadcast can reach the new connection ahead of it.
    /// Without a nickname the first free `player<N>` name is assigned.
    pub async fn join(
        &self,
        nickname: Option<&str>,
        conn: PlayerConnection,
    ) -> Result<Joined, LobbyError> {
        let mut players = self.players.write().await;
        let candidate = match nickname {
            Some(nickname) => Player::new(nickname)?,
            None => Player::new(&free_nickname(&players))?,
        };

        let (index, rejoined) = upsert(&mut players, candidate);
        let player = &mut players[index];
        if let Some(previous) = player.attach(conn) {
            tracing::debug!(
                lobby = %self.code,
                player = player.nickname(),
                ?previous,
                "Replaced existing connection"
            );
        }

        let confirmation =
            Envelope::joined_lobby(format!("Joined lobby {} as {}", self.code, player.nickname()));
        match confirmation.to_text() {
            Ok(text) => {
                if let Err(e) = player.send(&text) {
                    tracing::debug!(lobby = %self.code, player = player.nickname(), "Couldn't confirm join: {}", e);
                }
            }
            Err(e) => tracing::error!(lobby = %self.code, "Couldn't encode join confirmation: {}", e),
        }

        Ok(Joined {
            player: player.info(),
            rejoined,
        })
    }

    /// Mark the player's link dead if it is still `id`.
    pub async fn detach(&self, nickname: &str, id: ConnectionId) -> bool {
        let mut players = self.players.write().await;
        players
            .iter_mut()
            .find(|p| p.nickname() == nickname)
            .map(|p| p.detach(id))
            .unwrap_or(false)
    }

    /// Send to every attached player. Failures are logged per recipient and
    /// never stop delivery to the rest.
    pub async fn broadcast(&self, envelope: &Envelope) -> BroadcastReport {
        let mut players = self.players.write().await;
        self.deliver(&mut players, envelope)
    }

    /// Broadcast the current roster as `playersJoined`.
    ///
    /// The snapshot and the fan-out happen under the same lock.
    pub async fn broadcast_roster(&self) -> (Vec<String>, BroadcastReport) {
        let mut players = self.players.write().await;
        let roster: Vec<String> = players.iter().map(|p| p.nickname().to_string()).collect();
        let report = self.deliver(&mut players, &Envelope::players_joined(roster.clone()));
        (roster, report)
    }

    /// Send to a single player.
    pub async fn send_to(&self, nickname: &str, envelope: &Envelope) -> Result<(), DeliveryError> {
        let text = envelope.to_text().map_err(|_| DeliveryError::Encode)?;
        let mut players = self.players.write().await;
        players
            .iter_mut()
            .find(|p| p.nickname() == nickname)
            .ok_or(DeliveryError::Detached)?
            .send(&text)
    }

    /// Nicknames in join order, creator first.
    pub async fn roster(&self) -> Vec<String> {
        self.players
            .read()
            .await
            .iter()
            .map(|p| p.nickname().to_string())
            .collect()
    }

    pub async fn players(&self) -> Vec<PlayerInfo> {
        self.players.read().await.iter().map(Player::info).collect()
    }

    pub async fn player_state(&self, nickname: &str) -> Option<LinkState> {
        self.players
            .read()
            .await
            .iter()
            .find(|p| p.nickname() == nickname)
            .map(Player::state)
    }

    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn info(&self) -> LobbyInfo {
        LobbyInfo {
            code: self.code.clone(),
            creator: self.creator.clone(),
            players: self.players().await,
            game_rows: self.initial_state.clone(),
            created_at: self.created_at_unix,
        }
    }

    fn deliver(&self, players: &mut [Player], envelope: &Envelope) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let text = match envelope.to_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(lobby = %self.code, "Couldn't encode {}: {}", envelope.kind(), e);
                return report;
            }
        };

        for player in players.iter_mut() {
            match player.send(&text) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Detached) => {
                    report.failed += 1;
                    tracing::debug!(lobby = %self.code, player = player.nickname(), "Skipping detached player");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        lobby = %self.code,
                        player = player.nickname(),
                        kind = envelope.kind(),
                        "Delivery failed: {}",
                        e
                    );
                }
            }
        }

        report
    }
}

fn upsert(players: &mut Vec<Player>, candidate: Player) -> (usize, bool) {
    match players
        .iter()
        .position(|p| p.nickname() == candidate.nickname())
    {
        Some(index) => (index, true),
        None => {
            players.push(candidate);
            (players.len() - 1, false)
        }
    }
}

fn free_nickname(players: &[Player]) -> String {
    let mut n = players.len() + 1;
    loop {
        let candidate = format!("player{n}");
        if !players.iter().any(|p| p.nickname() == candidate) {
            return candidate;
        }
        n += 1;
    }
}
