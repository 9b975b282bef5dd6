//! Process-wide code → lobby mapping.
//!
//! One registry is built at startup and handed to every handler. The map is
//! a `DashMap`, so lookups only take a shard read lock and inserts go through
//! the vacant-entry API, which makes the collision check and the insert one
//! atomic step.

use crate::error::LobbyError;
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::lobby::{Joined, Lobby};
use crate::player::{Player, PlayerConnection};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use trivia_lobby_protocol::GameState;

/// Code generation settings.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Length of generated lobby codes.
    pub code_length: usize,
    /// How many codes to try before giving up on a create.
    pub max_code_attempts: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            code_length: 6,
            max_code_attempts: 16,
        }
    }
}

pub struct LobbyRegistry {
    lobbies: DashMap<String, Arc<Lobby>>,
    ids: Arc<dyn IdGenerator>,
    settings: RegistrySettings,
}

impl LobbyRegistry {
    pub fn new(ids: Arc<dyn IdGenerator>, settings: RegistrySettings) -> Self {
        Self {
            lobbies: DashMap::new(),
            ids,
            settings,
        }
    }

    /// Create a lobby with `creator_nickname` as its first player.
    ///
    /// Generated codes that are already taken are retried up to
    /// `max_code_attempts` times.
    pub fn create(
        &self,
        initial_state: GameState,
        creator_nickname: &str,
    ) -> Result<(String, Arc<Lobby>), LobbyError> {
        let creator = Player::new(creator_nickname)?;
        let attempts = self.settings.max_code_attempts.max(1);

        for attempt in 1..=attempts {
            let code = self.ids.generate(self.settings.code_length)?;

            match self.lobbies.entry(code) {
                Entry::Occupied(taken) => {
                    tracing::warn!(code = %taken.key(), attempt, "Lobby code collision, retrying");
                }
                Entry::Vacant(slot) => {
                    let code = slot.key().clone();
                    let lobby = Arc::new(Lobby::new(code.clone(), creator, initial_state));
                    slot.insert(Arc::clone(&lobby));
                    tracing::info!(
                        lobby = %code,
                        creator = lobby.creator(),
                        questions = lobby.initial_state().question_count(),
                        "Created lobby"
                    );
                    return Ok((code, lobby));
                }
            }
        }

        tracing::error!(attempts, "Couldn't find a free lobby code");
        Err(LobbyError::LobbyCreateFailed { attempts })
    }

    pub fn lookup(&self, code: &str) -> Option<Arc<Lobby>> {
        self.lobbies.get(code).map(|entry| Arc::clone(entry.value()))
    }

    /// Add a nickname to a lobby, or return the existing player by that name.
    pub async fn add_player(&self, code: &str, nickname: &str) -> Result<Joined, LobbyError> {
        let lobby = self
            .lookup(code)
            .ok_or_else(|| LobbyError::LobbyNotFound(code.to_string()))?;
        lobby.add_player(nickname).await
    }

    /// Resolve the lobby and attach a connection to the player.
    pub async fn join(
        &self,
        code: &str,
        nickname: Option<&str>,
        conn: PlayerConnection,
    ) -> Result<(Arc<Lobby>, Joined), LobbyError> {
        let lobby = self
            .lookup(code)
            .ok_or_else(|| LobbyError::LobbyNotFound(code.to_string()))?;
        let joined = lobby.join(nickname, conn).await?;
        Ok((lobby, joined))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lobbies.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }

    pub fn codes(&self) -> Vec<String> {
        self.lobbies.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }
}

impl Default for LobbyRegistry {
    fn default() -> Self {
        Self::new(Arc::new(RandomIdGenerator), RegistrySettings::default())
    }
}

#[cfg(test)]
mod tests;
