//! Wire types for the trivia lobby server.
//!
//! Everything here is shared between the server and its clients: the board
//! payload posted when a lobby is created, the join messages read from a live
//! connection, and the envelope every outbound notification is wrapped in.

use serde::{Deserialize, Serialize};

// ============================================================================
// Board
// ============================================================================

/// A single clue on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub clue: String,
    pub answer: String,
    pub points: i32,
    pub category: String,
    #[serde(rename = "col")]
    pub column: i32,
    pub row: i32,
}

/// One category column of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRow {
    pub questions: Vec<Question>,
    pub category: String,
}

/// The board a lobby was created with.
///
/// Opaque to the server: stored once at creation and forwarded as-is.
/// On the wire this is a plain JSON array of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameState {
    pub rows: Vec<GameRow>,
}

impl GameState {
    pub fn new(rows: Vec<GameRow>) -> Self {
        Self { rows }
    }

    /// Total number of questions across all categories.
    pub fn question_count(&self) -> usize {
        self.rows.iter().map(|row| row.questions.len()).sum()
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Body of `POST /createlobby`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    pub game_rows: Vec<GameRow>,
    pub creator_nickname: String,
}

/// A join message read from a live connection.
///
/// Clients either send the lobby code as the whole message, or a JSON
/// object `{"code": "...", "nickname": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseJoinError {
    #[error("empty join message")]
    Empty,
    #[error("malformed join message: {0}")]
    Json(#[from] serde_json::Error),
}

impl JoinRequest {
    pub fn new(code: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            nickname: Some(nickname.into()),
        }
    }

    /// Parse either protocol flavour from a text frame.
    pub fn parse(text: &str) -> Result<Self, ParseJoinError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseJoinError::Empty);
        }

        if text.starts_with('{') {
            let mut request: JoinRequest = serde_json::from_str(text)?;
            request.code = request.code.trim().to_string();
            request.nickname = request
                .nickname
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty());
            return Ok(request);
        }

        Ok(Self {
            code: text.to_string(),
            nickname: None,
        })
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Public view of a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub nickname: String,
    pub points: u32,
}

/// Payload of the `createdLobby` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedLobby {
    pub code: String,
    pub player: PlayerInfo,
}

/// Payload of the `lobbyInfo` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyInfo {
    pub code: String,
    pub creator: String,
    pub players: Vec<PlayerInfo>,
    pub game_rows: GameState,
    pub created_at: u64,
}

// ============================================================================
// Envelope
// ============================================================================

/// Success payload wrapper: `{"message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload<T> {
    pub message: T,
}

/// Failure payload wrapper: `{"err": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub err: String,
}

/// Every outbound notification, discriminated by `kind`.
///
/// Success variants carry `data.message`, the failure variant carries
/// `data.err`. A value never carries both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Envelope {
    /// Greeting written once when a live connection opens.
    #[serde(rename = "connected")]
    Connected(Payload<String>),
    #[serde(rename = "createdLobby")]
    CreatedLobby(Payload<CreatedLobby>),
    #[serde(rename = "joinedLobby")]
    JoinedLobby(Payload<String>),
    #[serde(rename = "playersJoined")]
    PlayersJoined(Payload<Vec<String>>),
    #[serde(rename = "lobbyInfo")]
    LobbyInfo(Payload<LobbyInfo>),
    #[serde(rename = "err")]
    Err(Failure),
}

impl Envelope {
    pub fn connected(message: impl Into<String>) -> Self {
        Self::Connected(Payload {
            message: message.into(),
        })
    }

    pub fn created_lobby(code: impl Into<String>, player: PlayerInfo) -> Self {
        Self::CreatedLobby(Payload {
            message: CreatedLobby {
                code: code.into(),
                player,
            },
        })
    }

    pub fn joined_lobby(message: impl Into<String>) -> Self {
        Self::JoinedLobby(Payload {
            message: message.into(),
        })
    }

    pub fn players_joined(roster: Vec<String>) -> Self {
        Self::PlayersJoined(Payload { message: roster })
    }

    pub fn lobby_info(info: LobbyInfo) -> Self {
        Self::LobbyInfo(Payload { message: info })
    }

    pub fn failure(err: impl Into<String>) -> Self {
        Self::Err(Failure { err: err.into() })
    }

    /// The `kind` tag this envelope is serialized with.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::CreatedLobby(_) => "createdLobby",
            Self::JoinedLobby(_) => "joinedLobby",
            Self::PlayersJoined(_) => "playersJoined",
            Self::LobbyInfo(_) => "lobbyInfo",
            Self::Err(_) => "err",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Serialize to the JSON text sent over a connection.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
