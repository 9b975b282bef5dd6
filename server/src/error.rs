use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP server error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors from lobby creation, lookup and join.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LobbyError {
    #[error("No such lobby: {0}")]
    LobbyNotFound(String),

    #[error("Nickname must not be empty")]
    InvalidNickname,

    #[error("Couldn't create lobby after {attempts} attempts")]
    LobbyCreateFailed { attempts: usize },

    #[error("Couldn't generate lobby code: {0}")]
    IdGeneration(#[from] IdError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("id generator failed: {0}")]
pub struct IdError(pub String);

/// A send to one player's connection failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("player has no live connection")]
    Detached,

    #[error("connection closed")]
    Closed,

    #[error("outbound buffer full")]
    Full,

    #[error("couldn't encode message")]
    Encode,
}
