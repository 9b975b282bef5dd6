use super::*;
use crate::error::IdError;
use crate::testing::TestClient;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use trivia_lobby_protocol::{GameRow, Question};

// =============================================================================
// Helpers
// =============================================================================

/// Hands out a fixed sequence of codes, then fails.
struct ScriptedIds(Mutex<VecDeque<&'static str>>);

impl ScriptedIds {
    fn new(codes: &[&'static str]) -> Arc<Self> {
        Arc::new(Self(Mutex::new(codes.iter().copied().collect())))
    }
}

impl IdGenerator for ScriptedIds {
    fn generate(&self, _len: usize) -> Result<String, IdError> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .map(str::to_string)
            .ok_or_else(|| IdError("out of codes".to_string()))
    }
}

fn board() -> GameState {
    let questions = (1..=5)
        .map(|row| Question {
            clue: format!("Clue {row}"),
            answer: format!("Answer {row}"),
            points: row * 100,
            category: "Geography".to_string(),
            column: 0,
            row,
        })
        .collect();
    GameState::new(vec![GameRow {
        questions,
        category: "Geography".to_string(),
    }])
}

// =============================================================================
// Create / lookup
// =============================================================================

#[tokio::test]
async fn created_lobby_is_registered() {
    let registry = LobbyRegistry::default();
    let (code, lobby) = registry.create(board(), "host").unwrap();

    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert!(registry.contains(&code));

    let found = registry.lookup(&code).unwrap();
    assert!(Arc::ptr_eq(&found, &lobby));
    assert_eq!(found.roster().await[0], "host");
    assert_eq!(found.initial_state().question_count(), 5);
}

#[test]
fn lookup_unknown_code() {
    let registry = LobbyRegistry::default();
    assert!(registry.lookup("nope00").is_none());
    assert!(registry.is_empty());
}

#[test]
fn empty_creator_nickname_is_rejected() {
    let registry = LobbyRegistry::default();
    let err = registry.create(board(), " ").unwrap_err();
    assert_eq!(err, LobbyError::InvalidNickname);
    assert!(registry.is_empty());
}

#[test]
fn collision_retries_with_new_code() {
    let ids = ScriptedIds::new(&["AAAAAA", "AAAAAA", "BBBBBB"]);
    let registry = LobbyRegistry::new(ids, RegistrySettings::default());

    let (first, _) = registry.create(board(), "one").unwrap();
    let (second, lobby) = registry.create(board(), "two").unwrap();

    assert_eq!(first, "AAAAAA");
    assert_eq!(second, "BBBBBB");
    assert_eq!(lobby.creator(), "two");
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.lookup("AAAAAA").unwrap().creator(), "one");
}

#[test]
fn collision_retries_are_bounded() {
    let ids = ScriptedIds::new(&["AAAAAA", "AAAAAA", "AAAAAA", "AAAAAA"]);
    let settings = RegistrySettings {
        code_length: 6,
        max_code_attempts: 3,
    };
    let registry = LobbyRegistry::new(ids, settings);

    registry.create(board(), "one").unwrap();
    let err = registry.create(board(), "two").unwrap_err();

    assert_eq!(err, LobbyError::LobbyCreateFailed { attempts: 3 });
    assert_eq!(registry.len(), 1);
}

#[test]
fn id_generator_failure_fails_the_create() {
    let registry = LobbyRegistry::new(ScriptedIds::new(&[]), RegistrySettings::default());
    let err = registry.create(board(), "host").unwrap_err();
    assert!(matches!(err, LobbyError::IdGeneration(_)));
}

// =============================================================================
// Players
// =============================================================================

#[tokio::test]
async fn add_player_to_unknown_lobby() {
    let registry = LobbyRegistry::default();
    let err = registry.add_player("nope00", "alice").await.unwrap_err();
    assert_eq!(err, LobbyError::LobbyNotFound("nope00".to_string()));
}

#[tokio::test]
async fn distinct_joins_preserve_order() {
    let registry = LobbyRegistry::default();
    let (code, lobby) = registry.create(board(), "host").unwrap();

    for name in ["alice", "bob", "carol"] {
        let joined = registry.add_player(&code, name).await.unwrap();
        assert!(!joined.rejoined);
    }

    assert_eq!(lobby.roster().await, vec!["host", "alice", "bob", "carol"]);
}

#[tokio::test]
async fn creator_nickname_reattaches() {
    let registry = LobbyRegistry::default();
    let (code, lobby) = registry.create(board(), "host").unwrap();
    let client = TestClient::new();

    let (_, joined) = registry
        .join(&code, Some("host"), client.connection())
        .await
        .unwrap();

    assert!(joined.rejoined);
    assert_eq!(joined.player.nickname, "host");
    assert_eq!(lobby.player_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_lose_no_appends() {
    const JOINS: usize = 32;

    let registry = Arc::new(LobbyRegistry::default());
    let (code, lobby) = registry.create(board(), "host").unwrap();

    let mut clients = Vec::new();
    let mut tasks = Vec::new();
    for i in 0..JOINS {
        let client = TestClient::with_capacity(JOINS * 2);
        let conn = client.connection();
        clients.push(client);

        let registry = Arc::clone(&registry);
        let code = code.clone();
        tasks.push(tokio::spawn(async move {
            let nickname = format!("player-{i}");
            let (lobby, _) = registry.join(&code, Some(nickname.as_str()), conn).await.unwrap();
            lobby.broadcast_roster().await;
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    let roster = lobby.roster().await;
    assert_eq!(roster.len(), JOINS + 1);
    assert_eq!(roster[0], "host");
    let unique: HashSet<_> = roster.iter().collect();
    assert_eq!(unique.len(), roster.len());
}
