//! REST API handlers for actix-web.

use crate::error::LobbyError;
use crate::registry::LobbyRegistry;
use crate::ws;
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use trivia_lobby_protocol::{CreateLobbyRequest, Envelope, GameState, PlayerInfo};

/// Shared application state for REST handlers.
pub struct AppState {
    pub registry: Arc<LobbyRegistry>,
}

/// Register every route. State is attached by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/createlobby", web::post().to(create_lobby))
        .route("/lobbies/{code}", web::get().to(lobby_info))
        .route("/lobbies/{code}/join", web::get().to(ws::lobby_join_ws))
        .route("/joinlobby", web::get().to(ws::join_lobby_ws));
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// POST /createlobby - Create a lobby from a board and a creator nickname.
pub async fn create_lobby(body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    let request: CreateLobbyRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let preview = String::from_utf8_lossy(&body[..body.len().min(20)]);
            tracing::warn!(body = %preview, "Couldn't parse create lobby request: {}", e);
            return HttpResponse::BadRequest()
                .json(Envelope::failure(format!("Couldn't create lobby: {}", e)));
        }
    };

    let board = GameState::new(request.game_rows);
    match state.registry.create(board, &request.creator_nickname) {
        Ok((code, lobby)) => {
            let player = PlayerInfo {
                nickname: lobby.creator().to_string(),
                points: 0,
            };
            HttpResponse::Ok().json(Envelope::created_lobby(code, player))
        }
        Err(e @ LobbyError::InvalidNickname) => {
            HttpResponse::BadRequest().json(Envelope::failure(e.to_string()))
        }
        Err(e) => {
            tracing::error!("Lobby creation failed: {}", e);
            HttpResponse::InternalServerError().json(Envelope::failure(e.to_string()))
        }
    }
}

/// GET /lobbies/{code} - Board and roster of one lobby.
pub async fn lobby_info(path: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    let code = path.into_inner();
    match state.registry.lookup(&code) {
        Some(lobby) => HttpResponse::Ok().json(Envelope::lobby_info(lobby.info().await)),
        None => HttpResponse::NotFound()
            .json(Envelope::failure(LobbyError::LobbyNotFound(code).to_string())),
    }
}
