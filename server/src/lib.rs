pub mod builder;
pub mod error;
pub mod id;
pub mod lobby;
pub mod player;
pub mod registry;
pub mod rest;
pub mod session;
pub mod ws;

#[cfg(test)]
mod testing;

use crate::registry::{LobbyRegistry, RegistrySettings};
use crate::rest::AppState;
use crate::ws::WsState;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use std::sync::Arc;

pub use builder::ServerBuilder;
pub use error::{DeliveryError, LobbyError, ServerError};
pub use id::{IdGenerator, RandomIdGenerator};
pub use lobby::Lobby;
pub use player::{Player, PlayerConnection};

/// The lobby server: one registry shared by the HTTP and WebSocket handlers.
pub struct Server {
    config: ServerConfig,
    registry: Arc<LobbyRegistry>,
}

/// Configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server.
    pub http_addr: String,
    /// Origins allowed for CORS and WebSocket upgrades. Empty allows any.
    pub allowed_origins: Vec<String>,
    /// Length of generated lobby codes.
    pub code_length: usize,
    /// Code generation attempts before a create fails.
    pub max_code_attempts: usize,
    /// Largest inbound WebSocket frame, in bytes.
    pub max_frame_size: usize,
    /// Outbound messages buffered per connection.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:3000".to_string(),
            allowed_origins: Vec::new(), // Allow all origins for dev
            code_length: 6,
            max_code_attempts: 16,
            max_frame_size: 64 * 1024,
            outbound_buffer: 64,
        }
    }
}

impl ServerConfig {
    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            code_length: self.code_length,
            max_code_attempts: self.max_code_attempts,
        }
    }
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The registry handlers share. Useful for seeding lobbies in tests.
    pub fn registry(&self) -> Arc<LobbyRegistry> {
        Arc::clone(&self.registry)
    }

    /// Run the server until the HTTP listener stops.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on HTTP {}", self.config.http_addr);
        if self.config.allowed_origins.is_empty() {
            tracing::warn!("Accepting connections from any origin");
        }

        let app_state = web::Data::new(AppState {
            registry: Arc::clone(&self.registry),
        });

        let ws_state = web::Data::new(WsState {
            registry: Arc::clone(&self.registry),
            allowed_origins: self.config.allowed_origins.clone(),
            max_frame_size: self.config.max_frame_size,
            outbound_buffer: self.config.outbound_buffer,
        });

        let origins = self.config.allowed_origins.clone();
        let http_server = HttpServer::new(move || {
            App::new()
                .wrap(cors(&origins))
                .app_data(app_state.clone())
                .app_data(ws_state.clone())
                .configure(rest::configure)
        })
        .bind(&self.config.http_addr)?
        .run();

        http_server
            .await
            .map_err(|e| ServerError::Http(e.to_string()))
    }
}

fn cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        return Cors::permissive();
    }
    origins.iter().fold(
        Cors::default().allow_any_method().allow_any_header(),
        |cors, origin| cors.allowed_origin(origin),
    )
}
