use crate::error::ServerError;
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::registry::LobbyRegistry;
use crate::{Server, ServerConfig};
use std::sync::Arc;

/// Builder for constructing a Server instance.
pub struct ServerBuilder {
    config: ServerConfig,
    id_generator: Option<Arc<dyn IdGenerator>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            id_generator: None,
        }
    }

    /// Set server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the HTTP address.
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.http_addr = addr.into();
        self
    }

    /// Set allowed origins for CORS and WebSocket upgrades.
    /// If not set, any origin is accepted (not recommended for production).
    ///
    /// # Example
    /// ```ignore
    /// .allowed_origins(["https://trivia.example.com"])
    /// ```
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origins = origins.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Set the lobby code length. Default: 6.
    pub fn code_length(mut self, len: usize) -> Self {
        self.config.code_length = len;
        self
    }

    /// Set how many codes are tried before a create fails. Default: 16.
    pub fn max_code_attempts(mut self, attempts: usize) -> Self {
        self.config.max_code_attempts = attempts;
        self
    }

    /// Set the largest inbound WebSocket frame in bytes. Default: 64 KiB.
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.config.max_frame_size = bytes;
        self
    }

    /// Set the per-connection outbound buffer. Default: 64 messages.
    pub fn outbound_buffer(mut self, messages: usize) -> Self {
        self.config.outbound_buffer = messages;
        self
    }

    /// Replace the random code generator.
    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.id_generator = Some(Arc::new(ids));
        self
    }

    /// Build the server.
    pub fn build(self) -> Result<Server, ServerError> {
        if self.config.code_length == 0 {
            return Err(ServerError::Config("code_length must be positive".into()));
        }
        if self.config.max_code_attempts == 0 {
            return Err(ServerError::Config(
                "max_code_attempts must be positive".into(),
            ));
        }
        if self.config.outbound_buffer == 0 {
            return Err(ServerError::Config("outbound_buffer must be positive".into()));
        }

        let ids = self
            .id_generator
            .unwrap_or_else(|| Arc::new(RandomIdGenerator));
        let registry = LobbyRegistry::new(ids, self.config.registry_settings());

        Ok(Server {
            config: self.config,
            registry: Arc::new(registry),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let server = ServerBuilder::new().build().unwrap();
        assert_eq!(server.config().code_length, 6);
        assert!(server.registry().is_empty());
    }

    #[test]
    fn settings_reach_the_registry() {
        let server = ServerBuilder::new()
            .http_addr("127.0.0.1:4000")
            .allowed_origins(["http://localhost:5173"])
            .code_length(8)
            .max_code_attempts(3)
            .build()
            .unwrap();

        assert_eq!(server.config().http_addr, "127.0.0.1:4000");
        assert_eq!(server.config().allowed_origins, vec!["http://localhost:5173"]);
        assert_eq!(server.registry().settings().code_length, 8);
        assert_eq!(server.registry().settings().max_code_attempts, 3);
    }

    #[test]
    fn zero_code_length_is_rejected() {
        let result = ServerBuilder::new().code_length(0).build();
        assert!(matches!(result, Err(ServerError::Config(_))));
    }
}
