//! Lobby code generation.

use crate::error::IdError;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Produces short random identifiers used as lobby codes.
pub trait IdGenerator: Send + Sync {
    fn generate(&self, len: usize) -> Result<String, IdError>;
}

/// ASCII alphanumeric codes from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self, len: usize) -> Result<String, IdError> {
        if len == 0 {
            return Err(IdError("code length must be positive".to_string()));
        }
        let code = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_length() {
        let code = RandomIdGenerator.generate(6).unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn zero_length_is_an_error() {
        assert!(RandomIdGenerator.generate(0).is_err());
    }
}
