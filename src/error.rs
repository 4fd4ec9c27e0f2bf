// ⚠️ Error taxonomy shared by the repositories, the calculator and the API

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulatorError {
    /// Missing or malformed request fields
    #[error("{0}")]
    InvalidInput(String),

    /// Duplicate unique key (scheme name, distributor name)
    #[error("{0}")]
    Conflict(String),

    /// No matching scheme / tenure / distributor
    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimulatorError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SimulatorError::InvalidInput(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SimulatorError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        SimulatorError::Conflict(message.into())
    }

    /// True for failures of the store itself rather than of the caller's input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SimulatorError::Database(_) | SimulatorError::Serialization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SimulatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_are_not_internal() {
        assert!(!SimulatorError::invalid("x").is_internal());
        assert!(!SimulatorError::conflict("x").is_internal());
        assert!(!SimulatorError::not_found("x").is_internal());
        assert!(SimulatorError::Database(rusqlite::Error::QueryReturnedNoRows).is_internal());
    }

    #[test]
    fn test_domain_error_message_is_verbatim() {
        let err = SimulatorError::not_found("Scheme 'A' not found");
        assert_eq!(err.to_string(), "Scheme 'A' not found");
    }
}
