use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("{entity} {id} is {state}: {message}")]
    InvalidState {
        entity: &'static str,
        id: u64,
        state: String,
        message: String,
    },

    #[error("No guard available")]
    NoResourceAvailable,

    #[error("Persistence failure: {message}")]
    PersistenceFailure { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::PersistenceFailure {
            message: format!("io: {}", err),
        }
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::PersistenceFailure {
            message: format!("snapshot encoding: {}", err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lookup,
    Lifecycle,
    Capacity,
    Storage,
    Configuration,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl DispatchError {
    pub fn invalid_state(
        entity: &'static str,
        id: u64,
        state: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        DispatchError::InvalidState {
            entity,
            id,
            state: state.to_string(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        DispatchError::PersistenceFailure {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DispatchError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DispatchError::NotFound { .. } => ErrorCategory::Lookup,
            DispatchError::InvalidState { .. } => ErrorCategory::Lifecycle,
            DispatchError::NoResourceAvailable => ErrorCategory::Capacity,
            DispatchError::PersistenceFailure { .. } => ErrorCategory::Storage,
            DispatchError::ConfigError { .. }
            | DispatchError::ConfigValidationError { .. }
            | DispatchError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DispatchError::ValidationError { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Capacity => ErrorSeverity::Medium,
            ErrorCategory::Lookup | ErrorCategory::Lifecycle | ErrorCategory::Input => {
                ErrorSeverity::High
            }
            ErrorCategory::Storage | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// Only pool exhaustion is worth retrying; the engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::NoResourceAvailable)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DispatchError::NotFound { .. } => "Check the identifier with one of the list commands",
            DispatchError::InvalidState { .. } => {
                "The entity is not in a state that allows this operation; inspect it before retrying"
            }
            DispatchError::NoResourceAvailable => {
                "All guards are committed; retry later or provision another guard"
            }
            DispatchError::PersistenceFailure { .. } => {
                "Check that the state file location is writable and not corrupted"
            }
            DispatchError::ConfigError { .. }
            | DispatchError::ConfigValidationError { .. }
            | DispatchError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line flags"
            }
            DispatchError::ValidationError { .. } => "Correct the command arguments",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DispatchError::NotFound { entity, id } => format!("No {} with id {} exists", entity, id),
            DispatchError::InvalidState {
                entity,
                id,
                state,
                message,
            } => format!("{} {} is {} ({})", entity, id, state, message),
            DispatchError::NoResourceAvailable => {
                "No guard is free right now; the request is still pending".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exhaustion_is_retryable() {
        assert!(DispatchError::NoResourceAvailable.is_retryable());
        assert!(!DispatchError::NotFound {
            entity: "request",
            id: 1
        }
        .is_retryable());
        assert!(!DispatchError::invalid_state("request", 1, "assigned", "already assigned")
            .is_retryable());
        assert!(!DispatchError::persistence("disk full").is_retryable());
    }

    #[test]
    fn test_io_errors_become_persistence_failures() {
        let err: DispatchError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_only_exhaustion_has_medium_severity() {
        assert_eq!(
            DispatchError::NoResourceAvailable.severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(
            DispatchError::validation("bad input").severity(),
            ErrorSeverity::High
        );
        assert!(DispatchError::ConfigError {
            message: "unreadable".to_string()
        }
        .severity()
            > ErrorSeverity::High);
    }
}
