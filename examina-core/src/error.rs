//! Unified error handling system
//!
//! Provides structured error types with context and proper error chaining
//! for configuration and infrastructure failures. Domain errors (token
//! decoding, refresh, sign-in) live next to the code that produces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ExaminaResult<T> = Result<T, ExaminaError>;

/// Error context providing additional information for debugging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for infrastructure concerns
#[derive(Error, Debug)]
pub enum ExaminaError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExaminaError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ExaminaError::Config { context, .. } => Some(context),
            ExaminaError::Storage { context, .. } => Some(context),
            ExaminaError::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_context_builder_collects_fields() {
        let context = ErrorContext::new("config")
            .with_operation("validate")
            .with_metadata("path", "/etc/examina.toml")
            .with_suggestion("Check the config file");

        assert_eq!(context.component, "config");
        assert_eq!(context.operation.as_deref(), Some("validate"));
        assert_eq!(context.metadata.get("path").unwrap(), "/etc/examina.toml");
        assert_eq!(context.recovery_suggestions.len(), 1);
        assert!(!context.error_id.is_empty());
    }

    #[test]
    fn config_error_exposes_context() {
        let err = ExaminaError::Config {
            message: "bad value".to_string(),
            source: None,
            context: ErrorContext::new("config"),
        };

        assert!(err.context().is_some());
        assert_eq!(err.context().unwrap().component, "config");
    }

    #[test]
    fn io_error_has_no_context() {
        let err = ExaminaError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(err.context().is_none());
    }
}
