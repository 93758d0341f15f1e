//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type RepocatResult<T> = Result<T, RepocatError>;

/// Error context providing additional information for debugging and recovery
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

/// Main error type for repository analysis
#[derive(Error, Debug)]
pub enum RepocatError {
    /// A document, checkout or other resource does not exist
    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    /// Converting a document to HTML failed
    #[error("Conversion error: {message}")]
    Conversion {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// A document type name or extension outside the supported set
    #[error("Unsupported document type: {type_name}")]
    UnsupportedType {
        type_name: String,
        context: ErrorContext,
    },

    /// A history record whose header does not have the expected shape
    #[error("Malformed history record: {message}")]
    MalformedRecord {
        message: String,
        record: String,
        context: ErrorContext,
    },

    /// The history dump process could not be run to completion
    #[error("History collection error: {message}")]
    HistoryCollection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Repository error: {message}")]
    Repository {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl RepocatError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            RepocatError::NotFound { context, .. } => Some(context),
            RepocatError::Conversion { context, .. } => Some(context),
            RepocatError::UnsupportedType { context, .. } => Some(context),
            RepocatError::MalformedRecord { context, .. } => Some(context),
            RepocatError::HistoryCollection { context, .. } => Some(context),
            RepocatError::Repository { context, .. } => Some(context),
            RepocatError::Config { context, .. } => Some(context),
            RepocatError::Timeout { context, .. } => Some(context),
            RepocatError::Internal { context, .. } => Some(context),
            RepocatError::Io(_) | RepocatError::Serialization(_) => None,
        }
    }

    /// Check if error is recoverable
    ///
    /// Recoverable errors only affect one document or one commit of a run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RepocatError::NotFound { .. } => true,
            RepocatError::Conversion { .. } => true,
            RepocatError::MalformedRecord { .. } => true,
            RepocatError::Timeout { .. } => true,
            RepocatError::UnsupportedType { .. } => false,
            RepocatError::HistoryCollection { .. } => false,
            RepocatError::Config { .. } => false,
            _ => false,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            RepocatError::Internal { .. } | RepocatError::UnsupportedType { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Internal error occurred"
                );
            }
            RepocatError::Config { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration error"
                );
            }
            RepocatError::NotFound { .. }
            | RepocatError::Conversion { .. }
            | RepocatError::MalformedRecord { .. }
            | RepocatError::Timeout { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Recoverable error"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! not_found_error {
    ($resource:expr, $component:expr) => {
        $crate::RepocatError::NotFound {
            resource: $resource.to_string(),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Verify the path exists and is accessible"),
        }
    };
}

#[macro_export]
macro_rules! conversion_error {
    ($msg:expr, $component:expr) => {
        $crate::RepocatError::Conversion {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::RepocatError::Conversion {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! malformed_record_error {
    ($msg:expr, $record:expr, $component:expr) => {
        $crate::RepocatError::MalformedRecord {
            message: $msg.to_string(),
            record: $record.to_string(),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::RepocatError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'repocat config --init' to create default config"),
        }
    };
}
