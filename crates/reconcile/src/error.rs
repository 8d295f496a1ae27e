//! Error types for reconciliation.
//!
//! Errors are categorized so callers can decide what to retry, what to
//! surface as a configuration problem and what is a bug on their side.
//! Every variant carries the resource type and, where one exists, the
//! identity and attribute involved.

use crate::remote::RemoteError;
use crate::types::Operation;
use std::fmt;
use thiserror::Error;

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Desired state violates the schema
    Validation,
    /// Provider configuration could not be resolved
    Config,
    /// Remote call failed for a reason other than not-found
    Remote,
    /// Remote response violates the expected contract
    Protocol,
    /// Caller routed a replacement-requiring change into an update
    Caller,
    /// Cancellation or deadline honored mid-operation
    Cancelled,
    /// Schema declaration is inconsistent
    Schema,
}

impl ErrorCategory {
    /// Whether retrying the same call can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote | Self::Cancelled)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid desired state",
            Self::Config => "Invalid provider configuration",
            Self::Remote => "Remote call failed",
            Self::Protocol => "Unexpected remote response",
            Self::Caller => "Invalid reconciliation request",
            Self::Cancelled => "Operation cancelled",
            Self::Schema => "Invalid resource schema",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the attribute in the configuration and resubmit",
            Self::Config => "Set the missing provider fields or their environment variables",
            Self::Remote => "Check connectivity and credentials, then retry",
            Self::Protocol => "The backend returned an unexpected document; report it upstream",
            Self::Caller => "Route immutable attribute changes through delete and create",
            Self::Cancelled => "The operation can be retried safely",
            Self::Schema => "Fix the resource schema declaration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while validating or reconciling resources.
#[derive(Debug, Error)]
pub enum Error {
    /// Resource type is not registered
    #[error("unknown resource type: {resource_type}")]
    UnknownResourceType {
        /// Requested resource type
        resource_type: String,
    },

    /// Resource type is read-only and cannot be reconciled
    #[error("resource type {resource_type} is read-only")]
    NotManaged {
        /// Requested resource type
        resource_type: String,
    },

    /// Desired state violates the schema
    #[error("invalid {resource_type}.{attribute}: {reason}")]
    Validation {
        /// Resource type being validated
        resource_type: String,
        /// Attribute path (dotted for nested fields)
        attribute: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Required provider configuration is missing
    #[error("missing provider configuration: {}", .missing.join(", "))]
    MissingConfig {
        /// Every missing field, in declaration order
        missing: Vec<String>,
    },

    /// Provider configuration is present but unusable
    #[error("invalid provider configuration {field}: {reason}")]
    InvalidConfig {
        /// Offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Remote read failed
    #[error("failed to read {resource_type}{}: {source}", id_suffix(.id))]
    Read {
        /// Resource type being read
        resource_type: String,
        /// Identity being read, if any
        id: Option<String>,
        /// Operation that issued the read
        operation: Operation,
        /// Underlying remote failure
        #[source]
        source: RemoteError,
    },

    /// Remote write failed
    #[error("failed to {operation} {resource_type}{}: {source}", id_suffix(.id))]
    Write {
        /// Resource type being written
        resource_type: String,
        /// Identity being written, if known
        id: Option<String>,
        /// Operation that issued the write
        operation: Operation,
        /// Underlying remote failure
        #[source]
        source: RemoteError,
    },

    /// Remote response violates the expected contract
    #[error("protocol violation for {resource_type}{}: {reason}", id_suffix(.id))]
    Protocol {
        /// Resource type involved
        resource_type: String,
        /// Identity involved, if known
        id: Option<String>,
        /// What was wrong with the response
        reason: String,
    },

    /// An update was asked to change an attribute that forces replacement
    #[error("cannot update {resource_type} {id} in place: immutable attribute {attribute} changed")]
    ImmutableAttributeChanged {
        /// Resource type being updated
        resource_type: String,
        /// Identity being updated
        id: String,
        /// First immutable attribute in schema order that changed
        attribute: String,
        /// Remaining immutable attributes that changed
        others: Vec<String>,
    },

    /// Operation observed a cancellation or deadline
    #[error("{operation} of {resource_type}{} cancelled", id_suffix(.id))]
    Cancelled {
        /// Resource type involved
        resource_type: String,
        /// Identity involved, if known
        id: Option<String>,
        /// Operation that was interrupted
        operation: Operation,
    },

    /// Schema declaration is inconsistent
    #[error("invalid schema for {resource_type}: {reason}")]
    Schema {
        /// Resource type being declared
        resource_type: String,
        /// What is inconsistent
        reason: String,
    },
}

fn id_suffix(id: &Option<String>) -> String {
    id.as_deref().map(|i| format!(" {i}")).unwrap_or_default()
}

impl Error {
    /// Create a validation error.
    pub fn validation(
        resource_type: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            resource_type: resource_type.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema declaration error.
    pub fn schema(resource_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            resource_type: resource_type.into(),
            reason: reason.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnknownResourceType { .. }
            | Error::NotManaged { .. }
            | Error::Validation { .. } => ErrorCategory::Validation,
            Error::MissingConfig { .. } | Error::InvalidConfig { .. } => ErrorCategory::Config,
            Error::Read { .. } | Error::Write { .. } => ErrorCategory::Remote,
            Error::Protocol { .. } => ErrorCategory::Protocol,
            Error::ImmutableAttributeChanged { .. } => ErrorCategory::Caller,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
            Error::Schema { .. } => ErrorCategory::Schema,
        }
    }

    /// Whether retrying the same call can succeed.
    ///
    /// A create that failed after the backend assigned an identity is never
    /// retryable: the instance exists and a second create would duplicate it.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.created_identity().is_none() && self.category().is_retryable()
    }

    /// Identity of an instance a failed create already made remotely.
    pub fn created_identity(&self) -> Option<&str> {
        match self {
            Error::Read {
                id: Some(id),
                operation: Operation::Create,
                ..
            }
            | Error::Cancelled {
                id: Some(id),
                operation: Operation::Create,
                ..
            } => Some(id),
            _ => None,
        }
    }

    /// Resource type the error refers to, if any.
    pub fn resource_type(&self) -> Option<&str> {
        match self {
            Error::UnknownResourceType { resource_type }
            | Error::NotManaged { resource_type }
            | Error::Validation { resource_type, .. }
            | Error::Read { resource_type, .. }
            | Error::Write { resource_type, .. }
            | Error::Protocol { resource_type, .. }
            | Error::ImmutableAttributeChanged { resource_type, .. }
            | Error::Cancelled { resource_type, .. }
            | Error::Schema { resource_type, .. } => Some(resource_type),
            Error::MissingConfig { .. } | Error::InvalidConfig { .. } => None,
        }
    }

    /// Identity the error refers to, if known.
    ///
    /// A create whose follow-up read fails still reports the new identity
    /// here so the caller can record the remote resource.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Error::Read { id, .. }
            | Error::Write { id, .. }
            | Error::Protocol { id, .. }
            | Error::Cancelled { id, .. } => id.as_deref(),
            Error::ImmutableAttributeChanged { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Remote.is_retryable());
        assert!(ErrorCategory::Cancelled.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
        assert!(!ErrorCategory::Config.is_retryable());
        assert!(!ErrorCategory::Protocol.is_retryable());
        assert!(!ErrorCategory::Caller.is_retryable());
        assert!(!ErrorCategory::Schema.is_retryable());
    }

    #[test]
    fn test_error_category_advice() {
        assert!(!ErrorCategory::Protocol.advice().is_empty());
        assert!(!ErrorCategory::Caller.description().is_empty());
        assert!(format!("{}", ErrorCategory::Cancelled).contains("cancelled"));
    }

    #[test]
    fn test_cancelled_is_distinct_from_read() {
        let cancelled = Error::Cancelled {
            resource_type: "snowflake_warehouse".into(),
            id: Some("wh-1".into()),
            operation: Operation::Read,
        };
        let read = Error::Read {
            resource_type: "snowflake_warehouse".into(),
            id: Some("wh-1".into()),
            operation: Operation::Read,
            source: RemoteError::Transport("reset".into()),
        };
        assert_eq!(cancelled.category(), ErrorCategory::Cancelled);
        assert_eq!(read.category(), ErrorCategory::Remote);
        assert_eq!(cancelled.identity(), Some("wh-1"));
        assert!(cancelled.is_retryable());
        assert!(read.is_retryable());
    }

    #[test]
    fn test_create_with_identity_is_not_retryable() {
        let cancelled = Error::Cancelled {
            resource_type: "snowflake_warehouse".into(),
            id: Some("wh-1".into()),
            operation: Operation::Create,
        };
        let read = Error::Read {
            resource_type: "snowflake_warehouse".into(),
            id: Some("wh-1".into()),
            operation: Operation::Create,
            source: RemoteError::Transport("reset".into()),
        };
        assert!(!cancelled.is_retryable());
        assert!(!read.is_retryable());
        assert_eq!(read.created_identity(), Some("wh-1"));

        let before_post = Error::Cancelled {
            resource_type: "snowflake_warehouse".into(),
            id: None,
            operation: Operation::Create,
        };
        assert!(before_post.is_retryable());
        assert_eq!(before_post.created_identity(), None);
    }

    #[test]
    fn test_missing_config_lists_everything() {
        let err = Error::MissingConfig {
            missing: vec!["snowflake_account".into(), "ovh_consumer_key".into()],
        };
        let display = err.to_string();
        assert!(display.contains("snowflake_account, ovh_consumer_key"));
        assert_eq!(err.resource_type(), None);
    }

    #[test]
    fn test_display_includes_identity() {
        let err = Error::Write {
            resource_type: "snowflake_role".into(),
            id: Some("r-9".into()),
            operation: Operation::Delete,
            source: RemoteError::Status {
                status: 500,
                message: "boom".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to delete snowflake_role r-9: HTTP 500: boom"
        );

        let err = Error::Protocol {
            resource_type: "snowflake_role".into(),
            id: None,
            reason: "no identity".into(),
        };
        assert_eq!(
            err.to_string(),
            "protocol violation for snowflake_role: no identity"
        );
    }
}
