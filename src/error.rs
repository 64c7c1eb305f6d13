//! Error types for challenge operations

use std::fmt;

use thiserror::Error;

/// Error reported by a DNS provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Transport, timeout, authentication, rate limit or server-side failure
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider detected a concurrent modification of the record set
    #[error("record set conflict: {0}")]
    Conflict(String),

    /// The provider refused the request as invalid
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

/// Step of a challenge operation that touched the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveZone,
    ReadRecordSet,
    WriteRecordSet,
    DeleteRecordSet,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::ResolveZone => "resolve zone",
            Step::ReadRecordSet => "read record set",
            Step::WriteRecordSet => "write record set",
            Step::DeleteRecordSet => "delete record set",
        };
        f.write_str(s)
    }
}

/// Error returned by the challenge handler, resolver and reconciler
#[derive(Debug, Error)]
pub enum ChallengeError {
    /// Rejected before any provider call
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// No zone in the account owns the challenge name
    #[error("no zone found for {fqdn}")]
    ZoneNotFound { fqdn: String },

    /// A provider call failed during `step`
    #[error("{step} failed: {source}")]
    Provider {
        step: Step,
        #[source]
        source: ProviderError,
    },
}

/// Coarse classification of a [`ChallengeError`], used for status codes and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ZoneNotFound,
    ProviderUnavailable,
    RecordSetConflict,
    ProviderRejected,
    MalformedRequest,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ZoneNotFound => "zone_not_found",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::RecordSetConflict => "record_set_conflict",
            ErrorKind::ProviderRejected => "provider_rejected",
            ErrorKind::MalformedRequest => "malformed_request",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ChallengeError {
    /// Wraps a provider error with the step that produced it
    pub fn provider(step: Step, source: ProviderError) -> Self {
        ChallengeError::Provider { step, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChallengeError::MalformedRequest(_) => ErrorKind::MalformedRequest,
            ChallengeError::ZoneNotFound { .. } => ErrorKind::ZoneNotFound,
            ChallengeError::Provider { source, .. } => match source {
                ProviderError::Unavailable(_) => ErrorKind::ProviderUnavailable,
                ProviderError::Conflict(_) => ErrorKind::RecordSetConflict,
                ProviderError::Rejected(_) => ErrorKind::ProviderRejected,
            },
        }
    }

    /// The step that failed, if a provider call was involved
    pub fn step(&self) -> Option<Step> {
        match self {
            ChallengeError::Provider { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Whether retrying the whole operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ProviderUnavailable | ErrorKind::RecordSetConflict
        )
    }
}
