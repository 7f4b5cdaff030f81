//! Engine error types

use kiln_sdk::HostError;

use crate::introspection::permissions::PermissionsError;

/// Result type for resolution and invocation
pub type IntrospectionResult<T> = Result<T, IntrospectionError>;

/// Failures surfaced by member resolution and accessor invocation.
///
/// "No such member" is never an error: lookups return `Ok(None)` and a stale
/// call-site cache reports [`TryOutcome::Failed`](crate::TryOutcome::Failed).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntrospectionError {
    /// Two or more overloads are equally specific for the argument types
    #[error("Ambiguous method invocation: {class}.{method}, candidates: {}", .candidates.join(", "))]
    Ambiguous {
        /// Qualified name of the class searched
        class: String,
        /// Call-site signature, e.g. `foo(kiln.lang.Integer)`
        method: String,
        /// Signatures of the tied overloads
        candidates: Vec<String>,
    },

    /// The resolved member itself failed
    #[error("Invocation of '{member}' failed: {source}")]
    Invocation {
        /// Name of the offending member
        member: String,
        /// Host failure
        source: HostError,
    },

    /// Malformed permission rules
    #[error(transparent)]
    Permissions(#[from] PermissionsError),

    /// Configuration load or parse failure
    #[error("Config error: {0}")]
    Config(String),
}

impl IntrospectionError {
    pub(crate) fn invocation(member: &str, source: HostError) -> Self {
        IntrospectionError::Invocation {
            member: member.to_string(),
            source,
        }
    }

    /// Whether this is an ambiguity report
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, IntrospectionError::Ambiguous { .. })
    }

    /// The host failure behind an invocation error
    pub fn host_error(&self) -> Option<&HostError> {
        match self {
            IntrospectionError::Invocation { source, .. } => Some(source),
            _ => None,
        }
    }
}
