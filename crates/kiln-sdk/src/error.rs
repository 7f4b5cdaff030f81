//! Error types raised by host code

/// Result type for host invokers and container operations
pub type HostResult<T> = Result<T, HostError>;

/// Failures raised by host-side members (methods, fields, constructors)
/// and by the built-in containers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// The member exists but refuses access (e.g. writing a final field)
    #[error("Illegal access: {0}")]
    IllegalAccess(String),

    /// Array or list index outside `0..len`
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Container length
        len: usize,
    },

    /// Type mismatch during conversion
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Invoker expected an argument that was not supplied
    #[error("Missing argument at position {0}")]
    MissingArgument(usize),

    /// Instance member invoked on a null target
    #[error("Null target")]
    NullTarget,

    /// A class with the same qualified name is already registered
    #[error("Class already registered: {0}")]
    DuplicateClass(String),

    /// Any other failure raised by host code
    #[error("{0}")]
    Failure(String),
}

impl From<String> for HostError {
    fn from(s: String) -> Self {
        HostError::Failure(s)
    }
}

impl From<&str> for HostError {
    fn from(s: &str) -> Self {
        HostError::Failure(s.to_string())
    }
}
