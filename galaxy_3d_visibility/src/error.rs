//! Error types for the Galaxy3D visibility core
//!
//! Per-frame octree and view phases never fail: malformed input degrades to
//! an empty result. Errors only surface from resource descriptions, worker
//! pool creation and the draw submission layer.

use std::fmt;

/// Result type for Galaxy3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Failure reported by the draw submission layer
    BackendError(String),

    /// Invalid resource description (material, technique, pass)
    InvalidResource(String),

    /// Initialization failed (worker pool, subsystems)
    InitializationFailed(String),

    /// Configuration value rejected
    InvalidConfig(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an error and build an `Error` from the same message.
///
/// Defaults to `Error::BackendError`; prefix the source with a variant name
/// and `@` to pick another kind.
///
/// # Example
///
/// ```ignore
/// let err = engine_err!("galaxy3d::View", "Submission failed for pass {}", name);
/// let err = engine_err!(InvalidResource @ "galaxy3d::Material", "No techniques");
/// ```
#[macro_export]
macro_rules! engine_err {
    ($kind:ident @ $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::$kind(message)
    }};
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::BackendError(message)
    }};
}

/// Log an error and return early with `Err(..)` built by `engine_err!`
#[macro_export]
macro_rules! engine_bail {
    ($kind:ident @ $source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($kind @ $source, $($arg)*))
    };
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
