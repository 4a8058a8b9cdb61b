//! Error types.
//!
//! - `ParamError`: everything the record/projection/sweep/instantiation core can
//!   report. All failures are deterministic given the same input.
//! - `AppError`: what the `params` binary reports (message + process exit code).

use std::path::PathBuf;

/// Library result alias.
pub type Result<T, E = ParamError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    /// A required field is missing, or a name does not refer to a declared field.
    #[error("Field error at '{path}': {message}")]
    Field { path: String, message: String },

    /// A union field could not be narrowed to one concrete type.
    #[error("Cannot resolve union {union} for field '{path}': {reason}")]
    TypeResolution {
        path: String,
        union: String,
        reason: String,
    },

    /// Two distinct paths map to the same flattened key.
    #[error("Flattened key collision on '{key}'")]
    FlattenCollision { key: String },

    /// A discriminator names no registered target.
    #[error("Unknown target '{name}' (field '{path}')")]
    Resolution { name: String, path: String },

    /// A required constructor parameter was supplied by neither record nor overrides.
    #[error("Target '{target}' is missing required argument '{param}' (record '{path}')")]
    MissingArgument {
        target: String,
        param: String,
        path: String,
    },

    /// The target itself rejected the assembled arguments.
    #[error("Target '{target}' failed for record '{path}': {message}")]
    Construction {
        target: String,
        path: String,
        message: String,
    },

    /// A value does not match the declared field type.
    #[error("Invalid value at '{path}': expected {expected}, found {found}")]
    Validation {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Empty settings list at '{path}'")]
    EmptySettings { path: String },

    #[error("Sweep has {count} combinations, more than the allowed {limit}")]
    TooManyCombinations { count: String, limit: usize },

    #[error("Invalid flattening separator {sep:?}")]
    InvalidSeparator { sep: String },

    /// JSON/YAML parse or render failure.
    #[error("{format} error: {message}")]
    Format {
        format: &'static str,
        message: String,
    },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParamError {
    pub fn field(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Field {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn validation(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::Validation {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code used by the binary for this error.
    ///
    /// - 2: bad input (config files, flags, schema mismatches)
    /// - 3: resolution/instantiation failures
    /// - 4: filesystem failures
    pub fn exit_code(&self) -> u8 {
        match self {
            ParamError::Resolution { .. }
            | ParamError::MissingArgument { .. }
            | ParamError::Construction { .. }
            | ParamError::TypeResolution { .. } => 3,
            ParamError::Io { .. } => 4,
            _ => 2,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ParamError> for AppError {
    fn from(err: ParamError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_errors_map_to_exit_codes() {
        let err = ParamError::MissingArgument {
            target: "PointAdder".into(),
            param: "y".into(),
            path: "<root>".into(),
        };
        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 3);
        assert!(app.to_string().contains("'y'"));

        let app: AppError = ParamError::FlattenCollision { key: "a.b".into() }.into();
        assert_eq!(app.exit_code(), 2);
    }
}
