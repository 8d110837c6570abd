//! Error handling for the layout engine
//!
//! Capability and invariant failures are construction bugs: they abort the
//! calling test with the offending type name. Comparison mismatches are not
//! errors and never show up here (see [`crate::layout::compare`]).

use thiserror::Error;

/// Layout engine result type
pub type LayoutResult<T> = Result<T, LayoutError>;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// A node kind was asked for a capability it does not have
    #[error("{type_name} does not support {operation}()")]
    Unsupported {
        type_name: String,
        operation: &'static str,
    },

    /// Internal consistency check failed while building or walking a tree
    #[error("invariant violated by {type_name}: {message}")]
    Invariant { type_name: String, message: String },

    #[error("buffer too small: {required} bytes required, {available} bytes available")]
    BufferTooSmall { required: usize, available: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LayoutError {
    pub fn unsupported(type_name: impl Into<String>, operation: &'static str) -> Self {
        LayoutError::Unsupported {
            type_name: type_name.into(),
            operation,
        }
    }

    pub fn invariant(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        LayoutError::Invariant {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for LayoutError {
    fn from(e: toml::de::Error) -> Self {
        LayoutError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for LayoutError {
    fn from(e: toml::ser::Error) -> Self {
        LayoutError::Config(e.to_string())
    }
}

/// Error context for layout operations
pub trait LayoutErrorContext<T> {
    fn layout_context(self, type_name: &str, context: &str) -> LayoutResult<T>;
}

impl<T> LayoutErrorContext<T> for Option<T> {
    fn layout_context(self, type_name: &str, context: &str) -> LayoutResult<T> {
        self.ok_or_else(|| LayoutError::invariant(type_name, context))
    }
}

impl<T, E> LayoutErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn layout_context(self, type_name: &str, context: &str) -> LayoutResult<T> {
        self.map_err(|e| LayoutError::invariant(type_name, format!("{}: {}", context, e)))
    }
}
