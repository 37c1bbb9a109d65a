/// Error types for template rendering.
use crate::ooxml::error::OoxmlError;
use crate::ooxml::opc::OpcError;
use thiserror::Error;

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Fatal errors. Any of these aborts a render before output is written.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Malformed or missing configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// `index` is the 1-based slide number as given in the configuration
    #[error("Source slide {index} out of range (template has {count} slides)")]
    SlideIndexOutOfRange { index: usize, count: usize },

    #[error("Layout '{layout}' not found in destination (searched direct layouts and master '{master}')")]
    LayoutNotFound { layout: String, master: String },

    #[error("Failed to register resource: {0}")]
    ResourceRegistration(String),

    #[error("Package error: {0}")]
    Package(#[from] OoxmlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OpcError> for TemplateError {
    fn from(err: OpcError) -> Self {
        TemplateError::Package(OoxmlError::Opc(err))
    }
}

/// Placeholder resolution failures.
///
/// These never abort a render: the placeholder stays in the output verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid path expression '{0}'")]
    InvalidPath(String),

    #[error("key '{key}' not found in '{path}'")]
    PathNotFound { path: String, key: String },

    #[error("index {index} out of range in '{path}'")]
    IndexOutOfRange { path: String, index: usize },

    #[error("'{0}' is a list or mapping, not a value")]
    NotAScalar(String),
}
