//! Error types for the manuscript pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for manuscript-forge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Renderer stage that exceeded its time bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    /// Acquiring a renderer session.
    Launch,
    /// Handing the layout document over and producing PDF bytes.
    Conversion,
}

impl std::fmt::Display for RenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderStage::Launch => f.write_str("launch"),
            RenderStage::Conversion => f.write_str("conversion"),
        }
    }
}

/// Everything that can go wrong between a request and a stored PDF.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting is unknown or out of range.
    #[error("invalid setting `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    /// The manuscript body is empty after trimming.
    #[error("manuscript content is empty")]
    EmptyContent,

    /// A file name would escape the output directory.
    #[error("unsafe file name: {0:?}")]
    UnsafeFilename(String),

    /// The renderer could not be started.
    #[error("renderer failed to launch: {0}")]
    RendererLaunch(String),

    /// The renderer rejected the content or failed while producing output.
    #[error("renderer failed: {0}")]
    Render(String),

    /// A renderer stage did not finish within its bound.
    #[error("renderer {stage} timed out after {}ms", timeout.as_millis())]
    RendererTimeout { stage: RenderStage, timeout: Duration },

    /// Writing, reading or inspecting an output file failed.
    #[error("file system error at {}: {source}", path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A requested download does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// JSON (de)serialisation failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all.
    #[error("{0}")]
    Unknown(String),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// True for errors detected before any renderer or file was touched.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. } | Error::EmptyContent | Error::UnsafeFilename(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_field() {
        let err = Error::invalid("fontSize", "must be between 6 and 72");
        assert_eq!(
            err.to_string(),
            "invalid setting `fontSize`: must be between 6 and 72"
        );
    }

    #[test]
    fn timeout_display() {
        let err = Error::RendererTimeout {
            stage: RenderStage::Launch,
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "renderer launch timed out after 1500ms");
    }

    #[test]
    fn client_errors() {
        assert!(Error::EmptyContent.is_client_error());
        assert!(Error::UnsafeFilename("../x".into()).is_client_error());
        assert!(!Error::Render("boom".into()).is_client_error());
    }
}
