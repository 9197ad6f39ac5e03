use thiserror::Error;

/// Coarse classification of [`PipelineError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Shape,
    Io,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Resolution level {level} not found in dataset {dataset}")]
    MissingResolutionLevel { dataset: String, level: usize },

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Unknown palette: {0}")]
    UnknownPalette(String),

    #[error("Degenerate display window: min={min}, max={max}")]
    DegenerateWindow { min: f64, max: f64 },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Array store error at {path}: {message}")]
    Store { path: String, message: String },

    #[error("Failed to read metadata from {path}: {message}")]
    Metadata { path: String, message: String },

    #[error("Video sink error for {path}: {message}")]
    VideoSink { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_)
            | Self::MissingResolutionLevel { .. }
            | Self::UnknownChannel(_)
            | Self::UnknownPalette(_)
            | Self::DegenerateWindow { .. } => ErrorKind::Configuration,
            Self::Shape(_) => ErrorKind::Shape,
            Self::Store { .. } | Self::Metadata { .. } | Self::VideoSink { .. } | Self::Io(_) => {
                ErrorKind::Io
            }
        }
    }

    pub(crate) fn store(path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Store {
            path: path.into(),
            message: error.to_string(),
        }
    }

    pub(crate) fn video_sink(path: impl AsRef<std::path::Path>, error: impl std::fmt::Display) -> Self {
        Self::VideoSink {
            path: path.as_ref().display().to_string(),
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Append location context (dataset, channel, time index) to the message.
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Self::Configuration(message) => Self::Configuration(format!("{message} ({context})")),
            Self::Shape(message) => Self::Shape(format!("{message} ({context})")),
            Self::Store { path, message } => Self::Store {
                path,
                message: format!("{message} ({context})"),
            },
            Self::Metadata { path, message } => Self::Metadata {
                path,
                message: format!("{message} ({context})"),
            },
            Self::VideoSink { path, message } => Self::VideoSink {
                path,
                message: format!("{message} ({context})"),
            },
            other => other,
        }
    }
}
