//! Error types for template interpolation.

use std::path::PathBuf;

/// Broad category of a [`TemplateError`].
///
/// Callers use this to decide whether a failure is worth retrying (never for
/// `Malformed` or `Policy`) or only worth reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The template itself is broken; fixing the template fixes the error.
    Malformed,
    /// A file read was refused by the sandbox.
    Policy,
    /// The filesystem rejected a read.
    Io,
    /// A generator could not encode its output.
    Encoding,
}

/// Error type for template operations.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Delimiters must be non-empty
    #[error("template delimiters must not be empty")]
    EmptyDelimiter,

    /// A `raw:` or `str:` wrapper without a closing delimiter
    #[error("unclosed placeholder at position {position}")]
    UnclosedPlaceholder { position: usize },

    /// A bare `file:` placeholder without a closing delimiter
    #[error("unclosed file placeholder at position {position}")]
    UnclosedFilePlaceholder { position: usize },

    /// A `file:` placeholder with nothing after the prefix
    #[error("empty file path in placeholder at position {position}")]
    EmptyFilePath { position: usize },

    /// File placeholders used while file reads are disabled
    #[error("file reads are disabled: enable them with --allow-file-reads")]
    FileReadsDisabled,

    /// The requested file is not below the configured root
    #[error("file {} outside allowed root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    /// The path could not be made absolute
    #[error("invalid file path {}: {source}", path.display())]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filesystem read failed
    #[error("failed to read file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generator output could not be serialized
    #[error("failed to encode {format} payload: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },
}

impl TemplateError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::EmptyDelimiter
            | TemplateError::UnclosedPlaceholder { .. }
            | TemplateError::UnclosedFilePlaceholder { .. }
            | TemplateError::EmptyFilePath { .. } => ErrorKind::Malformed,
            TemplateError::FileReadsDisabled | TemplateError::OutsideRoot { .. } => {
                ErrorKind::Policy
            }
            TemplateError::InvalidPath { .. } | TemplateError::Read { .. } => ErrorKind::Io,
            TemplateError::Encode { .. } => ErrorKind::Encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            TemplateError::UnclosedPlaceholder { position: 3 }.kind(),
            ErrorKind::Malformed
        );
        assert_eq!(TemplateError::FileReadsDisabled.kind(), ErrorKind::Policy);
        let read = TemplateError::Read {
            path: PathBuf::from("/missing"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(read.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_messages_carry_position() {
        let err = TemplateError::UnclosedFilePlaceholder { position: 12 };
        assert_eq!(err.to_string(), "unclosed file placeholder at position 12");
    }
}
