//! Placeholder delimiter pair.

use crate::error::TemplateError;

/// Default opening delimiter.
pub const DEFAULT_OPEN: &str = "{{";
/// Default closing delimiter.
pub const DEFAULT_CLOSE: &str = "}}";

/// The (open, close) markers surrounding a placeholder.
///
/// Both markers are non-empty. There is no escape sequence for a literal
/// occurrence of either marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    open: String,
    close: String,
}

impl Delimiters {
    /// Create a delimiter pair, rejecting empty markers.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, TemplateError> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() {
            return Err(TemplateError::EmptyDelimiter);
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }

    /// `{open}{prefix}`, e.g. `{{raw:`.
    pub(crate) fn prefixed(&self, prefix: &str) -> String {
        format!("{}{prefix}", self.open)
    }

    /// `{open}{name}{close}`, e.g. `{{json}}`.
    pub(crate) fn wrap(&self, name: &str) -> String {
        format!("{}{name}{}", self.open, self.close)
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
        }
    }
}
