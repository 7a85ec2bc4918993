//! Message sinks.
//!
//! A [`Sink`] delivers one rendered [`Message`] per call. The `send`
//! subcommands build a single sink up front and call it once per tick.

mod file;
mod http;
mod stdout;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::form::FormData;

pub use file::FileSink;
pub use http::HttpSink;
pub use stdout::StdoutSink;

/// A rendered message ready for delivery.
///
/// When `form` is set the HTTP sink sends it as multipart/form-data in place
/// of `body`. The stdout and file sinks always write `body`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub body: Vec<u8>,
    pub content_type: String,
    pub headers: BTreeMap<String, String>,
    pub form: Option<FormData>,
}

impl Message {
    pub fn new(body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            body,
            content_type: content_type.into(),
            headers: BTreeMap::new(),
            form: None,
        }
    }

    /// A multipart message. `body` stays empty.
    pub fn multipart(form: FormData) -> Self {
        Self {
            body: Vec::new(),
            content_type: crate::form::CT_MULTIPART.to_string(),
            headers: BTreeMap::new(),
            form: Some(form),
        }
    }

    /// Payload size in bytes: the body, or the form's values and file contents.
    pub fn size(&self) -> usize {
        match &self.form {
            Some(form) => {
                let fields: usize = form.fields.iter().map(|(_, value)| value.len()).sum();
                let files: usize = form.files.iter().map(|file| file.content.len()).sum();
                fields + files
            }
            None => self.body.len(),
        }
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Destination for rendered messages.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Deliver one message.
    async fn send(&self, message: &Message) -> Result<()>;
}
