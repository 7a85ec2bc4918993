//! Append-only file sink.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::{Message, Sink};

/// Appends each body followed by a newline to a file, creating it if needed.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut line = Vec::with_capacity(message.body.len() + 1);
        line.extend_from_slice(&message.body);
        line.push(b'\n');
        file.write_all(&line)
            .await
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        file.flush().await?;

        tracing::debug!("Appended {} bytes to {}", line.len(), self.path.display());
        Ok(())
    }
}
