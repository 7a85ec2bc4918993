//! Standard output sink.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{Message, Sink};

/// Writes each body followed by a newline to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let mut out = tokio::io::stdout();
        out.write_all(&message.body)
            .await
            .context("Failed to write to stdout")?;
        out.write_all(b"\n")
            .await
            .context("Failed to write to stdout")?;
        out.flush().await.context("Failed to flush stdout")?;
        Ok(())
    }
}
