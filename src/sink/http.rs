//! HTTP/HTTPS sink.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use super::{Message, Sink};

/// Sends each message as the body of an HTTP request.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    method: Method,
}

impl HttpSink {
    /// Create a sink for `address` + `path`, e.g. `http://localhost:8080` and `/event`.
    pub fn new(address: &str, path: &str, method: &str) -> Result<Self> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {method}"))?;
        Ok(Self {
            client: reqwest::Client::new(),
            url: join_url(address, path),
            method,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

fn join_url(address: &str, path: &str) -> String {
    let address = address.trim_end_matches('/');
    if path.is_empty() {
        address.to_string()
    } else if path.starts_with('/') {
        format!("{address}{path}")
    } else {
        format!("{address}/{path}")
    }
}

#[async_trait]
impl Sink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, message: &Message) -> Result<()> {
        let mut request = self.client.request(self.method.clone(), &self.url);
        request = match &message.form {
            // reqwest sets the multipart Content-Type with its boundary
            Some(form) => request.multipart(form.to_multipart()?),
            None => request
                .header(CONTENT_TYPE, &message.content_type)
                .body(message.body.clone()),
        };
        for (name, value) in &message.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP request failed with status {status} for URL: {}", self.url);
        }

        tracing::debug!("{} {} -> {}", self.method, self.url, status);
        Ok(())
    }
}
