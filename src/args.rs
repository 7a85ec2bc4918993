//! CLI argument definitions shared by the eventkit commands.

use crate::payload::parse_template_vars;
use anyhow::Context;
use clap::Args;
use payload_template::{Delimiters, TemplateEngine, DEFAULT_CLOSE, DEFAULT_OPEN};
use std::path::PathBuf;

/// Template engine configuration.
#[derive(Args, Clone, Debug)]
pub struct TemplateArgs {
    /// Opening delimiter for template placeholders
    #[arg(long, default_value = DEFAULT_OPEN)]
    pub template_open: String,

    /// Closing delimiter for template placeholders
    #[arg(long, default_value = DEFAULT_CLOSE)]
    pub template_close: String,

    /// Random seed for deterministic generation (0 = random)
    #[arg(long, env = "EVENTKIT_SEED", default_value = "0")]
    pub seed: u64,

    /// Allow {{file:...}} placeholders to read from disk
    #[arg(long)]
    pub allow_file_reads: bool,

    /// Template variable in name=value form (repeatable)
    #[arg(long = "template-var", value_name = "NAME=VALUE")]
    pub template_vars: Vec<String>,

    /// Only allow file placeholders below this directory
    #[arg(long, env = "EVENTKIT_FILE_ROOT")]
    pub file_root: Option<PathBuf>,

    /// Cache file contents for the lifetime of the process
    #[arg(long)]
    pub cache_files: bool,
}

impl TemplateArgs {
    pub fn delimiters(&self) -> anyhow::Result<Delimiters> {
        Delimiters::new(&self.template_open, &self.template_close)
            .context("Invalid template delimiters")
    }

    /// Build the engine described by these flags.
    pub fn build_engine(&self) -> anyhow::Result<TemplateEngine> {
        let vars = parse_template_vars(&self.template_vars).context("Invalid --template-var")?;

        let mut builder = TemplateEngine::builder()
            .allow_file_reads(self.allow_file_reads)
            .cache_files(self.cache_files)
            .vars(vars);
        if self.seed != 0 {
            builder = builder.seed(self.seed);
        }
        if let Some(root) = &self.file_root {
            builder = builder.file_root(root);
        }

        tracing::debug!(
            seed = self.seed,
            allow_file_reads = self.allow_file_reads,
            cache_files = self.cache_files,
            "Template engine configured"
        );
        Ok(builder.build())
    }
}

/// Message body and content type.
#[derive(Args, Clone, Debug)]
pub struct PayloadArgs {
    /// Payload template
    #[arg(long, default_value = "{}")]
    pub payload: String,

    /// Content type; inferred from the payload when empty
    #[arg(long, default_value = "")]
    pub mime: String,
}

/// Send timing.
#[derive(Args, Clone, Debug)]
pub struct ScheduleArgs {
    /// Interval between sends (e.g. "500ms", "5s", "1m")
    #[arg(long, default_value = "5s")]
    pub interval: String,

    /// Send a single message and exit
    #[arg(long)]
    pub once: bool,
}

/// Message headers.
#[derive(Args, Clone, Debug, Default)]
pub struct HeaderArgs {
    /// Header in name=value form, value may contain placeholders (repeatable)
    #[arg(long = "header", short = 'H', value_name = "NAME=VALUE")]
    pub headers: Vec<String>,
}

/// multipart/form-data parts for the HTTP sink.
#[derive(Args, Clone, Debug, Default)]
pub struct FormArgs {
    /// File to upload as multipart/form-data, in name=path form (repeatable)
    #[arg(long = "file", short = 'f', value_name = "NAME=PATH")]
    pub files: Vec<String>,

    /// Form field in name=value form, value may contain placeholders (repeatable)
    #[arg(long = "form-field", value_name = "NAME=VALUE")]
    pub form_fields: Vec<String>,
}

impl FormArgs {
    /// True when the request should be sent as multipart/form-data.
    pub fn is_multipart(&self) -> bool {
        !self.files.is_empty() || !self.form_fields.is_empty()
    }
}
