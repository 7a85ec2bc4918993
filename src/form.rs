//! multipart/form-data bodies for the HTTP sink.
//!
//! Form fields are `name=value` pairs whose values are run through the
//! template engine. Files are `name=path` pairs read from disk on every
//! build, so each send picks up the current content.

use anyhow::{bail, Context};
use payload_template::{Delimiters, TemplateEngine};
use reqwest::multipart::{Form, Part};
use std::path::Path;

use crate::payload::CT_OCTET;

pub const CT_MULTIPART: &str = "multipart/form-data";

/// A multipart body: text fields first, then files, in flag order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FormFile>,
}

/// One file part of a [`FormData`].
#[derive(Debug, Clone, PartialEq)]
pub struct FormFile {
    pub name: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl FormData {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// Convert into a `reqwest` form. File parts are sent as
    /// `application/octet-stream`.
    pub fn to_multipart(&self) -> anyhow::Result<Form> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let part = Part::bytes(file.content.clone())
                .file_name(file.file_name.clone())
                .mime_str(CT_OCTET)
                .context("Invalid multipart content type")?;
            form = form.part(file.name.clone(), part);
        }
        Ok(form)
    }
}

/// Build a form from `name=value` fields and `name=path` files.
///
/// Field values are interpolated with `engine`. File paths are taken as given;
/// they come from the command line, not from a template.
pub fn build_form(
    engine: &TemplateEngine,
    fields: &[String],
    files: &[String],
    delims: &Delimiters,
) -> anyhow::Result<FormData> {
    let mut form = FormData::default();

    for field in fields {
        let (name, value) = split_pair(field, "form field", "name=value")?;
        let value = engine
            .interpolate(value, delims)
            .with_context(|| format!("Failed to interpolate form field '{name}'"))?;
        form.fields
            .push((name.to_string(), String::from_utf8_lossy(&value).into_owned()));
    }

    for file in files {
        let (name, path) = split_pair(file, "file", "name=path")?;
        let path = Path::new(path);
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read file '{}'", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        form.files.push(FormFile {
            name: name.to_string(),
            file_name,
            content,
        });
    }

    Ok(form)
}

fn split_pair<'a>(raw: &'a str, what: &str, expected: &str) -> anyhow::Result<(&'a str, &'a str)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("Invalid {what} '{raw}', expected {expected}");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid {what} '{raw}': empty name");
    }
    Ok((name, value))
}
