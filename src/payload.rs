//! Payload building: template rendering, content type selection and the
//! `name=value` parsers used for variables and headers.

use anyhow::{bail, Context};
use payload_template::{Delimiters, TemplateEngine};
use std::collections::{BTreeMap, HashMap};

pub use payload_template::{
    CONTENT_TYPE_CBOR as CT_CBOR, CONTENT_TYPE_JSON as CT_JSON,
    CONTENT_TYPE_OCTET as CT_OCTET, CONTENT_TYPE_TEXT as CT_TEXT,
};

/// A rendered message body and the content type to send it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub body: Vec<u8>,
    pub content_type: String,
}

/// Render `raw` and pick its content type.
///
/// A non-empty `mime` hint always wins. Otherwise a template that is exactly
/// one generator placeholder takes that generator's type, and anything else
/// is sniffed from the rendered bytes with [`guess_mime`].
pub fn build_payload(
    engine: &TemplateEngine,
    raw: &str,
    mime: &str,
    delims: &Delimiters,
) -> anyhow::Result<Payload> {
    let rendered = engine
        .render(raw, delims)
        .context("Failed to build payload")?;

    let content_type = if !mime.is_empty() {
        mime.to_string()
    } else if let Some(content_type) = rendered.content_type() {
        content_type.to_string()
    } else {
        guess_mime(&rendered.bytes).to_string()
    };

    Ok(Payload {
        body: rendered.bytes,
        content_type,
    })
}

/// Guess a content type from the leading bytes of a body.
///
/// Leading whitespace is skipped. JSON is recognised by a first byte of `{`
/// or `[`. CBOR is recognised by a first byte of major type 2-6 (byte/text string, array,
/// map, tag) or a false/true/null/undefined simple value. This is a byte
/// pattern heuristic only: ordinary text starting with a letter also matches
/// the CBOR text-string range.
pub fn guess_mime(body: &[u8]) -> &'static str {
    let trimmed = body.trim_ascii_start();
    match trimmed.first() {
        None => CT_TEXT,
        Some(b'{') | Some(b'[') => CT_JSON,
        Some(&first) if looks_like_cbor(first) => CT_CBOR,
        Some(_) => CT_TEXT,
    }
}

fn looks_like_cbor(initial: u8) -> bool {
    let major = initial >> 5;
    (2..=6).contains(&major) || (0xf4..=0xf7).contains(&initial)
}

/// Parse `name=value` template variables.
///
/// The name is trimmed, the value is kept verbatim.
pub fn parse_template_vars(vars: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut parsed = HashMap::with_capacity(vars.len());
    for var in vars {
        let Some((name, value)) = var.split_once('=') else {
            bail!("Invalid template variable '{var}', expected name=value");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid template variable '{var}': empty name");
        }
        parsed.insert(name.to_string(), value.to_string());
    }
    Ok(parsed)
}

/// Parse `name=value` headers, interpolating each value.
///
/// Both name and value are trimmed.
pub fn parse_headers(
    engine: &TemplateEngine,
    headers: &[String],
    delims: &Delimiters,
) -> anyhow::Result<BTreeMap<String, String>> {
    let mut parsed = BTreeMap::new();
    for header in headers {
        let Some((name, value)) = header.split_once('=') else {
            bail!("Invalid header '{header}', expected name=value");
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid header '{header}': empty name");
        }
        let value = engine
            .interpolate(value.trim(), delims)
            .with_context(|| format!("Failed to interpolate header '{name}'"))?;
        parsed.insert(
            name.to_string(),
            String::from_utf8_lossy(&value).into_owned(),
        );
    }
    Ok(parsed)
}
