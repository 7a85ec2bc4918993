//! Template interpolation and test payload generation for eventkit.
//!
//! Every eventkit sender builds its message body by running the user's
//! `--payload` template through a [`TemplateEngine`] once per tick.
//!
//! # Architecture
//!
//! ```text
//!  template string
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │    TemplateEngine    │
//! │                      │
//! │  1. var:name         │◄── variables (RwLock)
//! │  2. raw:… / str:…    │
//! │  3. bare generators  │◄── rng (seeded StdRng), counter (atomic)
//! │  4. file:path        │◄── FilePolicy + FileCache
//! └──────────┬───────────┘
//!            │
//!            ▼
//!   Rendered { bytes, generator }
//! ```
//!
//! # Example
//!
//! ```rust
//! use payload_template::{Delimiters, TemplateEngine};
//!
//! let engine = TemplateEngine::builder()
//!     .seed(42)
//!     .var("device", "sensor-1")
//!     .build();
//!
//! let body = engine
//!     .interpolate(
//!         r#"{"device":{{str:var:device}},"seq":{{counter}}}"#,
//!         &Delimiters::default(),
//!     )
//!     .unwrap();
//! assert_eq!(body, br#"{"device":"sensor-1","seq":1}"#);
//! ```
//!
//! # Placeholders
//!
//! - `{{json}}`, `{{cbor}}` - random record (id, name, value, active, time)
//! - `{{sentence}}` - random sentence
//! - `{{sentiment}}` - `<opener> <adjective> <object>` phrase
//! - `{{datetime}}` - random RFC 3339 timestamp within the last ten years
//! - `{{nowtime}}` - current RFC 3339 timestamp
//! - `{{counter}}` - incrementing counter starting at 1
//! - `{{var:name}}` - template variable, empty when unknown
//! - `{{file:path}}` - file content, only when file reads are allowed
//! - `{{raw:expr}}` / `{{str:expr}}` - re-resolve `expr` per occurrence,
//!   `str:` emits it as a JSON string literal
//!
//! All occurrences of one bare generator placeholder share a single value per
//! call, while each wrapper occurrence is generated anew.

pub mod delimiters;
pub mod engine;
pub mod error;
pub mod generators;
pub mod sandbox;
mod segments;

// Re-exports for convenience
pub use delimiters::{Delimiters, DEFAULT_CLOSE, DEFAULT_OPEN};
pub use engine::{Rendered, TemplateEngine, TemplateEngineBuilder};
pub use error::{ErrorKind, TemplateError};
pub use generators::{
    Generator, CONTENT_TYPE_CBOR, CONTENT_TYPE_JSON, CONTENT_TYPE_OCTET, CONTENT_TYPE_TEXT,
};
pub use sandbox::{FileCache, FilePolicy};
