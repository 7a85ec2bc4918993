//! eventkit library
//!
//! Shared plumbing for the `eventkit` CLI: argument groups, payload building,
//! send scheduling and message sinks. Template interpolation itself lives in
//! the `payload-template` crate, re-exported here as [`template`].
//!
//! # CLI Usage
//!
//! ```bash
//! # Render a template once
//! eventkit render --payload '{"seq":{{counter}},"at":{{str:nowtime}}}'
//!
//! # Append a JSON record to a file every second
//! eventkit send file --path events.log --payload '{{json}}' --interval 1s
//!
//! # POST a message with an interpolated header
//! eventkit send http --address http://localhost:8080 --path /event \
//!   --payload '{{cbor}}' -H 'X-Seq={{counter}}' --once
//!
//! # Upload a file with an interpolated form field
//! eventkit send http --file report=./report.csv --form-field 'sent={{nowtime}}' --once
//! ```

pub mod args;
pub mod form;
pub mod payload;
pub mod schedule;
pub mod sink;

pub use payload_template as template;

pub use args::{FormArgs, HeaderArgs, PayloadArgs, ScheduleArgs, TemplateArgs};
pub use form::{build_form, FormData, FormFile};
pub use payload::{build_payload, guess_mime, parse_headers, parse_template_vars, Payload};
pub use sink::{FileSink, HttpSink, Message, Sink, StdoutSink};
