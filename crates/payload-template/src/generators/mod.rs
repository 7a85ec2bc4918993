//! Built-in placeholder generators.
//!
//! Every generator except `counter` and `nowtime` draws from the engine's
//! RNG, so a fixed seed reproduces their output.

pub mod record;
pub mod text;
pub mod timestamp;
pub mod uuid;

use crate::error::TemplateError;
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_CBOR: &str = "application/cbor";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_OCTET: &str = "application/octet-stream";

/// A named built-in generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generator {
    Json,
    Cbor,
    Sentiment,
    Sentence,
    /// Random timestamp within the last ten years
    DateTime,
    /// Current timestamp
    NowTime,
    /// Engine-wide incrementing counter
    Counter,
}

impl Generator {
    pub const ALL: [Generator; 7] = [
        Generator::Json,
        Generator::Cbor,
        Generator::Sentiment,
        Generator::Sentence,
        Generator::DateTime,
        Generator::NowTime,
        Generator::Counter,
    ];

    /// Placeholder name, e.g. `json` for `{{json}}`.
    pub fn name(self) -> &'static str {
        match self {
            Generator::Json => "json",
            Generator::Cbor => "cbor",
            Generator::Sentiment => "sentiment",
            Generator::Sentence => "sentence",
            Generator::DateTime => "datetime",
            Generator::NowTime => "nowtime",
            Generator::Counter => "counter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Generator::Json => CONTENT_TYPE_JSON,
            Generator::Cbor => CONTENT_TYPE_CBOR,
            Generator::Sentiment
            | Generator::Sentence
            | Generator::DateTime
            | Generator::NowTime
            | Generator::Counter => CONTENT_TYPE_TEXT,
        }
    }

    /// Produce one value.
    pub fn generate<R: Rng>(self, rng: &mut R, counter: &Counter) -> Result<Vec<u8>, TemplateError> {
        match self {
            Generator::Json => record::generate_json(rng),
            Generator::Cbor => record::generate_cbor(rng),
            Generator::Sentiment => Ok(text::generate_sentiment(rng).into_bytes()),
            Generator::Sentence => Ok(text::generate_sentence(rng).into_bytes()),
            Generator::DateTime => Ok(timestamp::generate_past(rng).into_bytes()),
            Generator::NowTime => Ok(timestamp::generate_now().into_bytes()),
            Generator::Counter => Ok(counter.next().to_string().into_bytes()),
        }
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Monotonic counter; the first call to [`Counter::next`] returns 1.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last value handed out, 0 before the first call.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_names_round_trip() {
        for generator in Generator::ALL {
            assert_eq!(Generator::from_name(generator.name()), Some(generator));
        }
        assert_eq!(Generator::from_name("unknown"), None);
        assert_eq!(Generator::from_name("JSON"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(Generator::Json.content_type(), "application/json");
        assert_eq!(Generator::Cbor.content_type(), "application/cbor");
        assert_eq!(Generator::Counter.content_type(), "text/plain");
    }

    #[test]
    fn test_counter_steps_by_one() {
        let counter = Counter::default();
        assert_eq!(counter.current(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn test_counter_generator_output() {
        let mut rng = StdRng::seed_from_u64(0);
        let counter = Counter::default();
        assert_eq!(Generator::Counter.generate(&mut rng, &counter).unwrap(), b"1");
        assert_eq!(Generator::Counter.generate(&mut rng, &counter).unwrap(), b"2");
    }
}
