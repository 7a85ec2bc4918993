//! Fixed-shape random record, serialized as JSON or CBOR.

use super::uuid::generate_uuid_v4;
use crate::error::TemplateError;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

const FIRST_NAMES: [&str; 12] = [
    "Ada", "Alan", "Barbara", "Dennis", "Edsger", "Frances", "Grace", "John", "Ken", "Linus",
    "Margaret", "Niklaus",
];
const LAST_NAMES: [&str; 12] = [
    "Lovelace", "Turing", "Liskov", "Ritchie", "Dijkstra", "Allen", "Hopper", "Backus",
    "Thompson", "Torvalds", "Hamilton", "Wirth",
];

/// The record emitted by the `json` and `cbor` generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    /// Latitude-like float in [-90, 90].
    pub value: f64,
    pub active: bool,
    /// Unix seconds between the epoch and now.
    pub time: i64,
}

impl Record {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let first = FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.random_range(0..LAST_NAMES.len())];
        let now = Utc::now().timestamp().max(0);

        Self {
            id: generate_uuid_v4(rng).to_string(),
            name: format!("{first} {last}"),
            value: rng.random_range(-90.0..=90.0),
            active: rng.random_bool(0.5),
            time: rng.random_range(0..=now),
        }
    }
}

pub fn generate_json<R: Rng>(rng: &mut R) -> Result<Vec<u8>, TemplateError> {
    serde_json::to_vec(&Record::random(rng)).map_err(|e| TemplateError::Encode {
        format: "json",
        message: e.to_string(),
    })
}

pub fn generate_cbor<R: Rng>(rng: &mut R) -> Result<Vec<u8>, TemplateError> {
    let mut buf = Vec::new();
    ciborium::into_writer(&Record::random(rng), &mut buf).map_err(|e| TemplateError::Encode {
        format: "cbor",
        message: e.to_string(),
    })?;
    Ok(buf)
}
