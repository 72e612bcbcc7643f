// SPDX-License-Identifier: MPL-2.0

//! Entity kinds and their mapping to and from remote documents.
//!
//! Each kind has a remote document shape (camelCase JSON object, keyed by
//! document id) and a local row shape (these structs). The mapping is lossless
//! at millisecond timestamp precision.

mod comment;
mod post;
mod user;

pub use comment::{Comment, CommentPatch};
pub use post::{CommentSummary, IMAGE_URL_FIELD, Post, PostPatch};
pub use user::{PHOTO_URL_FIELD, ProfilePatch, User};

use crate::backend::{Direction, Document, OrderBy};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("malformed document {id}: {source}")]
    Malformed {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("document {id} has invalid timestamp {value:?}")]
    InvalidTimestamp { id: String, value: String },
}

/// A kind of synced entity: one remote collection, one local table.
pub trait Entity: std::fmt::Debug + Clone + Send + Sync + 'static {
    /// Short name used in logs
    const KIND: &'static str;
    const COLLECTION: &'static str;
    /// Field the remote subscription is ordered by
    const ORDER_FIELD: &'static str;
    const ORDER_DIRECTION: Direction;

    fn id(&self) -> &str;

    fn from_document(id: &str, document: &Document) -> Result<Self, ModelError>;

    fn to_document(&self) -> Document;

    fn order() -> OrderBy {
        OrderBy::new(Self::ORDER_FIELD, Self::ORDER_DIRECTION)
    }
}

/// Current time truncated to the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Fixed-width RFC 3339 so lexical order equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(id: &str, value: &str) -> Result<DateTime<Utc>, ModelError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ModelError::InvalidTimestamp {
            id: id.to_string(),
            value: value.to_string(),
        })
}

fn decode<T: DeserializeOwned>(id: &str, document: &Document) -> Result<T, ModelError> {
    serde_json::from_value(Value::Object(document.clone())).map_err(|source| {
        ModelError::Malformed {
            id: id.to_string(),
            source,
        }
    })
}

fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Empty strings stand for "no media" in older documents.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
