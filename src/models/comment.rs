// SPDX-License-Identifier: MPL-2.0

use crate::backend::{Direction, Document};
use crate::config::COMMENTS_COLLECTION;
use crate::models::{Entity, ModelError, decode, format_timestamp, into_document, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

/// A comment on a post, synced as its own collection keyed by comment id.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentDocument {
    post_id: String,
    user_id: String,
    text: String,
    created_at: String,
}

impl Entity for Comment {
    const KIND: &'static str = "comment";
    const COLLECTION: &'static str = COMMENTS_COLLECTION;
    const ORDER_FIELD: &'static str = "createdAt";
    const ORDER_DIRECTION: Direction = Direction::Descending;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_document(id: &str, document: &Document) -> Result<Self, ModelError> {
        let doc: CommentDocument = decode(id, document)?;
        Ok(Comment {
            id: id.to_string(),
            post_id: doc.post_id,
            author_id: doc.user_id,
            text: doc.text,
            created_at: parse_timestamp(id, &doc.created_at)?,
        })
    }

    fn to_document(&self) -> Document {
        into_document(json!({
            "postId": self.post_id,
            "userId": self.author_id,
            "text": self.text,
            "createdAt": format_timestamp(&self.created_at),
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPatch {
    pub text: Option<String>,
}

impl CommentPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(text) = &self.text {
            doc.insert("text".to_string(), Value::String(text.clone()));
        }
        doc
    }
}
