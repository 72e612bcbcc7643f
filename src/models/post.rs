// SPDX-License-Identifier: MPL-2.0

use crate::backend::{Direction, Document};
use crate::config::POSTS_COLLECTION;
use crate::models::{
    Entity, ModelError, decode, format_timestamp, into_document, non_empty, parse_timestamp,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const IMAGE_URL_FIELD: &str = "imageUrl";

/// Comment embedded in a post document (legacy shape, kept for old posts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSummary {
    pub comment_id: String,
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub description: String,
    /// Set once the image upload has completed
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Free-text location label
    pub location: String,
    pub comments: Vec<CommentSummary>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostDocument {
    user_id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: Option<String>,
    created_at: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    comments: Vec<CommentSummary>,
}

impl Entity for Post {
    const KIND: &'static str = "post";
    const COLLECTION: &'static str = POSTS_COLLECTION;
    const ORDER_FIELD: &'static str = "createdAt";
    const ORDER_DIRECTION: Direction = Direction::Descending;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_document(id: &str, document: &Document) -> Result<Self, ModelError> {
        let doc: PostDocument = decode(id, document)?;
        Ok(Post {
            id: id.to_string(),
            author_id: doc.user_id,
            title: doc.title,
            description: doc.description,
            image_url: non_empty(doc.image_url),
            created_at: parse_timestamp(id, &doc.created_at)?,
            location: doc.location,
            comments: doc.comments,
        })
    }

    fn to_document(&self) -> Document {
        let comments: Vec<Value> = self.comments.iter().map(CommentSummary::to_value).collect();
        let mut doc = into_document(json!({
            "userId": self.author_id,
            "title": self.title,
            "description": self.description,
            "createdAt": format_timestamp(&self.created_at),
            "location": self.location,
            "comments": comments,
        }));
        if let Some(url) = &self.image_url {
            doc.insert(IMAGE_URL_FIELD.to_string(), Value::String(url.clone()));
        }
        doc
    }
}

impl CommentSummary {
    fn to_value(&self) -> Value {
        json!({
            "commentId": self.comment_id,
            "userId": self.user_id,
            "text": self.text,
        })
    }
}

/// Owner edits to a post. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.location.is_none()
    }

    /// Field patch for a document update.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(title) = &self.title {
            doc.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(description) = &self.description {
            doc.insert("description".to_string(), Value::String(description.clone()));
        }
        if let Some(location) = &self.location {
            doc.insert("location".to_string(), Value::String(location.clone()));
        }
        doc
    }
}
