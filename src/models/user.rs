// SPDX-License-Identifier: MPL-2.0

use crate::backend::{Direction, Document};
use crate::config::USERS_COLLECTION;
use crate::models::{Entity, ModelError, decode, into_document, non_empty};
use serde::Deserialize;
use serde_json::{Value, json};

pub const PHOTO_URL_FIELD: &str = "photoUrl";

/// A user profile. The id is the auth uid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub photo_url: Option<String>,
    pub email: String,
    /// Opaque placeholder kept for older documents; never holds a real secret.
    pub credential: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    photo_url: Option<String>,
    email: String,
    #[serde(default)]
    credential: String,
}

impl Entity for User {
    const KIND: &'static str = "user";
    const COLLECTION: &'static str = USERS_COLLECTION;
    const ORDER_FIELD: &'static str = "name";
    const ORDER_DIRECTION: Direction = Direction::Ascending;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_document(id: &str, document: &Document) -> Result<Self, ModelError> {
        let doc: UserDocument = decode(id, document)?;
        Ok(User {
            id: id.to_string(),
            name: doc.name,
            phone: doc.phone,
            photo_url: non_empty(doc.photo_url),
            email: doc.email,
            credential: doc.credential,
        })
    }

    fn to_document(&self) -> Document {
        let mut doc = into_document(json!({
            "name": self.name,
            "phone": self.phone,
            "email": self.email,
            "credential": self.credential,
        }));
        if let Some(url) = &self.photo_url {
            doc.insert(PHOTO_URL_FIELD.to_string(), Value::String(url.clone()));
        }
        doc
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none()
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(name) = &self.name {
            doc.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(phone) = &self.phone {
            doc.insert("phone".to_string(), Value::String(phone.clone()));
        }
        doc
    }
}
