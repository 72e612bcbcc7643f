// SPDX-License-Identifier: MPL-2.0

use crate::backend::{AuthProvider, AuthUser, DocumentFeed, ObjectStore};
use crate::cache::LocalTable;
use crate::config::PROFILE_IMAGES_FOLDER;
use crate::media::MediaBlob;
use crate::models::{Entity, PHOTO_URL_FIELD, ProfilePatch, User};
use crate::repository::{RepoError, discard_media, media_key};
use crate::state::RetryPolicy;
use crate::sync::{SyncReconciler, SyncState};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tokio::sync::watch;

/// Digits with an optional leading `+`, loosely grouped by spaces, dashes,
/// dots or parentheses.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9()]+([ .\-]?[0-9()]+)*$").expect("phone pattern is valid")
});

/// Sign-up form.
#[derive(Debug, Clone, Default)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

fn check_name(name: &str) -> Result<(), RepoError> {
    if name.trim().is_empty() {
        return Err(RepoError::Invalid("Please enter a username"));
    }
    Ok(())
}

fn check_phone(phone: &str) -> Result<(), RepoError> {
    if !PHONE_RE.is_match(phone.trim()) {
        return Err(RepoError::Invalid("Please enter a valid phone number"));
    }
    Ok(())
}

pub struct UserRepository {
    feed: Arc<dyn DocumentFeed>,
    storage: Arc<dyn ObjectStore>,
    auth: Arc<dyn AuthProvider>,
    table: Arc<dyn LocalTable<User>>,
    sync: SyncReconciler<User>,
}

impl UserRepository {
    pub fn new(
        feed: Arc<dyn DocumentFeed>,
        storage: Arc<dyn ObjectStore>,
        auth: Arc<dyn AuthProvider>,
        table: Arc<dyn LocalTable<User>>,
        retry: RetryPolicy,
    ) -> Self {
        let sync = SyncReconciler::new(feed.clone(), table.clone(), retry);
        Self {
            feed,
            storage,
            auth,
            table,
            sync,
        }
    }

    pub async fn start(&self) -> Result<(), RepoError> {
        Ok(self.sync.start().await?)
    }

    pub async fn stop(&self) {
        self.sync.stop().await;
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    /// All cached profiles, by name.
    pub fn users(&self) -> watch::Receiver<Vec<User>> {
        self.sync.watch()
    }

    pub fn get_local(&self, uid: &str) -> Result<Option<User>, RepoError> {
        Ok(self.table.get(uid)?)
    }

    pub fn get_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .table
            .get_by_secondary_key(email.trim())?
            .into_iter()
            .next())
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.auth.current_user()
    }

    /// Create the account, upload the profile photo, then write the profile.
    /// A failed profile write discards the photo; the account itself stays.
    pub async fn sign_up(&self, form: SignUp, photo: Option<MediaBlob>) -> Result<User, RepoError> {
        check_name(&form.name)?;
        check_phone(&form.phone)?;

        let account = self.auth.create_user(&form.email, &form.password).await?;
        tracing::info!(uid = %account.uid, "account created");

        let photo_url = match photo {
            Some(blob) => Some(
                self.storage
                    .upload(&media_key(PROFILE_IMAGES_FOLDER, &account.uid), blob)
                    .await
                    .map_err(RepoError::Upload)?,
            ),
            None => None,
        };

        let user = User {
            id: account.uid,
            name: form.name,
            phone: form.phone,
            photo_url,
            email: account.email,
            credential: String::new(),
        };
        if let Err(e) = self
            .feed
            .set(User::COLLECTION, &user.id, user.to_document())
            .await
        {
            if let Some(url) = &user.photo_url {
                discard_media(self.storage.as_ref(), url).await;
            }
            return Err(e.into());
        }

        tracing::info!(uid = %user.id, "profile stored");
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, RepoError> {
        let user = self.auth.sign_in(email, password).await?;
        tracing::info!(uid = %user.uid, "signed in");
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), RepoError> {
        self.auth.sign_out().await?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Edit a profile; a new photo replaces the old one like a post image.
    pub async fn update_profile(
        &self,
        uid: &str,
        patch: ProfilePatch,
        photo: Option<MediaBlob>,
    ) -> Result<(), RepoError> {
        if let Some(name) = &patch.name {
            check_name(name)?;
        }
        if let Some(phone) = &patch.phone {
            check_phone(phone)?;
        }
        if patch.is_empty() && photo.is_none() {
            return Ok(());
        }

        let mut fields = patch.to_document();
        if let Some(blob) = photo {
            if let Some(old) = self.photo_url(uid).await? {
                discard_media(self.storage.as_ref(), &old).await;
            }
            let url = self
                .storage
                .upload(&media_key(PROFILE_IMAGES_FOLDER, uid), blob)
                .await
                .map_err(RepoError::Upload)?;
            fields.insert(PHOTO_URL_FIELD.to_string(), Value::String(url));
        }

        self.feed.update(User::COLLECTION, uid, fields).await?;
        tracing::info!(uid, "profile updated");
        Ok(())
    }

    async fn photo_url(&self, uid: &str) -> Result<Option<String>, RepoError> {
        let table = self.table.clone();
        let cached_id = uid.to_string();
        if let Some(user) = tokio::task::spawn_blocking(move || table.get(&cached_id)).await?? {
            return Ok(user.photo_url);
        }

        let document = self
            .feed
            .get(User::COLLECTION, uid)
            .await?
            .ok_or_else(|| RepoError::NotFound {
                kind: User::KIND,
                id: uid.to_string(),
            })?;
        Ok(document
            .get(PHOTO_URL_FIELD)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string))
    }
}
