// SPDX-License-Identifier: MPL-2.0

//! Contracts of the hosted backend (document feed, object storage, auth) and
//! the concrete clients this crate ships for them.

pub mod auth;
pub mod feed;
pub mod geocode;
pub mod memory;
pub mod storage;
mod types;

pub use auth::{AuthError, AuthProvider, AuthUser, MemoryAuth};
pub use feed::{DocumentFeed, FeedError, FeedEvent, Subscription};
pub use geocode::{GeocodeError, NominatimClient, Place};
pub use memory::{FeedWrite, MemoryFeed};
pub use storage::{HttpObjectStore, MemoryObjectStore, ObjectStore, StorageCall, StorageError};
pub use types::{ChangeKind, Direction, Document, DocumentChange, OrderBy};
