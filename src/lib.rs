// SPDX-License-Identifier: MPL-2.0

//! HelpHero data layer.
//!
//! Posts, comments and user profiles live in a hosted document feed. Each kind
//! is mirrored into a local SQLite cache by a [`sync::SyncReconciler`], and the
//! [`repository`] façades send mutations to the hosted services while serving
//! reads from the cache.

pub mod app;
pub mod backend;
pub mod cache;
pub mod config;
pub mod media;
pub mod models;
pub mod repository;
pub mod runtime;
pub mod state;
pub mod sync;

pub use app::{Backend, HelpHero};
