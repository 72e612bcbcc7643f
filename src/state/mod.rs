// SPDX-License-Identifier: MPL-2.0

pub mod settings;

pub use settings::{AppSettings, MediaSettings, RetryPolicy, StorageSettings, SyncSettings};
