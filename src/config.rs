// SPDX-License-Identifier: MPL-2.0

pub const APP_ID: &str = "io.github.helphero.HelpHero";
pub const APP_NAME: &str = "HelpHero";

#[cfg(feature = "devel")]
pub const IS_DEVEL: bool = true;
#[cfg(not(feature = "devel"))]
pub const IS_DEVEL: bool = false;

/// Public Nominatim instance used for location search
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
/// Nominatim rejects requests without an identifying agent
pub const USER_AGENT: &str = concat!("HelpHero/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_STORAGE_URL: &str = "http://localhost:9199/helphero";

/// Remote collection names, one per entity kind
pub const POSTS_COLLECTION: &str = "posts";
pub const COMMENTS_COLLECTION: &str = "comments";
pub const USERS_COLLECTION: &str = "users";

/// Object storage folders for uploaded media
pub const POST_IMAGES_FOLDER: &str = "posts";
pub const PROFILE_IMAGES_FOLDER: &str = "users";
