//! The persisted key-value store shared by the main context and receivers.
//!
//! Values are opaque strings (JSON in practice). A missing key always means
//! "no data" and is never an error.

use async_trait::async_trait;

use crate::errors::StoreError;

pub mod file;
pub mod memory;

pub use file::FileKvStore;
pub use memory::MemoryKvStore;

/// Key layout of the persisted store.
pub mod keys {
    pub const GUESTS: &str = "rsvp:guests";
    pub const EVENT: &str = "rsvp:event";
    pub const LAST_UPDATE: &str = "rsvp:last_update";
    pub const CONFIRMATION_PREFIX: &str = "rsvp:confirmation:";
    pub const IMAGE_PREFIX: &str = "rsvp:image:";

    pub fn confirmation(guest_id: &str) -> String {
        format!("{CONFIRMATION_PREFIX}{guest_id}")
    }

    pub fn image(image_key: &str) -> String {
        format!("{IMAGE_PREFIX}{image_key}")
    }

    /// Characters allowed in an id that becomes part of a key.
    pub fn is_valid_id(id: &str) -> bool {
        !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    pub fn is_valid_key(key: &str) -> bool {
        !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ':')
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replaces the value under `key`. Readers never observe a partial value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys starting with `prefix`, sorted.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
