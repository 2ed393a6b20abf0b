//! Guest list / event persistence on top of a [`KvStore`].
//!
//! Loading never fails: absent or corrupt entries come back as empty data
//! and corrupt entries are reset so the next load is clean.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::clock::{random_suffix, Clock};
use crate::errors::{Result, StoreError, ValidationError};
use crate::models::{ConfirmationRecord, Event, Guest};
use crate::store::{keys, KvStore};

/// Largest accepted invite image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct StoredImage {
    stored_at: DateTime<Utc>,
    content_type: String,
    data: String,
}

/// An image read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A confirmation record together with the key it was read from.
#[derive(Debug)]
pub struct StoredConfirmation {
    pub key: String,
    pub record: std::result::Result<ConfirmationRecord, String>,
}

#[derive(Clone)]
pub struct EventStore {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    image_retention: usize,
    // Serializes multi-key reads and writes made through this handle.
    lock: Arc<Mutex<()>>,
}

impl EventStore {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, image_retention: usize) -> Self {
        Self {
            kv,
            clock,
            image_retention,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn load(&self) -> (Vec<Guest>, Event) {
        let _guard = self.lock.lock().await;
        let guests: Vec<Guest> = self.read_or_reset(keys::GUESTS).await.unwrap_or_default();
        let event: Event = self.read_or_reset(keys::EVENT).await.unwrap_or_default();
        debug!(
            "Loaded {} guests, event present: {}",
            guests.len(),
            !event.is_empty()
        );
        (guests, event)
    }

    pub async fn save(&self, guests: &[Guest], event: &Event) -> Result<()> {
        let guests_json = to_json(keys::GUESTS, &guests)?;
        let event_json = to_json(keys::EVENT, event)?;

        {
            let _guard = self.lock.lock().await;
            self.kv.set(keys::GUESTS, &guests_json).await?;
            self.kv.set(keys::EVENT, &event_json).await?;
            self.kv
                .set(keys::LAST_UPDATE, &self.clock.now().to_rfc3339())
                .await?;
        }

        debug!("Saved {} guests", guests.len());
        self.prune_images().await?;
        Ok(())
    }

    /// When anything last wrote guest data or a confirmation.
    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        match self.kv.get(keys::LAST_UPDATE).await {
            Ok(Some(raw)) => DateTime::parse_from_rfc3339(&raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Ok(None) => None,
            Err(e) => {
                error!("Failed to read last update marker: {}", e);
                None
            }
        }
    }

    pub async fn touch_last_update(&self) -> Result<()> {
        self.kv
            .set(keys::LAST_UPDATE, &self.clock.now().to_rfc3339())
            .await?;
        Ok(())
    }

    /// Writes the record under its guest's mailbox slot, replacing any
    /// unconsumed earlier answer from the same guest.
    pub async fn put_confirmation(&self, record: &ConfirmationRecord) -> Result<()> {
        if !keys::is_valid_id(&record.guest_id) {
            return Err(ValidationError::InvalidGuestId(record.guest_id.clone()).into());
        }
        let key = keys::confirmation(&record.guest_id);
        let json = to_json(&key, record)?;
        self.kv.set(&key, &json).await?;
        Ok(())
    }

    pub async fn get_confirmation(&self, guest_id: &str) -> Result<Option<ConfirmationRecord>> {
        let key = keys::confirmation(guest_id);
        Ok(self
            .kv
            .get(&key)
            .await?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    /// Every pending mailbox entry. Unreadable entries are returned as errors
    /// so the caller can evict them.
    pub async fn confirmations(&self) -> Result<Vec<StoredConfirmation>> {
        let mut found = Vec::new();
        for key in self.kv.keys_with_prefix(keys::CONFIRMATION_PREFIX).await? {
            let Some(raw) = self.kv.get(&key).await? else {
                // Consumed between listing and reading.
                continue;
            };
            let record = serde_json::from_str::<ConfirmationRecord>(&raw).map_err(|e| e.to_string());
            found.push(StoredConfirmation { key, record });
        }
        Ok(found)
    }

    pub async fn remove_confirmation(&self, key: &str) -> Result<()> {
        self.kv.remove(key).await?;
        Ok(())
    }

    /// Stores image bytes and returns the key to reference them by.
    pub async fn put_image(&self, bytes: &[u8], content_type: &str) -> Result<String> {
        if !content_type.starts_with("image/") {
            return Err(ValidationError::InvalidImage(format!(
                "unsupported content type {content_type}"
            ))
            .into());
        }
        if bytes.is_empty() || bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::InvalidImage(format!(
                "size {} outside 1..={} bytes",
                bytes.len(),
                MAX_IMAGE_BYTES
            ))
            .into());
        }

        let now = self.clock.now();
        let image_key = format!("img_{}_{}", now.timestamp_millis(), random_suffix(9));
        let stored = StoredImage {
            stored_at: now,
            content_type: content_type.to_string(),
            data: STANDARD.encode(bytes),
        };
        let store_key = keys::image(&image_key);
        self.kv.set(&store_key, &to_json(&store_key, &stored)?).await?;

        info!("Stored image {} ({} bytes)", image_key, bytes.len());
        Ok(image_key)
    }

    pub async fn get_image(&self, image_key: &str) -> Result<Option<ImageBlob>> {
        if !keys::is_valid_id(image_key) {
            return Ok(None);
        }
        let Some(raw) = self.kv.get(&keys::image(image_key)).await? else {
            return Ok(None);
        };
        let blob = serde_json::from_str::<StoredImage>(&raw)
            .ok()
            .and_then(|stored| {
                STANDARD.decode(stored.data).ok().map(|bytes| ImageBlob {
                    content_type: stored.content_type,
                    bytes,
                })
            });
        if blob.is_none() {
            warn!("Image {} is unreadable", image_key);
        }
        Ok(blob)
    }

    /// Keeps only the newest `image_retention` images.
    async fn prune_images(&self) -> Result<()> {
        let mut images: Vec<(String, Option<DateTime<Utc>>)> = Vec::new();
        for key in self.kv.keys_with_prefix(keys::IMAGE_PREFIX).await? {
            let stored_at = self
                .kv
                .get(&key)
                .await?
                .and_then(|raw| serde_json::from_str::<StoredImage>(&raw).ok())
                .map(|img| img.stored_at);
            images.push((key, stored_at));
        }

        // Newest first; unreadable blobs sort last and are always dropped.
        images.sort_by(|a, b| b.1.cmp(&a.1));
        let mut kept = 0;
        for (key, stored_at) in images {
            if stored_at.is_some() && kept < self.image_retention {
                kept += 1;
                continue;
            }
            debug!("Pruning image {}", key);
            self.kv.remove(&key).await?;
        }
        Ok(())
    }

    async fn read_or_reset<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Failed to read {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Stored {} is corrupt ({}), resetting", key, e);
                if let Err(e) = self.kv.remove(key).await {
                    error!("Failed to reset {}: {}", key, e);
                }
                None
            }
        }
    }
}

fn to_json<T: Serialize + ?Sized>(key: &str, value: &T) -> std::result::Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{Decision, GuestStatus};
    use crate::store::MemoryKvStore;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn setup(retention: usize) -> (EventStore, MemoryKvStore, Arc<FixedClock>) {
        let kv = MemoryKvStore::new();
        let clock = Arc::new(FixedClock::new(start()));
        let store = EventStore::new(Arc::new(kv.clone()), clock.clone(), retention);
        (store, kv, clock)
    }

    fn sample_event() -> Event {
        Event {
            name: "Festa Junina".into(),
            date: "2025-06-21T19:00".into(),
            location: "Salão".into(),
            description: "Traje típico".into(),
        }
    }

    #[tokio::test]
    async fn load_of_empty_store_is_empty() {
        let (store, _, _) = setup(3);
        let (guests, event) = store.load().await;
        assert!(guests.is_empty());
        assert!(event.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (store, _, _) = setup(3);
        let mut guests = vec![
            Guest::new("João Silva", "11999999999", start()),
            Guest::new("Maria Santos", "11888888888", start()),
        ];
        guests[1].status = GuestStatus::Declined;

        store.save(&guests, &sample_event()).await.unwrap();
        let (loaded, event) = store.load().await;

        assert_eq!(loaded, guests);
        assert_eq!(event, sample_event());
        assert_eq!(store.last_update().await, Some(start()));
    }

    #[tokio::test]
    async fn corrupt_entries_are_reset_on_load() {
        let (store, kv, _) = setup(3);
        kv.set(keys::GUESTS, "{not json").await.unwrap();
        kv.set(keys::EVENT, "[1,2,3]").await.unwrap();

        let (guests, event) = store.load().await;
        assert!(guests.is_empty());
        assert!(event.is_empty());
        assert_eq!(kv.get(keys::GUESTS).await.unwrap(), None);
        assert_eq!(kv.get(keys::EVENT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn confirmation_slot_is_per_guest() {
        let (store, _, clock) = setup(3);
        let first = ConfirmationRecord {
            guest_id: "guest_1_a".into(),
            status: Decision::Confirmed,
            timestamp: clock.now(),
        };
        store.put_confirmation(&first).await.unwrap();
        let second = ConfirmationRecord {
            status: Decision::Declined,
            ..first.clone()
        };
        store.put_confirmation(&second).await.unwrap();

        let all = store.confirmations().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].record.as_ref().unwrap().status, Decision::Declined);
    }

    #[tokio::test]
    async fn rejects_guest_ids_that_are_not_key_safe() {
        let (store, _, clock) = setup(3);
        let record = ConfirmationRecord {
            guest_id: "a:b".into(),
            status: Decision::Confirmed,
            timestamp: clock.now(),
        };
        assert!(store.put_confirmation(&record).await.is_err());
    }

    #[tokio::test]
    async fn images_round_trip_and_validate() {
        let (store, _, _) = setup(3);
        let key = store.put_image(b"\x89PNG fake", "image/png").await.unwrap();
        assert!(key.starts_with("img_"));

        let blob = store.get_image(&key).await.unwrap().unwrap();
        assert_eq!(blob.content_type, "image/png");
        assert_eq!(blob.bytes, b"\x89PNG fake");

        assert!(store.put_image(b"text", "text/plain").await.is_err());
        assert!(store.put_image(b"", "image/png").await.is_err());
        assert_eq!(store.get_image("img_missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_prunes_images_beyond_retention() {
        let (store, kv, clock) = setup(2);
        let mut image_keys = Vec::new();
        for _ in 0..4 {
            image_keys.push(store.put_image(b"img", "image/jpeg").await.unwrap());
            clock.advance(chrono::Duration::seconds(1));
        }

        store.save(&[], &Event::default()).await.unwrap();

        let remaining = kv.keys_with_prefix(keys::IMAGE_PREFIX).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(store.get_image(&image_keys[3]).await.unwrap().is_some());
        assert!(store.get_image(&image_keys[2]).await.unwrap().is_some());
        assert!(store.get_image(&image_keys[0]).await.unwrap().is_none());
    }
}
