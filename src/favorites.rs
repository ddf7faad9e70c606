//! Favorite synchronization.
//!
//! [`FavoriteSync`] mirrors the current identity's favorite collection from
//! the document store and turns toggles into store writes. It never edits
//! the mirror in response to its own writes: the next subscription snapshot
//! is the only thing that changes membership.
//!
//! ```text
//! Inactive --activate--> Subscribed --snapshot--> Subscribed
//!                            |
//!                            +--subscription error--> Error
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::AppEvent;
use crate::catalog::Entity;
use crate::identity::Identity;
use crate::storage::{Document, DocumentStore, StoreError};

/// Store collection holding `identity`'s favorites.
///
/// ```
/// use digidex::favorites::collection_path;
/// use digidex::identity::Identity;
///
/// let id = Identity::parse("u1").unwrap();
/// assert_eq!(collection_path("digidex", &id), "artifacts/digidex/users/u1/favorites");
/// ```
pub fn collection_path(app_id: &str, identity: &Identity) -> String {
    format!("artifacts/{}/users/{}/favorites", app_id, identity)
}

// ============================================================================
// Records
// ============================================================================

/// A persisted favorite. `key` is the entity name, so an entity has at most
/// one record.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteRecord {
    pub key: String,
    pub name: String,
    pub level: Option<String>,
    pub image: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Document body as stored: `{"name", "level", "img", "addedAt"}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    img: Option<String>,
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
}

impl FavoriteRecord {
    pub fn for_entity(entity: &Entity, added_at: DateTime<Utc>) -> Self {
        Self {
            key: entity.name.to_string(),
            name: entity.name.to_string(),
            level: entity.level.as_deref().map(str::to_owned),
            image: entity.image.as_deref().map(str::to_owned),
            added_at,
        }
    }

    pub fn to_body(&self) -> Value {
        let body = FavoriteBody {
            name: Some(self.name.clone()),
            level: self.level.clone(),
            img: self.image.clone(),
            added_at: Some(self.added_at),
        };
        serde_json::to_value(body).unwrap_or(Value::Null)
    }

    /// Rebuild a record from a stored document.
    ///
    /// Membership is decided by the key alone, so a body that does not
    /// decode still yields a record named after its key.
    pub fn from_document(doc: &Document) -> Self {
        let body = match serde_json::from_value::<FavoriteBody>(doc.body.clone()) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(key = %doc.key, error = %e, "Undecodable favorite document");
                FavoriteBody {
                    name: None,
                    level: None,
                    img: None,
                    added_at: None,
                }
            }
        };
        let added_at = body
            .added_at
            .or_else(|| Utc.timestamp_millis_opt(doc.updated_at).single())
            .unwrap_or_default();

        Self {
            key: doc.key.clone(),
            name: body.name.unwrap_or_else(|| doc.key.clone()),
            level: body.level,
            image: body.img,
            added_at,
        }
    }
}

// ============================================================================
// Errors and Writes
// ============================================================================

#[derive(Debug, Error)]
pub enum FavoriteError {
    /// No store, no identity yet, or the subscription has failed
    #[error("Favorites unavailable: {0}")]
    StoreUnavailable(&'static str),

    /// The store rejected the create or delete
    #[error("Favorite write failed: {0}")]
    Write(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Inactive,
    Subscribed,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Add(FavoriteRecord),
    Remove(String),
}

/// A toggle resolved against the mirror, ready to send to the store.
///
/// Owns everything it needs, so it can be committed from a spawned task
/// after the synchronizer has moved on.
pub struct PendingWrite {
    store: Arc<dyn DocumentStore>,
    collection: String,
    op: WriteOp,
}

impl PendingWrite {
    /// Send the write. The mirror is not touched; the subscription delivers
    /// the result.
    pub async fn commit(self) -> Result<WriteOp, FavoriteError> {
        match &self.op {
            WriteOp::Add(record) => {
                self.store
                    .put(&self.collection, &record.key, &record.to_body())
                    .await?
            }
            WriteOp::Remove(key) => self.store.delete(&self.collection, key).await?,
        }
        Ok(self.op)
    }
}

// ============================================================================
// Synchronizer
// ============================================================================

pub struct FavoriteSync {
    app_id: Arc<str>,
    store: Option<Arc<dyn DocumentStore>>,
    identity: Option<Identity>,
    collection: Option<String>,
    state: SyncState,
    records: Vec<Arc<FavoriteRecord>>,
    index: HashMap<String, usize>,
    /// Bumped on every (re)activation; snapshots tagged with an older
    /// generation come from a torn-down listener.
    generation: u64,
    listener: Option<JoinHandle<()>>,
}

impl FavoriteSync {
    pub fn new(app_id: &str, store: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            app_id: Arc::from(app_id),
            store,
            identity: None,
            collection: None,
            state: SyncState::Inactive,
            records: Vec::new(),
            index: HashMap::new(),
            generation: 0,
            listener: None,
        }
    }

    /// Start mirroring `identity`'s collection.
    ///
    /// Spawns a listener that forwards every snapshot as
    /// [`AppEvent::FavoritesSnapshot`]. Activating with a different identity
    /// tears the previous listener down first; activating again with the
    /// same identity is a no-op.
    ///
    /// # Errors
    ///
    /// `FavoriteError::StoreUnavailable` if no store is configured.
    pub fn activate(
        &mut self,
        identity: Identity,
        tx: &mpsc::Sender<AppEvent>,
    ) -> Result<(), FavoriteError> {
        let Some(store) = self.store.clone() else {
            return Err(FavoriteError::StoreUnavailable("no document store configured"));
        };
        if self.identity.as_ref() == Some(&identity) && self.state == SyncState::Subscribed {
            return Ok(());
        }

        self.teardown();
        let collection = collection_path(&self.app_id, &identity);
        let generation = self.generation;
        let tx = tx.clone();
        let path = collection.clone();

        let listener = tokio::spawn(async move {
            let mut subscription = match store.subscribe(&path).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    let _ = tx
                        .send(AppEvent::FavoritesSnapshot {
                            generation,
                            result: Err(e),
                        })
                        .await;
                    return;
                }
            };
            while let Some(result) = subscription.next().await {
                let failed = result.is_err();
                let sent = tx
                    .send(AppEvent::FavoritesSnapshot { generation, result })
                    .await;
                if sent.is_err() || failed {
                    break;
                }
            }
        });

        tracing::info!(collection = %collection, generation, "Favorite subscription opened");
        self.identity = Some(identity);
        self.collection = Some(collection);
        self.listener = Some(listener);
        self.state = SyncState::Subscribed;
        Ok(())
    }

    /// Stop mirroring and forget the identity.
    pub fn deactivate(&mut self) {
        self.teardown();
        self.identity = None;
        self.collection = None;
        self.state = SyncState::Inactive;
    }

    fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.records.clear();
        self.index.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Apply one subscription notification.
    ///
    /// A snapshot replaces the whole mirror. An error moves the
    /// synchronizer to [`SyncState::Error`] and keeps the last mirror.
    ///
    /// # Returns
    ///
    /// `false` if the notification was stale and ignored.
    pub fn apply_snapshot(
        &mut self,
        generation: u64,
        result: Result<Vec<Document>, StoreError>,
    ) -> bool {
        if generation != self.generation || self.state == SyncState::Inactive {
            tracing::debug!(generation, current = self.generation, "Stale favorite snapshot ignored");
            return false;
        }

        match result {
            Ok(documents) => {
                self.records = documents
                    .iter()
                    .map(|doc| Arc::new(FavoriteRecord::from_document(doc)))
                    .collect();
                self.index = self
                    .records
                    .iter()
                    .enumerate()
                    .map(|(i, record)| (record.key.clone(), i))
                    .collect();
                self.state = SyncState::Subscribed;
                tracing::debug!(count = self.records.len(), "Favorite mirror replaced");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Favorite subscription failed; favorites now read-only");
                self.state = SyncState::Error;
                if let Some(listener) = self.listener.take() {
                    listener.abort();
                }
            }
        }
        true
    }

    /// Resolve a toggle of `entity` against the current mirror.
    ///
    /// # Errors
    ///
    /// `FavoriteError::StoreUnavailable` without a store, before an identity
    /// is active, or after the subscription failed.
    pub fn plan_toggle(&self, entity: &Entity) -> Result<PendingWrite, FavoriteError> {
        let Some(store) = self.store.clone() else {
            return Err(FavoriteError::StoreUnavailable("no document store configured"));
        };
        let Some(collection) = self.collection.clone() else {
            return Err(FavoriteError::StoreUnavailable("session not ready"));
        };
        if self.state == SyncState::Error {
            return Err(FavoriteError::StoreUnavailable("favorite subscription failed"));
        }

        let op = if self.contains(&entity.name) {
            WriteOp::Remove(entity.name.to_string())
        } else {
            WriteOp::Add(FavoriteRecord::for_entity(entity, Utc::now()))
        };
        Ok(PendingWrite {
            store,
            collection,
            op,
        })
    }

    /// Flip `entity`'s membership in the store.
    pub async fn toggle(&self, entity: &Entity) -> Result<WriteOp, FavoriteError> {
        self.plan_toggle(entity)?.commit().await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn record(&self, name: &str) -> Option<&FavoriteRecord> {
        self.index.get(name).map(|&i| &*self.records[i])
    }

    /// Mirrored records, ordered by key.
    pub fn records(&self) -> &[Arc<FavoriteRecord>] {
        &self.records
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Whether a toggle would currently reach the store.
    pub fn is_available(&self) -> bool {
        self.store.is_some() && self.collection.is_some() && self.state != SyncState::Error
    }
}

impl Drop for FavoriteSync {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
