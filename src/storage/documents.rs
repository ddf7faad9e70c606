use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::schema::Database;
use super::types::{Document, StoreError};

/// Snapshots buffered per subscription before the feeder waits on the consumer.
const SUBSCRIPTION_BUFFER: usize = 16;

// ============================================================================
// Store Boundary
// ============================================================================

/// A keyed document store with live collection subscriptions.
///
/// Writes are create-or-overwrite by key; there is no partial update. A
/// subscription delivers the full, key-ordered contents of its collection
/// once on open and again after every change, in the order the store
/// observed them.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or overwrite the document `key` in `collection`.
    async fn put(&self, collection: &str, key: &str, body: &Value) -> Result<(), StoreError>;

    /// Delete the document `key` from `collection`. Deleting a missing key is not an error.
    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    /// Open a continuous subscription to `collection`.
    async fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError>;
}

/// A live collection listener.
///
/// Dropping the subscription cancels the task that feeds it, so the owner
/// releases the listener simply by letting it go out of scope.
pub struct Subscription {
    rx: mpsc::Receiver<Result<Vec<Document>, StoreError>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wrap a snapshot channel. Implementations that feed the channel from a
    /// task should attach it with [`Subscription::with_task`].
    pub fn new(rx: mpsc::Receiver<Result<Vec<Document>, StoreError>>) -> Self {
        Self { rx, task: None }
    }

    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    /// Next snapshot, or `None` once the store side has closed.
    pub async fn next(&mut self) -> Option<Result<Vec<Document>, StoreError>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// SQLite Implementation
// ============================================================================

impl Database {
    /// All documents of `collection`, ordered by key.
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT key, body, updated_at FROM documents WHERE collection = ? ORDER BY key",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(key, body, updated_at)| -> Result<Document, StoreError> {
                Ok(Document {
                    key,
                    body: serde_json::from_str(&body)?,
                    updated_at,
                })
            })
            .collect()
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.trim().is_empty() {
        return Err(StoreError::Rejected("empty document key".into()));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for Database {
    async fn put(&self, collection: &str, key: &str, body: &Value) -> Result<(), StoreError> {
        check_key(key)?;
        let body = serde_json::to_string(body)?;
        sqlx::query(
            r#"
            INSERT INTO documents (collection, key, body, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(collection, key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
        "#,
        )
        .bind(collection)
        .bind(key)
        .bind(&body)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        tracing::debug!(collection, key, "Document written");
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND key = ?")
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(collection, key, "Document deleted");
            self.notify(collection);
        }
        Ok(())
    }

    async fn subscribe(&self, collection: &str) -> Result<Subscription, StoreError> {
        let mut changes = self.watch_collection(collection);
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let db = self.clone();
        let collection = collection.to_owned();

        let task = tokio::spawn(async move {
            loop {
                // Mark seen before reading, so a write landing mid-query
                // triggers another pass.
                changes.borrow_and_update();
                let snapshot = db.list_documents(&collection).await;
                let failed = snapshot.is_err();
                if tx.send(snapshot).await.is_err() || failed {
                    break;
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!(collection = %collection, "Subscription feeder stopped");
        });

        Ok(Subscription::new(rx).with_task(task))
    }
}
