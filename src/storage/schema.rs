use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use super::types::{is_lock_error, DatabaseError};

// ============================================================================
// Database
// ============================================================================

/// Per-collection change counters. Each write bumps the counter of its
/// collection; subscribers re-read the collection when it moves.
type Watchers = Arc<Mutex<HashMap<String, watch::Sender<u64>>>>;

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
    watchers: Watchers,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database shared by every
    /// connection of the pool, which is what the tests use.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InstanceLocked` if another process holds the
    /// database (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `DatabaseError::Migration` if the schema cannot be created.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // SEC-010: the file is created 0600 before SQLite ever touches it.
        #[cfg(unix)]
        if path != ":memory:" {
            restrict_permissions(std::path::Path::new(path));
        }

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self {
            pool,
            watchers: Arc::new(Mutex::new(HashMap::new())),
        };
        db.migrate().await.map_err(|e| {
            if is_lock_error(&e.to_string()) {
                DatabaseError::InstanceLocked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        Ok(db)
    }

    /// Create tables inside one transaction. Every statement is
    /// `IF NOT EXISTS`, so reopening an existing file is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (collection, key)
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Open the store at `path`, or `None` when it is unavailable.
    ///
    /// Every failure, including another process holding the lock, is
    /// logged and reported as `None` so the caller can run without
    /// favorites.
    pub async fn open_optional(path: &std::path::Path) -> Option<Self> {
        let Some(path_str) = path.to_str() else {
            tracing::warn!(path = %path.display(), "Store path is not valid UTF-8; favorites disabled");
            return None;
        };
        available(Self::open(path_str).await, path)
    }

    /// Change counter for `collection`, created on first use.
    pub(crate) fn watch_collection(&self, collection: &str) -> watch::Receiver<u64> {
        let mut watchers = self
            .watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        watchers
            .entry(collection.to_owned())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }

    /// Wake every subscriber of `collection`.
    pub(crate) fn notify(&self, collection: &str) {
        let watchers = self
            .watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(tx) = watchers.get(collection) {
            tx.send_modify(|version| *version = version.wrapping_add(1));
        }
    }
}

fn available(result: Result<Database, DatabaseError>, path: &std::path::Path) -> Option<Database> {
    match result {
        Ok(db) => Some(db),
        Err(DatabaseError::InstanceLocked) => {
            tracing::warn!(
                path = %path.display(),
                "Store locked by another instance; favorites disabled"
            );
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Store unavailable; favorites disabled");
            None
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(db_path: &std::path::Path) {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    if db_path.is_file() {
        let perms = std::fs::Permissions::from_mode(0o600);
        if let Err(e) = std::fs::set_permissions(db_path, perms) {
            tracing::warn!(path = %db_path.display(), error = %e, "Failed to set database file permissions");
        }
    } else if !db_path.exists() && db_path.parent().map_or(true, |p| p.as_os_str().is_empty() || p.exists()) {
        // If creation fails, SQLite reports the error at connect time.
        let _ = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(db_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_creates_tables() {
        let db = Database::open(":memory:").await.unwrap();
        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&db.pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"documents"));
        assert!(names.contains(&"user_preferences"));
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_file_sets_private_permissions() {
        let dir = std::env::temp_dir().join(format!("digidex_db_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("store.db");
        let _ = std::fs::remove_file(&path);

        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        drop(db);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_locked_store_is_unavailable() {
        let path = std::path::Path::new("/tmp/locked.db");
        assert!(available(Err(DatabaseError::InstanceLocked), path).is_none());
        assert!(available(Err(DatabaseError::Migration("boom".into())), path).is_none());
    }

    #[tokio::test]
    async fn test_open_optional_degrades_on_bad_path() {
        let dir = std::env::temp_dir().join(format!("digidex_dir_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        // A directory cannot be opened as a database file.
        assert!(Database::open_optional(&dir).await.is_none());

        let path = dir.join("ok.db");
        let _ = std::fs::remove_file(&path);
        assert!(Database::open_optional(&path).await.is_some());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_notify_without_watchers_is_noop() {
        let db = Database::open(":memory:").await.unwrap();
        db.notify("artifacts/none/users/nobody/favorites");
    }

    #[tokio::test]
    async fn test_notify_bumps_watchers() {
        let db = Database::open(":memory:").await.unwrap();
        let mut rx = db.watch_collection("c");
        assert_eq!(*rx.borrow_and_update(), 0);
        db.notify("c");
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
