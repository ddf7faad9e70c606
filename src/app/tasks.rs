//! Background tasks spawned by [`App`](super::App).
//!
//! Each task reports exclusively through the `AppEvent` channel and is
//! wrapped in [`catch_task_panic`] so a panic degrades the feature it
//! serves instead of wedging the loading screen.

use futures::FutureExt;
use secrecy::SecretString;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::AppEvent;
use crate::catalog::{fetch_catalog, FetchError};
use crate::favorites::{PendingWrite, WriteOp};
use crate::identity::{bootstrap, IdentityService, SessionState};

/// Run `future`, turning a panic into `Err(message)`.
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future).catch_unwind().await.map_err(|panic| {
        if let Some(s) = panic.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        }
    })
}

async fn send(tx: &mpsc::Sender<AppEvent>, event: AppEvent, name: &'static str) {
    if let Err(e) = tx.send(event).await {
        tracing::warn!(error = %e, event = name, "Channel send failed (receiver dropped)");
    }
}

async fn report_panic(tx: &mpsc::Sender<AppEvent>, task: &'static str, error: &str) {
    tracing::error!(task, error = %error, "Background task panicked");
    send(
        tx,
        AppEvent::TaskPanicked {
            task,
            error: error.to_string(),
        },
        "TaskPanicked",
    )
    .await;
}

/// Fetch the catalog once and report `CatalogLoaded`.
pub(crate) fn spawn_catalog_load(
    client: reqwest::Client,
    url: String,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = match catch_task_panic(fetch_catalog(&client, &url)).await {
            Ok(result) => result,
            Err(panic) => {
                report_panic(&tx, "catalog_load", &panic).await;
                Err(FetchError::TaskFailed(panic))
            }
        };
        send(&tx, AppEvent::CatalogLoaded(result), "CatalogLoaded").await;
    })
}

/// Resolve the session identity and report `SessionReady`.
pub(crate) fn spawn_identity_bootstrap(
    service: Arc<dyn IdentityService>,
    token: Option<SecretString>,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let state = match catch_task_panic(bootstrap(service.as_ref(), token.as_ref())).await {
            Ok(state) => state,
            Err(panic) => {
                report_panic(&tx, "identity_bootstrap", &panic).await;
                SessionState::unresolved()
            }
        };
        send(&tx, AppEvent::SessionReady(state), "SessionReady").await;
    })
}

/// Commit a favorite write. Failures are logged only; the mirror catches
/// up through the subscription either way.
pub(crate) fn spawn_favorite_write(
    write: PendingWrite,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match catch_task_panic(write.commit()).await {
            Ok(Ok(WriteOp::Add(record))) => tracing::debug!(key = %record.key, "Favorite added"),
            Ok(Ok(WriteOp::Remove(key))) => tracing::debug!(key = %key, "Favorite removed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Favorite write failed"),
            Err(panic) => report_panic(&tx, "favorite_write", &panic).await,
        }
    })
}
