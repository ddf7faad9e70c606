//! Per-device identity and the session bootstrap.
//!
//! The favorite collection is scoped by an opaque identity. [`bootstrap`]
//! resolves it once at startup through an [`IdentityService`]: an identity
//! already known to the service is reused, otherwise exactly one credential
//! is requested. Issuance failure still ends the bootstrap (`ready = true`
//! with no identity), so the rest of the application never waits on it.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::storage::{Database, StoreError};

/// Preference key holding the issued uid.
pub const SESSION_UID_KEY: &str = "session.uid";

const MAX_IDENTITY_LENGTH: usize = 128;
const MAX_TOKEN_LENGTH: usize = 4096;

// ============================================================================
// Types
// ============================================================================

/// An opaque, resolved user identity.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted, since the value is
/// embedded in store collection paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(Arc<str>);

impl Identity {
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_IDENTITY_LENGTH
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(Arc::from(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while issuing a credential.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Identity storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("Session token rejected: {0}")]
    InvalidToken(&'static str),

    #[error("Credential issuance failed: {0}")]
    Issuance(String),
}

/// Outcome of the identity bootstrap.
///
/// `ready` flips once and stays; `identity` may remain `None` after
/// `ready` when issuance failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub ready: bool,
}

impl SessionState {
    /// Bootstrap still running.
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn resolved(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ready: true,
        }
    }

    /// Bootstrap finished without an identity; favorites stay disabled.
    pub fn unresolved() -> Self {
        Self {
            identity: None,
            ready: true,
        }
    }
}

// ============================================================================
// Service Boundary
// ============================================================================

/// Issues and publishes the current identity.
///
/// `watch_user` is the change notification the bootstrap observes; a
/// successful sign-in must publish the issued identity on it.
#[async_trait]
pub trait IdentityService: Send + Sync {
    fn watch_user(&self) -> watch::Receiver<Option<Identity>>;

    async fn sign_in_anonymously(&self) -> Result<Identity, IdentityError>;

    async fn sign_in_with_token(&self, token: &SecretString) -> Result<Identity, IdentityError>;
}

/// Resolve the session identity.
///
/// Reuses the identity the service already publishes; otherwise requests
/// one credential (the custom `token` if given, else anonymous) and waits
/// for it to be published. Never requests twice and never fails: any error
/// yields [`SessionState::unresolved`].
pub async fn bootstrap(
    service: &dyn IdentityService,
    token: Option<&SecretString>,
) -> SessionState {
    let mut user = service.watch_user();
    let mut requested = false;

    loop {
        let current = user.borrow_and_update().clone();
        if let Some(identity) = current {
            tracing::info!(identity = %identity, reused = !requested, "Identity resolved");
            return SessionState::resolved(identity);
        }

        if !requested {
            requested = true;
            let issued = match token {
                Some(token) => service.sign_in_with_token(token).await,
                None => service.sign_in_anonymously().await,
            };
            if let Err(e) = issued {
                tracing::warn!(error = %e, "Sign-in failed; favorites disabled for this session");
                return SessionState::unresolved();
            }
            continue;
        }

        if user.changed().await.is_err() {
            tracing::warn!("Identity service closed before publishing an identity");
            return SessionState::unresolved();
        }
    }
}

// ============================================================================
// Local Identity Service
// ============================================================================

/// Identity service backed by the local database.
///
/// The issued uid is kept under [`SESSION_UID_KEY`], so a device keeps the
/// same identity (and the same favorites) across runs. Once published the
/// identity is never replaced for the lifetime of the service.
pub struct LocalIdentityService {
    db: Database,
    user: watch::Sender<Option<Identity>>,
    issuing: Mutex<()>,
}

impl LocalIdentityService {
    /// Load the stored uid, if any, and publish it.
    ///
    /// A stored value that is not a valid identity is ignored with a warning
    /// and a fresh one is issued on the next sign-in.
    pub async fn restore(db: Database) -> Result<Self, IdentityError> {
        let stored = db.get_preference(SESSION_UID_KEY).await?;
        let identity = stored.as_deref().and_then(|raw| {
            let parsed = Identity::parse(raw);
            if parsed.is_none() {
                tracing::warn!("Stored session uid is malformed; ignoring it");
            }
            parsed
        });

        let (user, _) = watch::channel(identity);
        Ok(Self {
            db,
            user,
            issuing: Mutex::new(()),
        })
    }

    /// Forget the stored uid so the next run issues a new identity.
    pub async fn reset(db: &Database) -> Result<bool, IdentityError> {
        Ok(db.delete_preference(SESSION_UID_KEY).await?)
    }

    async fn issue(&self, uid: String) -> Result<Identity, IdentityError> {
        let _guard = self.issuing.lock().await;

        let current = self.user.borrow().clone();
        if let Some(existing) = current {
            return Ok(existing);
        }

        let identity =
            Identity::parse(&uid).ok_or_else(|| IdentityError::Issuance(format!("bad uid {uid:?}")))?;
        self.db.set_preference(SESSION_UID_KEY, identity.as_str()).await?;
        self.user.send_replace(Some(identity.clone()));
        Ok(identity)
    }
}

/// Stable uid for a session token: the first 32 hex digits of its SHA-256.
fn token_uid(token: &SecretString) -> Result<String, IdentityError> {
    let token = token.expose_secret().trim();
    if token.is_empty() {
        return Err(IdentityError::InvalidToken("token is empty"));
    }
    if token.len() > MAX_TOKEN_LENGTH {
        return Err(IdentityError::InvalidToken("token is too long"));
    }
    let digest = format!("{:x}", Sha256::digest(token.as_bytes()));
    Ok(format!("tok-{}", &digest[..32]))
}

#[async_trait]
impl IdentityService for LocalIdentityService {
    fn watch_user(&self) -> watch::Receiver<Option<Identity>> {
        self.user.subscribe()
    }

    async fn sign_in_anonymously(&self) -> Result<Identity, IdentityError> {
        self.issue(uuid::Uuid::new_v4().to_string()).await
    }

    async fn sign_in_with_token(&self, token: &SecretString) -> Result<Identity, IdentityError> {
        let uid = token_uid(token)?;
        self.issue(uid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    /// Counts sign-in calls; optionally fails them or never publishes.
    struct FakeIdentityService {
        user: watch::Sender<Option<Identity>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeIdentityService {
        fn new(initial: Option<&str>, fail: bool) -> Self {
            Self {
                user: watch::channel(initial.and_then(Identity::parse)).0,
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityService for FakeIdentityService {
        fn watch_user(&self) -> watch::Receiver<Option<Identity>> {
            self.user.subscribe()
        }

        async fn sign_in_anonymously(&self) -> Result<Identity, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(IdentityError::Issuance("service offline".into()));
            }
            let identity = Identity::parse("anon-1").unwrap();
            self.user.send_replace(Some(identity.clone()));
            Ok(identity)
        }

        async fn sign_in_with_token(&self, _token: &SecretString) -> Result<Identity, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let identity = Identity::parse("custom-1").unwrap();
            self.user.send_replace(Some(identity.clone()));
            Ok(identity)
        }
    }

    #[test]
    fn test_identity_parse() {
        assert!(Identity::parse("3f2a-b_9").is_some());
        assert!(Identity::parse("").is_none());
        assert!(Identity::parse("a/b").is_none());
        assert!(Identity::parse("../etc").is_none());
        assert!(Identity::parse(&"x".repeat(129)).is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_reuses_existing_identity() {
        let service = FakeIdentityService::new(Some("existing"), false);
        let state = bootstrap(&service, None).await;

        assert_eq!(state, SessionState::resolved(Identity::parse("existing").unwrap()));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_requests_anonymous_once() {
        let service = FakeIdentityService::new(None, false);
        let state = bootstrap(&service, None).await;

        assert_eq!(state.identity.as_ref().map(Identity::as_str), Some("anon-1"));
        assert!(state.ready);
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_prefers_custom_token() {
        let service = FakeIdentityService::new(None, false);
        let token = SecretString::from("secret-token".to_string());
        let state = bootstrap(&service, Some(&token)).await;

        assert_eq!(state.identity.as_ref().map(Identity::as_str), Some("custom-1"));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_fails_open() {
        let service = FakeIdentityService::new(None, true);
        let state = bootstrap(&service, None).await;

        assert_eq!(state, SessionState::unresolved());
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_local_service_issues_and_persists() {
        let db = test_db().await;
        let service = LocalIdentityService::restore(db.clone()).await.unwrap();
        assert!(service.watch_user().borrow().is_none());

        let first = service.sign_in_anonymously().await.unwrap();
        assert_eq!(service.watch_user().borrow().as_ref(), Some(&first));
        assert_eq!(
            db.get_preference(SESSION_UID_KEY).await.unwrap().as_deref(),
            Some(first.as_str())
        );

        // Never reassigned within a session.
        let second = service.sign_in_anonymously().await.unwrap();
        assert_eq!(first, second);

        // Same identity on the next run.
        let restored = LocalIdentityService::restore(db).await.unwrap();
        assert_eq!(restored.watch_user().borrow().as_ref(), Some(&first));
    }

    #[tokio::test]
    async fn test_local_service_token_is_deterministic() {
        let token = SecretString::from("device-token".to_string());

        let a = LocalIdentityService::restore(test_db().await).await.unwrap();
        let b = LocalIdentityService::restore(test_db().await).await.unwrap();
        let id_a = a.sign_in_with_token(&token).await.unwrap();
        let id_b = b.sign_in_with_token(&token).await.unwrap();

        assert_eq!(id_a, id_b);
        assert!(id_a.as_str().starts_with("tok-"));
        assert!(!id_a.as_str().contains("device-token"));
    }

    #[tokio::test]
    async fn test_local_service_rejects_empty_token() {
        let service = LocalIdentityService::restore(test_db().await).await.unwrap();
        let token = SecretString::from("   ".to_string());
        let err = service.sign_in_with_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
        assert!(service.watch_user().borrow().is_none());
    }

    #[tokio::test]
    async fn test_reset_forgets_identity() {
        let db = test_db().await;
        let service = LocalIdentityService::restore(db.clone()).await.unwrap();
        service.sign_in_anonymously().await.unwrap();

        assert!(LocalIdentityService::reset(&db).await.unwrap());
        let restored = LocalIdentityService::restore(db).await.unwrap();
        assert!(restored.watch_user().borrow().is_none());
    }

    #[tokio::test]
    async fn test_restore_ignores_malformed_uid() {
        let db = test_db().await;
        db.set_preference(SESSION_UID_KEY, "../../other").await.unwrap();

        let service = LocalIdentityService::restore(db).await.unwrap();
        assert!(service.watch_user().borrow().is_none());
    }

    #[tokio::test]
    async fn test_bootstrap_with_local_service() {
        let service = LocalIdentityService::restore(test_db().await).await.unwrap();
        let state = bootstrap(&service, None).await;
        assert!(state.ready);
        assert!(state.identity.is_some());
    }
}
