//! Integration tests for favorites: identity bootstrap against the local
//! store, the live subscription and the toggle round trip through `App`.

use std::sync::Arc;
use std::time::Duration;

use digidex::app::{App, AppEvent, Screen};
use digidex::config::Config;
use digidex::favorites::{collection_path, SyncState};
use digidex::identity::{IdentityService, LocalIdentityService};
use digidex::storage::{Database, DocumentStore};
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn catalog_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Agumon", "level": "Rookie", "img": "https://img.example.com/agumon.jpg"},
            {"name": "Gabumon", "level": "Rookie", "img": "https://img.example.com/gabumon.jpg"},
        ])))
        .mount(&server)
        .await;
    server
}

struct Harness {
    app: App,
    db: Database,
    tx: mpsc::Sender<AppEvent>,
    rx: mpsc::Receiver<AppEvent>,
}

impl Harness {
    async fn start(server: &MockServer, db: Database, token: Option<&str>) -> Self {
        let config = Config {
            catalog_url: server.uri(),
            ..Config::default()
        };
        let store: Arc<dyn DocumentStore> = Arc::new(db.clone());
        let service: Arc<dyn IdentityService> =
            Arc::new(LocalIdentityService::restore(db.clone()).await.unwrap());

        let (tx, rx) = mpsc::channel(32);
        let mut app = App::new(&config, Some(store)).unwrap();
        app.start(
            Some(service),
            token.map(|t| SecretString::from(t.to_string())),
            &tx,
        );
        Self { app, db, tx, rx }
    }

    /// Apply events until `done` holds.
    async fn pump_until(&mut self, done: impl Fn(&App) -> bool) {
        while !done(&self.app) {
            let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                .await
                .expect("timed out waiting for app event")
                .expect("event channel closed");
            self.app.handle_event(event, &self.tx);
        }
    }
}

#[tokio::test]
async fn test_toggle_round_trip_through_store() {
    let server = catalog_server().await;
    let db = Database::open(":memory:").await.unwrap();
    let mut h = Harness::start(&server, db, None).await;

    h.pump_until(|app| !app.is_loading() && app.favorites().state() == SyncState::Subscribed)
        .await;
    let identity = h.app.session().identity.clone().expect("anonymous identity");
    assert!(h.app.favorites().records().is_empty());

    let agumon = h.app.catalog().find("Agumon").cloned().unwrap();
    assert!(h.app.toggle_favorite(&agumon, &h.tx));
    h.pump_until(|app| app.is_favorite("Agumon")).await;

    let docs = h
        .db
        .list_documents(&collection_path("digidex", &identity))
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].key, "Agumon");
    assert_eq!(docs[0].body["level"], "Rookie");
    assert!(docs[0].body["addedAt"].is_string());

    h.app.navigate(Screen::Favorites);
    let names: Vec<String> = h
        .app
        .favorite_list()
        .iter()
        .map(|e| e.name.to_string())
        .collect();
    assert_eq!(names, vec!["Agumon".to_string()]);

    assert!(h.app.toggle_favorite(&agumon, &h.tx));
    h.pump_until(|app| !app.is_favorite("Agumon")).await;
    assert!(h.app.favorite_list().is_empty());
}

#[tokio::test]
async fn test_external_write_reaches_mirror() {
    let server = catalog_server().await;
    let db = Database::open(":memory:").await.unwrap();
    let mut h = Harness::start(&server, db, None).await;

    h.pump_until(|app| app.favorites().state() == SyncState::Subscribed)
        .await;
    let identity = h.app.session().identity.clone().unwrap();

    h.db.put(
        &collection_path("digidex", &identity),
        "Gabumon",
        &json!({"name": "Gabumon", "level": "Rookie", "addedAt": "2024-05-01T12:00:00Z"}),
    )
    .await
    .unwrap();

    h.pump_until(|app| app.is_favorite("Gabumon")).await;
    let record = h.app.favorites().record("Gabumon").unwrap();
    assert_eq!(record.added_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
}

#[tokio::test]
async fn test_identity_persists_across_restarts() {
    let server = catalog_server().await;
    let db = Database::open(":memory:").await.unwrap();

    let first = {
        let mut h = Harness::start(&server, db.clone(), None).await;
        h.pump_until(|app| !app.is_loading()).await;
        h.app.session().identity.clone().unwrap()
    };

    let mut h = Harness::start(&server, db.clone(), None).await;
    h.pump_until(|app| !app.is_loading()).await;
    assert_eq!(h.app.session().identity.as_ref(), Some(&first));

    assert!(LocalIdentityService::reset(&db).await.unwrap());
    let mut h = Harness::start(&server, db, None).await;
    h.pump_until(|app| !app.is_loading()).await;
    assert_ne!(h.app.session().identity.as_ref(), Some(&first));
}

#[tokio::test]
async fn test_token_identity_is_stable() {
    let server = catalog_server().await;

    let mut a = Harness::start(&server, Database::open(":memory:").await.unwrap(), Some("s3cret")).await;
    a.pump_until(|app| !app.is_loading()).await;
    let mut b = Harness::start(&server, Database::open(":memory:").await.unwrap(), Some("s3cret")).await;
    b.pump_until(|app| !app.is_loading()).await;

    let id = a.app.session().identity.clone().unwrap();
    assert!(id.as_str().starts_with("tok-"));
    assert_eq!(b.app.session().identity.as_ref(), Some(&id));
}

#[tokio::test]
async fn test_no_store_disables_favorites_without_blocking() {
    let server = catalog_server().await;
    let config = Config {
        catalog_url: server.uri(),
        ..Config::default()
    };
    let (tx, mut rx) = mpsc::channel(32);
    let mut app = App::new(&config, None).unwrap();
    app.start(None, None, &tx);

    while app.is_loading() {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        app.handle_event(event, &tx);
    }

    assert_eq!(app.session().identity, None);
    assert!(!app.favorites().is_available());
    let agumon = app.catalog().find("Agumon").cloned().unwrap();
    assert!(!app.toggle_favorite(&agumon, &tx));
    assert!(!app.is_favorite("Agumon"));
    assert_eq!(app.catalog().entities().len(), 2);
}
