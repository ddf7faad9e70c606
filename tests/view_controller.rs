//! End-to-end tests for the view-state controller: a mocked catalog
//! endpoint, the background tasks and the event channel, driven the way the
//! UI loop drives them.

use std::time::Duration;

use digidex::app::{App, AppEvent, Screen};
use digidex::config::Config;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog_body(n: usize) -> Value {
    let levels = ["Rookie", "Champion", "Ultimate"];
    Value::Array(
        (0..n)
            .map(|i| {
                json!({
                    "name": format!("Mon{i:02}"),
                    "level": levels[i % levels.len()],
                    "img": format!("https://img.example.com/{i}.png"),
                })
            })
            .collect(),
    )
}

async fn mock_catalog(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/digimon"))
        .respond_with(template)
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn app_for(server: &MockServer) -> App {
    let config = Config {
        catalog_url: format!("{}/api/digimon", server.uri()),
        page_size: 20,
        ..Config::default()
    };
    App::new(&config, None).unwrap()
}

/// Feed events into the app until it stops loading.
async fn pump_until_loaded(
    app: &mut App,
    tx: &mpsc::Sender<AppEvent>,
    rx: &mut mpsc::Receiver<AppEvent>,
) {
    while app.is_loading() {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for app event")
            .expect("event channel closed");
        app.handle_event(event, tx);
    }
}

#[tokio::test]
async fn test_loads_and_pages_forty_five_entities() {
    let server = mock_catalog(ResponseTemplate::new(200).set_body_json(catalog_body(45))).await;
    let (tx, mut rx) = mpsc::channel(32);
    let mut app = app_for(&server);

    app.start(None, None, &tx);
    pump_until_loaded(&mut app, &tx, &mut rx).await;

    assert_eq!(app.catalog().entities().len(), 45);
    assert_eq!(app.total_pages(), 3);
    assert_eq!(app.current_page_slice().len(), 20);
    assert_eq!(&*app.current_page_slice()[0].name, "Mon00");

    assert!(app.go_to_page(3));
    let names: Vec<&str> = app
        .current_page_slice()
        .iter()
        .map(|e| &*e.name)
        .collect();
    assert_eq!(names, vec!["Mon40", "Mon41", "Mon42", "Mon43", "Mon44"]);

    assert!(!app.go_to_page(4));
    assert!(!app.go_to_page(0));
    assert_eq!(app.view().page_index(), 3);
}

#[tokio::test]
async fn test_failed_fetch_leaves_empty_catalog() {
    let server = mock_catalog(ResponseTemplate::new(503)).await;
    let (tx, mut rx) = mpsc::channel(32);
    let mut app = app_for(&server);

    app.start(None, None, &tx);
    pump_until_loaded(&mut app, &tx, &mut rx).await;

    assert!(app.catalog().entities().is_empty());
    assert_eq!(app.total_pages(), 0);
    assert!(app.search_results().is_empty());
    assert!(app.level_distribution().is_empty());
}

#[tokio::test]
async fn test_search_and_details_flow() {
    let server = mock_catalog(ResponseTemplate::new(200).set_body_json(json!([
        {"name": "Agumon", "level": "Rookie", "img": "https://img.example.com/agumon.jpg"},
        {"name": "Greymon", "level": "Champion", "img": "https://img.example.com/greymon.jpg"},
        {"name": "Gabumon", "level": "Rookie", "img": "https://img.example.com/gabumon.jpg"},
    ])))
    .await;
    let (tx, mut rx) = mpsc::channel(32);
    let mut app = app_for(&server);

    app.start(None, None, &tx);
    pump_until_loaded(&mut app, &tx, &mut rx).await;

    app.navigate(Screen::Search);
    app.set_search_term("ROOKIE");
    let found: Vec<&str> = app.search_results().iter().map(|e| &*e.name).collect();
    assert_eq!(found, vec!["Agumon", "Gabumon"]);

    app.set_search_term("  ");
    assert!(app.search_results().is_empty());

    app.set_search_term("grey");
    assert!(app.select_highlighted());
    assert_eq!(app.view().screen(), Screen::Details);
    assert_eq!(
        app.view().selected().map(|e| e.name.to_string()),
        Some("Greymon".to_string())
    );

    app.navigate(Screen::Home);
    assert!(app.view().selected().is_none());
}

#[tokio::test]
async fn test_level_distribution_from_fetched_catalog() {
    let server = mock_catalog(ResponseTemplate::new(200).set_body_json(catalog_body(7))).await;
    let (tx, mut rx) = mpsc::channel(32);
    let mut app = app_for(&server);

    app.start(None, None, &tx);
    pump_until_loaded(&mut app, &tx, &mut rx).await;

    let counts: Vec<(String, usize)> = app
        .level_distribution()
        .into_iter()
        .map(|c| (c.level.to_string(), c.count))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("Rookie".to_string(), 3),
            ("Champion".to_string(), 2),
            ("Ultimate".to_string(), 2),
        ]
    );
}
