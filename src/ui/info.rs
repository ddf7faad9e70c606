use crate::app::App;
use crate::favorites::SyncState;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render the Info screen: what the app is, where data comes from and the
/// state of the session.
pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    let label = |text: &'static str| Span::styled(format!("{text:<12}"), app.style("label"));

    let identity = match &app.session().identity {
        Some(id) => Span::styled(id.to_string(), app.style("body")),
        None => Span::styled("none (favorites disabled)", app.style("warning")),
    };

    let favorites = app.favorites();
    let sync = if !favorites.has_store() {
        Span::styled("disabled, no document store", app.style("muted"))
    } else {
        match favorites.state() {
            SyncState::Subscribed => Span::styled(
                format!("{} saved, live", favorites.records().len()),
                app.style("body"),
            ),
            SyncState::Error => Span::styled(
                format!("{} saved, sync failed", favorites.records().len()),
                app.style("warning"),
            ),
            SyncState::Inactive => Span::styled("inactive", app.style("muted")),
        }
    };

    let lines = vec![
        Line::from(Span::styled(
            format!("digidex {}", env!("CARGO_PKG_VERSION")),
            app.style("heading"),
        )),
        Line::from(Span::styled(
            "Browse a public creature catalog, search it by name or level and keep a list of favorites.",
            app.style("body"),
        )),
        Line::from(""),
        Line::from(vec![
            label("Catalog"),
            Span::styled(app.catalog_url.clone(), app.style("link")),
        ]),
        Line::from(vec![
            label("Entities"),
            Span::styled(app.catalog().entities().len().to_string(), app.style("body")),
        ]),
        Line::from(vec![label("Identity"), identity]),
        Line::from(vec![label("Favorites"), sync]),
        Line::from(vec![
            label("Theme"),
            Span::styled(app.theme_variant.name(), app.style("body")),
        ]),
    ];

    f.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(" Info "),
        ),
        area,
    );
}
