use crate::app::App;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render the Details screen for the selected entity.
pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(" Details ");

    let Some(entity) = app.view().selected() else {
        f.render_widget(
            Paragraph::new("Nothing selected.")
                .style(app.style("muted"))
                .block(block),
            area,
        );
        return;
    };

    let label = |text: &'static str| Span::styled(format!("{text:<10}"), app.style("label"));

    let favorite = match app.favorites().record(&entity.name) {
        Some(record) => Span::styled(
            format!("★ since {}", record.added_at.format("%Y-%m-%d %H:%M UTC")),
            app.style("favorite_marker"),
        ),
        None if app.favorites().is_available() => Span::styled("no", app.style("body")),
        None => Span::styled("unavailable", app.style("muted")),
    };

    let image = match &entity.image {
        Some(url) => Span::styled(url.to_string(), app.style("link")),
        None => Span::styled("none", app.style("muted")),
    };

    let lines = vec![
        Line::from(Span::styled(entity.name.to_string(), app.style("heading"))),
        Line::from(""),
        Line::from(vec![
            label("Level"),
            Span::styled(entity.level_label().to_string(), app.theme.tier(entity.tier())),
        ]),
        Line::from(vec![label("Favorite"), favorite]),
        Line::from(vec![label("Image"), image]),
        Line::from(""),
        Line::from(Span::styled(
            "[Space] toggle favorite  [o] open image  [Esc] back",
            app.style("muted"),
        )),
    ];

    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(block),
        area,
    );
}
