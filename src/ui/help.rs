//! Help overlay: keybinding table grouped by screen.

use crate::app::App;
use ratatui::{
    layout::Constraint,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Row, Table},
    Frame,
};

use super::render::centered_rect;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "General",
        &[
            ("1-5", "Jump to Home/Favorites/Search/Stats/Info"),
            ("Tab / S-Tab", "Next / previous tab"),
            ("/", "Search"),
            ("t", "Cycle theme"),
            ("?", "Toggle help"),
            ("q / Ctrl+c", "Quit"),
        ],
    ),
    (
        "Lists",
        &[
            ("j / k", "Move highlight"),
            ("Enter / l", "Show details"),
            ("Space / f", "Toggle favorite"),
        ],
    ),
    (
        "Home",
        &[
            ("n / p", "Next / previous page"),
            ("g / G", "First / last page"),
        ],
    ),
    (
        "Details",
        &[
            ("o", "Open image in browser"),
            ("Esc / b", "Back to Home"),
        ],
    ),
    (
        "Search",
        &[
            ("type", "Edit the search term"),
            ("Up / Down", "Move highlight"),
            ("Ctrl+f", "Toggle favorite"),
            ("Esc", "Clear and leave"),
        ],
    ),
];

/// Render the help overlay on top of the current view.
pub(super) fn render(f: &mut Frame, app: &App) {
    let overlay = centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }

    f.render_widget(Clear, overlay);

    let mut rows: Vec<Row> = Vec::new();
    for (label, bindings) in SECTIONS {
        if !rows.is_empty() {
            rows.push(Row::new(vec![String::new(), String::new()]));
        }
        rows.push(
            Row::new(vec![
                Line::from(Span::styled(
                    format!("-- {label} --"),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ])
            .style(app.style("heading")),
        );
        for (key, description) in bindings.iter() {
            rows.push(Row::new(vec![format!("  {key}"), description.to_string()]));
        }
    }

    let table = Table::new(rows, [Constraint::Length(16), Constraint::Min(20)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(" Help (? to close) "),
        )
        .style(app.style("body"));

    f.render_widget(table, overlay);
}
