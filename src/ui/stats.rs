//! Level distribution panel.

use crate::app::App;
use crate::catalog::Tier;
use crate::util::{pad_to_width, truncate_to_width};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const LABEL_WIDTH: usize = 14;
/// Room for the count and percentage after the bar.
const FIGURES_WIDTH: usize = 16;

pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    let total = app.catalog().entities().len();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(format!(" Levels ({total} entities) "));

    let distribution = app.level_distribution();
    if distribution.is_empty() {
        f.render_widget(
            Paragraph::new("No entities to count.")
                .style(app.style("muted"))
                .block(block),
            area,
        );
        return;
    }

    let max = distribution.first().map(|c| c.count).unwrap_or(0);
    let bar_width = (area.width as usize)
        .saturating_sub(2)
        .saturating_sub(LABEL_WIDTH + FIGURES_WIDTH);

    let lines: Vec<Line> = distribution
        .iter()
        .map(|entry| {
            let label = pad_to_width(&truncate_to_width(&entry.level, LABEL_WIDTH - 1), LABEL_WIDTH);
            let tier_style = app.theme.tier(Tier::from_label(&entry.level));
            Line::from(vec![
                Span::styled(label, tier_style),
                Span::styled(
                    "█".repeat(bar_len(entry.count, max, bar_width)),
                    app.style("stats_bar"),
                ),
                Span::styled(
                    format!(" {} ({:.1}%)", entry.count, percent(entry.count, total)),
                    app.style("body"),
                ),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Bar length scaled so the largest group fills `width`. A non-empty group
/// always gets at least one cell.
fn bar_len(count: usize, max: usize, width: usize) -> usize {
    if count == 0 || max == 0 || width == 0 {
        return 0;
    }
    (count * width / max).max(1)
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 * 100.0 / total as f64
}
