//! Home, Favorites and Search list screens.

use crate::app::{page_window, App, MAX_SEARCH_RESULTS};
use crate::catalog::Entity;
use crate::favorites::SyncState;
use crate::util::{pad_to_width, truncate_to_width};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

/// Width reserved for the marker, the gaps and the level column.
const LEVEL_COLUMN: usize = 14;

pub(super) fn render_home(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let total = app.catalog().entities().len();
    let title = if total == 0 {
        " Catalog ".to_string()
    } else {
        format!(" Catalog ({total}) ")
    };

    if total == 0 {
        empty_panel(f, app, chunks[0], &title, "The catalog is empty or could not be loaded.");
    } else {
        entity_list(f, app, app.current_page_slice(), &title, chunks[0]);
    }
    pagination_bar(f, app, chunks[1]);
}

/// One element of the pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageItem {
    Page(usize),
    Gap,
}

/// Page numbers around `current`, with a gap marker on each side that
/// does not reach the first or last page. Empty for a single page.
fn pagination_items(current: usize, total: usize) -> Vec<PageItem> {
    if total <= 1 {
        return Vec::new();
    }
    let window = page_window(current, total);
    let mut items = Vec::with_capacity(window.len() + 2);
    if window.first().is_some_and(|&first| first > 1) {
        items.push(PageItem::Gap);
    }
    items.extend(window.iter().map(|&page| PageItem::Page(page)));
    if window.last().is_some_and(|&last| last < total) {
        items.push(PageItem::Gap);
    }
    items
}

fn pagination_bar(f: &mut Frame, app: &App, area: Rect) {
    let total = app.total_pages();
    let current = app.view().page_index();
    let items = pagination_items(current, total);
    if items.is_empty() {
        return;
    }

    let mut spans = vec![Span::styled("« ", app.style("page_other"))];
    for item in items {
        match item {
            PageItem::Page(page) if page == current => {
                spans.push(Span::styled(format!("[{page}]"), app.style("page_current")));
            }
            PageItem::Page(page) => {
                spans.push(Span::styled(format!(" {page} "), app.style("page_other")));
            }
            PageItem::Gap => spans.push(Span::styled(" ... ", app.style("muted"))),
        }
    }
    spans.push(Span::styled(" »", app.style("page_other")));
    spans.push(Span::styled(format!("  {current}/{total}"), app.style("muted")));

    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

pub(super) fn render_favorites(f: &mut Frame, app: &App, area: Rect) {
    let favorites = app.favorites();

    if !favorites.has_store() {
        empty_panel(
            f,
            app,
            area,
            " Favorites ",
            "Favorites are disabled: no document store is configured.",
        );
        return;
    }
    if favorites.identity().is_none() {
        empty_panel(
            f,
            app,
            area,
            " Favorites ",
            "Favorites are unavailable: no identity could be established for this session.",
        );
        return;
    }

    let entities = app.favorite_list();
    let title = match favorites.state() {
        SyncState::Error => format!(" Favorites ({}, sync failed) ", entities.len()),
        _ => format!(" Favorites ({}) ", entities.len()),
    };

    if entities.is_empty() {
        empty_panel(
            f,
            app,
            area,
            &title,
            "No favorites yet. Press Space on an entity to add it.",
        );
    } else {
        entity_list(f, app, &entities, &title, area);
    }
}

pub(super) fn render_search(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let input = Paragraph::new(format!("{}_", app.view().search_term()))
        .style(app.style("search_input"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(" Search by name or level "),
        );
    f.render_widget(input, chunks[0]);

    if app.view().search_term().is_empty() {
        empty_panel(f, app, chunks[1], " Results ", "Type to search.");
        return;
    }

    let results: Vec<Entity> = app.search_results().into_iter().cloned().collect();
    let title = if results.len() >= MAX_SEARCH_RESULTS {
        format!(" Results (first {MAX_SEARCH_RESULTS}) ")
    } else {
        format!(" Results ({}) ", results.len())
    };

    if results.is_empty() {
        empty_panel(f, app, chunks[1], &title, "No matches.");
    } else {
        entity_list(f, app, &results, &title, chunks[1]);
    }
}

/// Bordered list of entities with the cursor row highlighted.
fn entity_list(f: &mut Frame, app: &App, entities: &[Entity], title: &str, area: Rect) {
    let name_width = (area.width as usize)
        .saturating_sub(2)
        .saturating_sub(LEVEL_COLUMN);

    let items: Vec<ListItem> = entities
        .iter()
        .map(|entity| {
            let marker = if app.is_favorite(&entity.name) {
                Span::styled("★ ", app.style("favorite_marker"))
            } else {
                Span::raw("  ")
            };
            let name = pad_to_width(&truncate_to_width(&entity.name, name_width), name_width);
            ListItem::new(Line::from(vec![
                marker,
                Span::styled(name, app.style("list_normal")),
                Span::raw(" "),
                Span::styled(entity.level_label().to_string(), app.theme.tier(entity.tier())),
            ]))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(app.style("list_selected"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(title.to_string()),
        );

    let highlighted = app.cursor.min(entities.len().saturating_sub(1));
    let mut state = ListState::default().with_selected(Some(highlighted));
    f.render_stateful_widget(list, area, &mut state);
}

fn empty_panel(f: &mut Frame, app: &App, area: Rect, title: &str, message: &str) {
    let paragraph = Paragraph::new(message.to_string())
        .style(app.style("muted"))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border"))
                .title(title.to_string()),
        );
    f.render_widget(paragraph, area);
}
