//! Layout and screen dispatch.

use crate::app::{App, Screen};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{details, help, info, lists, stats, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 10;

pub(super) fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    // EDGE-001: Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_nav(f, app, chunks[0]);

    if app.is_loading() {
        render_loading(f, app, chunks[1]);
    } else {
        match app.view().screen() {
            Screen::Home => lists::render_home(f, app, chunks[1]),
            Screen::Favorites => lists::render_favorites(f, app, chunks[1]),
            Screen::Search => lists::render_search(f, app, chunks[1]),
            Screen::Details => details::render(f, app, chunks[1]),
            Screen::Stats => stats::render(f, app, chunks[1]),
            Screen::Info => info::render(f, app, chunks[1]),
        }
    }

    status::render(f, app, chunks[2]);

    if app.show_help {
        help::render(f, app);
    }
}

/// Navigation bar. Details highlights Home, where it is entered from.
fn render_nav(f: &mut Frame, app: &App, area: Rect) {
    let current = match app.view().screen() {
        Screen::Details => Screen::Home,
        other => other,
    };

    let mut spans = vec![Span::styled(" digidex ", app.style("heading"))];
    for (i, screen) in Screen::NAV.iter().enumerate() {
        let style = if *screen == current {
            app.style("nav_active")
        } else {
            app.style("nav_inactive")
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!(" {} {} ", i + 1, screen.title()), style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Neutral loading screen shown until the catalog and the session are both ready.
fn render_loading(f: &mut Frame, app: &App, area: Rect) {
    let step = |done: bool, pending: &'static str, finished: &'static str| {
        if done {
            Line::from(Span::styled(format!("✓ {finished}"), app.style("muted")))
        } else {
            Line::from(Span::styled(format!("… {pending}"), app.style("body")))
        }
    };

    let lines = vec![
        Line::from(""),
        step(!app.catalog().is_loading(), "Loading catalog", "Catalog loaded"),
        step(app.session().ready, "Starting session", "Session ready"),
    ];

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border"))
                .title(" Loading "),
        );
    f.render_widget(paragraph, area);
}

/// Create a centered rectangle with the given percentage of the parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppEvent;
    use crate::catalog::Entity;
    use crate::config::Config;
    use crate::identity::SessionState;
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn loaded_app(tx: &mpsc::Sender<AppEvent>) -> App {
        let mut app = App::new(&Config::default(), None).unwrap();
        app.handle_event(
            AppEvent::CatalogLoaded(Ok(vec![
                Entity::new("Agumon", Some("Rookie"), None),
                Entity::new("Mystery", None, None),
            ])),
            tx,
        );
        app.handle_event(AppEvent::SessionReady(SessionState::unresolved()), tx);
        app
    }

    #[tokio::test]
    async fn test_loading_screen_until_ready() {
        let app = App::new(&Config::default(), None).unwrap();
        let screen = draw(&app, 80, 20);
        assert!(screen.contains("Loading catalog"));
        assert!(!screen.contains("Agumon"));
    }

    #[tokio::test]
    async fn test_every_screen_renders() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = loaded_app(&tx);

        assert!(draw(&app, 80, 20).contains("Agumon"));
        for screen in Screen::NAV {
            app.navigate(screen);
            draw(&app, 80, 20);
        }
        app.navigate(Screen::Home);
        app.select_highlighted();
        assert!(draw(&app, 80, 20).contains("Rookie"));

        app.show_help = true;
        assert!(draw(&app, 80, 24).contains("Help"));
    }

    #[tokio::test]
    async fn test_too_small_terminal() {
        let (tx, _rx) = mpsc::channel(8);
        let app = loaded_app(&tx);
        assert!(draw(&app, 30, 8).contains("Terminal too small"));
        assert!(draw(&app, 15, 2).contains("Too small"));
    }

    #[test]
    fn test_centered_rect() {
        let r = centered_rect(50, 50, Rect::new(0, 0, 100, 40));
        assert_eq!(r, Rect::new(25, 10, 50, 20));
    }
}
