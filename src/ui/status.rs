use crate::app::{App, Screen};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar
pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    // EDGE-001: Guard against zero-width/height areas
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if app.is_loading() {
        Cow::Borrowed("Loading... [?]help [q]uit")
    } else {
        match app.view().screen() {
            Screen::Home => Cow::Owned(format!(
                "Page {}/{} [n/p]page [Enter]details [Space]favorite [/]search [q]uit",
                app.view().page_index(),
                app.total_pages().max(1)
            )),
            Screen::Favorites => {
                Cow::Borrowed("[j/k]move [Enter]details [Space]remove [Tab]switch [q]uit")
            }
            Screen::Search => Cow::Borrowed("Type to search | ESC clear | ENTER details"),
            Screen::Details => Cow::Borrowed("[b]ack [Space]favorite [o]pen image [q]uit"),
            Screen::Stats | Screen::Info => Cow::Borrowed("[Tab]switch [?]help [q]uit"),
        }
    };

    f.render_widget(Paragraph::new(text).style(app.style("status_bar")), area);
}
