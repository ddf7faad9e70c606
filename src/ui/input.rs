//! Keyboard input handling.
//!
//! Keys map onto `App` intents. The Search screen owns the keyboard while
//! it is shown: printable keys edit the term, and erasing the term returns
//! to Home.

use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::loop_runner::Action;
use crate::app::{App, AppEvent, Screen};
use crate::util::validate_url_for_open;

pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }

    if app.show_help {
        if matches!(code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return Action::Continue;
    }

    if app.is_loading() {
        return match code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('?') => {
                app.show_help = true;
                Action::Continue
            }
            _ => Action::Continue,
        };
    }

    if app.view().screen() == Screen::Search {
        return handle_search_input(app, code, modifiers, tx);
    }

    let screen = app.view().screen();
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('t') => app.cycle_theme(),
        KeyCode::Tab => app.navigate(screen.next_tab()),
        KeyCode::BackTab => app.navigate(screen.prev_tab()),
        KeyCode::Char('/') => app.navigate(Screen::Search),
        KeyCode::Char(c @ '1'..='5') => {
            let slot = (c as usize) - ('1' as usize);
            app.navigate(Screen::NAV[slot]);
        }
        _ => {
            let handled = match screen {
                Screen::Home => handle_home_input(app, code, tx),
                Screen::Favorites => handle_list_input(app, code, tx),
                Screen::Details => handle_details_input(app, code, tx),
                Screen::Stats | Screen::Info => {
                    let back = matches!(code, KeyCode::Esc | KeyCode::Char('b'));
                    if back {
                        app.navigate(Screen::Home);
                    }
                    back
                }
                Screen::Search => false,
            };
            if !handled {
                tracing::trace!(?code, "Unbound key");
            }
        }
    }
    Action::Continue
}

/// Cursor movement, selection and favorite toggling shared by list screens.
/// Returns false if the key was not handled.
fn handle_list_input(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AppEvent>) -> bool {
    match code {
        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(-1),
        KeyCode::Enter | KeyCode::Char('l') => {
            app.select_highlighted();
        }
        KeyCode::Char(' ') | KeyCode::Char('f') => {
            app.toggle_current_favorite(tx);
        }
        _ => return false,
    }
    true
}

fn handle_home_input(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AppEvent>) -> bool {
    if handle_list_input(app, code, tx) {
        return true;
    }
    match code {
        KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => app.next_page(),
        KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => app.prev_page(),
        KeyCode::Char('g') | KeyCode::Home => app.first_page(),
        KeyCode::Char('G') | KeyCode::End => app.last_page(),
        _ => false,
    }
}

fn handle_details_input(app: &mut App, code: KeyCode, tx: &mpsc::Sender<AppEvent>) -> bool {
    match code {
        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('h') | KeyCode::Backspace => {
            app.navigate(Screen::Home);
        }
        KeyCode::Char(' ') | KeyCode::Char('f') => {
            app.toggle_current_favorite(tx);
        }
        KeyCode::Char('o') => open_selected_image(app),
        _ => return false,
    }
    true
}

fn open_selected_image(app: &mut App) {
    let Some(image) = app.view().selected().and_then(|e| e.image.clone()) else {
        app.set_status("No image for this entity");
        return;
    };
    // SEC: Validate URL before open::that() to prevent command injection
    if let Err(e) = validate_url_for_open(&image) {
        app.set_status(e.to_string());
    } else if let Err(e) = open::that(&*image) {
        app.set_status(format!("Failed to open browser: {}", e));
    } else {
        app.set_status("Opening image...");
    }
}

fn handle_search_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match code {
        KeyCode::Esc => {
            app.set_search_term("");
            app.navigate(Screen::Home);
        }
        KeyCode::Backspace => {
            let mut term = app.view().search_term().to_string();
            term.pop();
            app.set_search_term(&term);
            if term.is_empty() {
                app.navigate(Screen::Home);
            }
        }
        KeyCode::Down => app.move_cursor(1),
        KeyCode::Up => app.move_cursor(-1),
        KeyCode::Enter => {
            app.select_highlighted();
        }
        KeyCode::Tab => app.navigate(Screen::Search.next_tab()),
        KeyCode::BackTab => app.navigate(Screen::Search.prev_tab()),
        KeyCode::Char('f') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.toggle_current_favorite(tx);
        }
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) && !c.is_control() => {
            let mut term = app.view().search_term().to_string();
            term.push(c);
            app.set_search_term(&term);
        }
        _ => {}
    }
    Action::Continue
}
