//! Keyboard input dispatch: overlays, then an active edit, then global keys,
//! then panel-specific handlers.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{AppState, Overlay, Panel};
use crate::form::accepts;
use crate::table::Column;

pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.running = false;
        return;
    }

    // 1. Overlays consume input first.
    match app.overlay {
        Overlay::ConfigError => {
            handle_config_error(app, key);
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::None => {}
    }

    // 2. A number being typed takes every key, digits included.
    if app.is_editing() {
        handle_edit(app, key);
        return;
    }

    // 3. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char(c @ '1'..='7') => {
            if let Some(panel) = Panel::from_index(c as usize - '1' as usize) {
                app.active_panel = panel;
            }
            return;
        }
        KeyCode::Tab => {
            app.active_panel = app.active_panel.next();
            return;
        }
        KeyCode::BackTab => {
            app.active_panel = app.active_panel.prev();
            return;
        }
        KeyCode::Char('e') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
            return;
        }
        _ => {}
    }

    // Panels are inert until the config has loaded.
    if !app.is_ready() && app.active_panel != Panel::Help {
        return;
    }

    // 4. Panel-specific.
    match app.active_panel {
        Panel::Optimizer => handle_optimizer(app, key),
        Panel::Results => handle_results(app, key),
        Panel::Chart => handle_chart(app, key),
        Panel::BuyHold => handle_buy_hold(app, key),
        Panel::Signal => handle_signal(app, key),
        Panel::Settings => handle_settings(app, key),
        Panel::Help => {}
    }
}

fn handle_config_error(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('r') | KeyCode::Enter if !app.config_loading => app.request_config(),
        KeyCode::Char('q') | KeyCode::Esc => app.running = false,
        _ => {}
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('e') | KeyCode::Char('q') => app.overlay = Overlay::None,
        KeyCode::Down | KeyCode::Char('j') => {
            let last = app.error_history.len().saturating_sub(1);
            app.error_scroll = (app.error_scroll + 1).min(last);
        }
        KeyCode::Up | KeyCode::Char('k') => app.error_scroll = app.error_scroll.saturating_sub(1),
        KeyCode::Char('c') => {
            app.error_history.clear();
            app.error_scroll = 0;
        }
        _ => {}
    }
}

fn handle_edit(app: &mut AppState, key: KeyEvent) {
    let settings_panel = app.active_panel == Panel::Settings;
    let Some(form) = app.active_form_mut() else {
        return;
    };
    match key.code {
        KeyCode::Enter => {
            form.commit();
        }
        KeyCode::Esc => form.cancel_edit(),
        KeyCode::Backspace => {
            if let Some(buffer) = form.editing().as_mut() {
                buffer.pop();
            }
        }
        KeyCode::Char(c) if accepts(c) => {
            if let Some(buffer) = form.editing().as_mut() {
                buffer.push(c);
            }
        }
        _ => {}
    }
    if settings_panel {
        app.apply_settings_edits();
    }
}

/// Cursor movement and Enter/Space, shared by every form panel.
fn handle_form_keys(app: &mut AppState, key: KeyEvent) -> bool {
    let Some(form) = app.active_form_mut() else {
        return false;
    };
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => form.move_row(-1),
        KeyCode::Down | KeyCode::Char('j') => form.move_row(1),
        KeyCode::Left | KeyCode::Char('h') => form.move_col(-1),
        KeyCode::Right | KeyCode::Char('l') => form.move_col(1),
        KeyCode::Enter | KeyCode::Char(' ') => form.activate(),
        _ => return false,
    }
    true
}

fn handle_optimizer(app: &mut AppState, key: KeyEvent) {
    if handle_form_keys(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('r') => app.run_sweep(),
        KeyCode::Char('c') => app.cancel_sweep(),
        KeyCode::Char('d') => app.reset_ranges(),
        _ => {}
    }
}

fn handle_results(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.results.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.results.move_selection(1),
        KeyCode::PageUp => app.results.move_selection(-10),
        KeyCode::PageDown => app.results.move_selection(10),
        KeyCode::Home | KeyCode::Char('g') => app.results.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.results.select_last(),
        KeyCode::Left | KeyCode::Char('h') => app.results.move_column_cursor(-1),
        KeyCode::Right | KeyCode::Char('l') => app.results.move_column_cursor(1),
        KeyCode::Char('s') => {
            let column = app.results.cursor_column();
            app.results.sort_by(column);
        }
        KeyCode::Char('a') => app.results.sort_by(Column::Apy),
        KeyCode::Enter => app.toggle_drill(),
        KeyCode::Esc => app.close_drill(),
        KeyCode::Char('c') => app.cancel_sweep(),
        _ => {}
    }
}

fn handle_chart(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('b') => app.toggle_buy_hold_overlay(),
        KeyCode::Char('x') => app.export_chart(),
        KeyCode::Esc => app.close_drill(),
        _ => {}
    }
}

fn handle_buy_hold(app: &mut AppState, key: KeyEvent) {
    if handle_form_keys(app, key) {
        return;
    }
    if key.code == KeyCode::Char('r') {
        app.run_buy_hold();
    }
}

fn handle_signal(app: &mut AppState, key: KeyEvent) {
    if handle_form_keys(app, key) {
        return;
    }
    match key.code {
        KeyCode::Char('r') => app.run_signal(),
        KeyCode::Char('d') => app.reset_signal_params(),
        _ => {}
    }
}

fn handle_settings(app: &mut AppState, key: KeyEvent) {
    if handle_form_keys(app, key) {
        app.apply_settings_edits();
        return;
    }
    match key.code {
        KeyCode::Char('s') => app.save_config(),
        KeyCode::Char('u') => app.revert_config_draft(),
        _ => {}
    }
}
