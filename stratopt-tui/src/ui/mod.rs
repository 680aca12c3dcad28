//! Top-level UI layout: tab bar, the active panel, status bar, overlays.

pub mod buyhold_panel;
pub mod chart_panel;
pub mod help_panel;
pub mod optimizer_panel;
pub mod overlays;
pub mod results_panel;
pub mod settings_panel;
pub mod signal_panel;
pub mod status_bar;
pub mod widgets;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{AppState, Overlay, Panel};

pub fn draw(f: &mut Frame, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_tabs(f, chunks[0], app);
    draw_panel(f, chunks[1], app);
    status_bar::render(f, chunks[2], app);

    match app.overlay {
        Overlay::ErrorHistory => overlays::render_error_history(f, chunks[1], app),
        Overlay::ConfigError => overlays::render_config_error(f, chunks[1], app),
        Overlay::None => {}
    }
}

fn draw_tabs(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let mut spans = vec![Span::styled(format!(" {} ", app.ticker), theme.accent_bold())];
    for panel in Panel::ALL {
        let label = format!(" {}:{} ", panel.index() + 1, panel.label());
        let style = if panel == app.active_panel {
            theme.accent_bold().add_modifier(ratatui::style::Modifier::REVERSED)
        } else {
            theme.muted()
        };
        spans.push(Span::styled(label, style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let panel = app.active_panel;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.border(true))
        .title(format!(" {} [{}] ", panel.label(), panel.index() + 1))
        .title_style(app.theme.accent_bold());

    let inner = block.inner(area);
    f.render_widget(block, area);

    if !app.is_ready() && panel != Panel::Help {
        render_locked(f, inner, app);
        return;
    }

    match panel {
        Panel::Optimizer => optimizer_panel::render(f, inner, app),
        Panel::Results => results_panel::render(f, inner, app),
        Panel::Chart => chart_panel::render(f, inner, app),
        Panel::BuyHold => buyhold_panel::render(f, inner, app),
        Panel::Signal => signal_panel::render(f, inner, app),
        Panel::Settings => settings_panel::render(f, inner, app),
        Panel::Help => help_panel::render(f, inner, app),
    }
}

fn render_locked(f: &mut Frame, area: Rect, app: &AppState) {
    let msg = if app.config_loading {
        format!("Loading config from {}...", app.backend_name)
    } else {
        "Config not loaded.".to_string()
    };
    widgets::render_hint(f, area, &app.theme, &[msg.as_str()]);
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
