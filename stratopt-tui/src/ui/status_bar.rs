//! Bottom status bar: key hints for the active panel, then the status message.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{AppState, Panel, StatusLevel};

fn hints(app: &AppState) -> &'static str {
    if app.is_editing() {
        return " type a number  Enter:commit  Esc:cancel";
    }
    match app.active_panel {
        Panel::Optimizer => " ↑↓←→:move Enter:edit r:run c:cancel d:defaults",
        Panel::Results => " ↑↓:select Enter:chart ←→+s:sort a:APY",
        Panel::Chart => " b:buy&hold x:export csv Esc:close",
        Panel::BuyHold => " ↑↓:move Enter:edit r:run",
        Panel::Signal => " ↑↓:move Enter:edit r:run d:defaults",
        Panel::Settings => " ↑↓←→:move Enter:edit s:save config u:undo",
        Panel::Help => " 1-7:panels Tab:next e:errors q:quit",
    }
}

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let mut spans: Vec<Span> = vec![Span::styled(hints(app), theme.muted())];

    spans.push(Span::raw(" | "));

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme.accent(),
            StatusLevel::Warning => theme.warning(),
            StatusLevel::Error => theme.negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
