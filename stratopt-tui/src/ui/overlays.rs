//! Overlay widgets: error history and the blocking config-error modal.

use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::AppState;
use crate::ui::centered_rect;

pub fn render_error_history(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let popup = centered_rect(80, 70, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.negative())
        .title(format!(
            " Error History ({}) [Esc]close [j/k]scroll [c]lear ",
            app.error_history.len()
        ))
        .title_style(theme.negative());

    let inner = block.inner(popup);
    f.render_widget(block, popup);

    if app.error_history.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("No errors recorded.", theme.muted())),
            inner,
        );
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for (i, err) in app.error_history.iter().enumerate().skip(app.error_scroll) {
        if lines.len() >= inner.height as usize {
            break;
        }
        let style = if i == app.error_scroll {
            theme.negative().add_modifier(Modifier::BOLD)
        } else {
            theme.muted()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("[{}] ", err.timestamp.format("%H:%M:%S")), theme.muted()),
            Span::styled(format!("[{}] ", err.category.label()), theme.warning()),
            Span::styled(err.message.as_str(), style),
        ]));
        if !err.context.is_empty() {
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(err.context.as_str(), theme.muted()),
            ]));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}

/// Modal shown while the config cannot be loaded. Only retry and quit work.
pub fn render_config_error(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let popup = centered_rect(60, 40, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.negative())
        .title(" Could not load config ")
        .title_style(theme.negative().add_modifier(Modifier::BOLD));

    let detail = app.config_error.as_deref().unwrap_or("unknown error");
    let action = if app.config_loading {
        Line::from(Span::styled("Retrying...", theme.warning()))
    } else {
        Line::from(vec![
            Span::styled("[r]", theme.accent_bold()),
            Span::styled(" retry   ", theme.muted()),
            Span::styled("[q]", theme.accent_bold()),
            Span::styled(" quit", theme.muted()),
        ])
    };

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("The backend at {} did not return its config.", app.backend_name),
            theme.text(),
        )),
        Line::from(""),
        Line::from(Span::styled(detail, theme.negative())),
        Line::from(""),
        action,
    ];

    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
        popup,
    );
}
