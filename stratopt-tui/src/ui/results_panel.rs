//! Results panel (key 2): the sortable result table and drill-down status.

use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::AppState;
use crate::table::Column;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let table = &app.results;
    let drill = app.drill.state();
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(format!("{} rows", table.rows().len()), theme.accent()),
        Span::styled(drill_status(app), theme.muted()),
    ]));
    lines.push(Line::from(""));

    if table.is_empty() {
        let msg = if app.session.is_loading() {
            "Sweep running..."
        } else {
            "No results yet. Run a sweep from the Optimizer panel (press 1, then r)."
        };
        lines.push(Line::from(Span::styled(msg, theme.muted())));
        f.render_widget(Paragraph::new(lines), area);
        return;
    }

    // Column headers, with the sort arrow and the sort cursor.
    let (sort_column, direction) = table.sort_state();
    let mut header = vec![Span::raw("  ")];
    for (i, column) in Column::ALL.iter().enumerate() {
        let arrow = if *column == sort_column { direction.arrow() } else { "" };
        let text = format!("{:>w$} ", format!("{}{arrow}", column.header()), w = column.width());
        let mut style = theme.accent_bold();
        if i == table.column_cursor {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        header.push(Span::styled(text, style));
    }
    lines.push(Line::from(header));

    let visible = area.height.saturating_sub(4) as usize;
    let selected = table.selected_index().unwrap_or(0);
    let start = selected.saturating_sub(visible.saturating_sub(1));
    let end = (start + visible).min(table.rows().len());

    for (i, row) in table.rows()[start..end].iter().enumerate() {
        let is_cursor = start + i == selected;
        let params = row.params();
        let marker = if drill.is_open_for(&params) {
            "◆ "
        } else if table.is_best(row) {
            "★ "
        } else {
            "  "
        };

        let base = if is_cursor {
            theme.accent().add_modifier(Modifier::REVERSED)
        } else {
            theme.text()
        };

        let mut spans = vec![Span::styled(marker, theme.warning())];
        for column in Column::ALL {
            let style = match column {
                Column::Apy if !is_cursor => theme.signed(row.apy),
                _ => base,
            };
            spans.push(Span::styled(
                format!("{:>w$} ", column.format(row), w = column.width()),
                style,
            ));
        }
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn drill_status(app: &AppState) -> String {
    let drill = app.drill.state();
    match (&drill.open, drill.loading, &drill.error) {
        (None, _, _) => "  Enter: open chart for the selected row".into(),
        (Some(p), true, _) => format!("  Loading backtest for {p}..."),
        (Some(_), false, Some(e)) => format!("  Backtest failed: {e}"),
        (Some(p), false, None) => format!("  Chart open for {p} (press 3)"),
    }
}
