//! Buy & Hold panel (key 4): baseline backtest for the configured ticker.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use stratopt_core::merge_curves;

use crate::app::AppState;
use crate::ui::widgets::{
    field_span, performance_lines, render_equity_chart, render_hint, render_trades, row_label,
};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(6),
        ])
        .split(area);

    render_form(f, chunks[0], app);

    let theme = &app.theme;
    let view = &app.buyhold_view;
    if view.loading {
        render_hint(f, chunks[1], theme, &[&format!("Running buy & hold for {}...", app.ticker)]);
        return;
    }
    if let Some(err) = &view.error {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(format!("  Buy & hold failed: {err}"), theme.negative())),
        ];
        f.render_widget(Paragraph::new(lines), chunks[1]);
        return;
    }
    let Some(result) = &view.result else {
        render_hint(f, chunks[1], theme, &["Press r to run buy & hold."]);
        return;
    };

    f.render_widget(
        Paragraph::new(performance_lines(theme, result.apy, result.final_value)),
        chunks[1],
    );
    let points = merge_curves(&result.equity_curve, None, &result.buy_dates, &result.sell_dates);
    render_equity_chart(f, chunks[2], theme, &points, &format!("{} buy & hold", app.ticker));
    render_trades(f, chunks[3], theme, &result.trade_history);
}

fn render_form(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let form = &app.buyhold;
    let rows = [
        ("Data source", form.options.input_type.label().to_string()),
        ("Cash rate", form.options.cash_rate.to_string()),
    ];

    let mut lines = vec![Line::from(vec![
        Span::styled("  Ticker: ", theme.muted()),
        Span::styled(app.ticker.clone(), theme.accent_bold()),
    ])];
    for (row, (label, value)) in rows.into_iter().enumerate() {
        let selected = form.row == row;
        lines.push(Line::from(vec![
            row_label(theme, label, selected),
            field_span(
                theme,
                value,
                12,
                selected,
                if selected { form.editing.as_deref() } else { None },
            ),
        ]));
    }
    f.render_widget(Paragraph::new(lines), area);
}
