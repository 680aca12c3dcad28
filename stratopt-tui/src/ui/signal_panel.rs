//! Signal panel (key 5): the strategy's current recommendation for one parameter set.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use stratopt_core::{ParamName, Signal, SignalResponse};

use crate::app::AppState;
use crate::form::{format_param, SignalForm};
use crate::theme::Theme;
use crate::ui::widgets::{
    field_span, metric_line, performance_lines, render_hint, render_trades, row_label,
};

const CELL: usize = 12;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(30)])
        .split(area);

    render_form(f, columns[0], app);

    let theme = &app.theme;
    let view = &app.signal_view;
    if view.loading {
        render_hint(f, columns[1], theme, &["Computing signal..."]);
        return;
    }
    if let Some(err) = &view.error {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(format!("  Signal failed: {err}"), theme.negative())),
        ];
        f.render_widget(Paragraph::new(lines), columns[1]);
        return;
    }
    match &view.result {
        Some(resp) => render_response(f, columns[1], theme, resp),
        None => render_hint(f, columns[1], theme, &["Press r to compute the current signal."]),
    }
}

fn render_form(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let form = &app.signal;
    let editing = |selected: bool| if selected { form.editing.as_deref() } else { None };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Ticker: ", theme.muted()),
            Span::styled(app.ticker.clone(), theme.accent_bold()),
        ]),
        Line::from(""),
    ];
    for (row, name) in ParamName::ALL.iter().enumerate() {
        let selected = form.row == row;
        lines.push(Line::from(vec![
            row_label(theme, name.as_str(), selected),
            field_span(
                theme,
                format_param(*name, form.params.get(*name)),
                CELL,
                selected,
                editing(selected),
            ),
        ]));
    }
    lines.push(Line::from(""));

    let options = [
        (SignalForm::ROW_START, "Start", form.options.start_invested.label().to_string()),
        (SignalForm::ROW_CASH_RATE, "Cash rate", form.options.cash_rate.to_string()),
        (SignalForm::ROW_INPUT_TYPE, "Data source", form.options.input_type.label().to_string()),
    ];
    for (row, label, value) in options {
        let selected = form.row == row;
        lines.push(Line::from(vec![
            row_label(theme, label, selected),
            field_span(theme, value, CELL, selected, editing(selected)),
        ]));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn render_response(f: &mut Frame, area: Rect, theme: &Theme, resp: &SignalResponse) {
    let badge_style = match resp.signal {
        Signal::Buy => theme.positive(),
        Signal::Sell => theme.negative(),
        Signal::Hold => theme.neutral(),
    }
    .add_modifier(Modifier::BOLD | Modifier::REVERSED);

    let m = &resp.metrics;
    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Signal: ", theme.muted()),
            Span::styled(format!(" {} ", resp.signal), badge_style),
            Span::styled(format!("  as of {}", m.last_date), theme.muted()),
        ]),
        Line::from(""),
    ];

    let reading = |v: Option<f64>, decimals: usize| {
        v.map(|v| format!("{v:.decimals$}")).unwrap_or_else(|| "-".into())
    };
    metric_line(&mut lines, theme, "Close", format!("{:.2}", m.close));
    metric_line(&mut lines, theme, "MA", reading(m.ma, 2));
    metric_line(&mut lines, theme, "Spread", reading(m.spread, 2));
    metric_line(&mut lines, theme, "ΔSpread", reading(m.spread_delta, 3));
    metric_line(&mut lines, theme, "CHG4", reading(m.chg4, 3));
    metric_line(&mut lines, theme, "RET3", reading(m.ret3, 4));
    lines.push(Line::from(""));
    lines.extend(performance_lines(theme, resp.apy, resp.final_value));

    let height = lines.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(height), Constraint::Min(3)])
        .split(area);
    f.render_widget(Paragraph::new(lines), chunks[0]);
    render_trades(f, chunks[1], theme, &resp.trade_history);
}
