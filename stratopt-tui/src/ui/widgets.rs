//! Rendering helpers shared by several panels.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use stratopt_core::{value_bounds, ChartPoint, TradeAction, TradeEvent};

use crate::table::format_percent;
use crate::theme::Theme;

/// Muted hint lines, for panels with nothing to show yet.
pub fn render_hint(f: &mut Frame, area: Rect, theme: &Theme, hints: &[&str]) {
    let mut lines = vec![Line::from("")];
    for hint in hints {
        lines.push(Line::from(Span::styled(format!("  {hint}"), theme.muted())));
    }
    f.render_widget(Paragraph::new(lines), area);
}

pub fn metric_line<'a>(lines: &mut Vec<Line<'a>>, theme: &Theme, label: &str, value: String) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {label:>12}: "), theme.muted()),
        Span::styled(value, theme.accent()),
    ]));
}

/// APY and final value, colored by sign.
pub fn performance_lines<'a>(theme: &Theme, apy: f64, final_value: f64) -> Vec<Line<'a>> {
    vec![
        Line::from(vec![
            Span::styled(format!("  {:>12}: ", "APY"), theme.muted()),
            Span::styled(format_percent(apy), theme.signed(apy).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::styled(format!("  {:>12}: ", "Final value"), theme.muted()),
            Span::styled(format!("{final_value:.6}"), theme.signed(final_value - 1.0)),
        ]),
    ]
}

/// A form cell: highlighted under the cursor, showing the edit buffer while typing.
pub fn field_span<'a>(
    theme: &Theme,
    text: String,
    width: usize,
    selected: bool,
    editing: Option<&str>,
) -> Span<'a> {
    match (selected, editing) {
        (true, Some(buffer)) => Span::styled(
            format!("{:<width$}", format!("{buffer}_")),
            theme.warning().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ),
        (true, None) => Span::styled(
            format!("{text:<width$}"),
            theme.accent().add_modifier(Modifier::REVERSED),
        ),
        (false, _) => Span::styled(format!("{text:<width$}"), theme.text()),
    }
}

/// Label column for a form row.
pub fn row_label<'a>(theme: &Theme, label: &str, selected: bool) -> Span<'a> {
    let marker = if selected { "▸ " } else { "  " };
    let style = if selected {
        theme.accent_bold()
    } else {
        theme.muted()
    };
    Span::styled(format!("{marker}{label:<12}"), style)
}

/// Equity chart over merged points: the strategy line, the optional
/// buy-and-hold line, and buy/sell markers on the strategy line.
pub fn render_equity_chart(f: &mut Frame, area: Rect, theme: &Theme, points: &[ChartPoint], title: &str) {
    let Some((lo, hi)) = value_bounds(points) else {
        render_hint(f, area, theme, &["The result has an empty equity curve."]);
        return;
    };
    let padding = ((hi - lo).abs() * 0.05).max(0.01);
    let (y_min, y_max) = (lo - padding, hi + padding);
    let x_max = points.len().saturating_sub(1).max(1) as f64;

    let strategy: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.strategy))
        .collect();
    let buy_hold: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.buy_hold.map(|v| (i as f64, v)))
        .collect();
    let buys: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_buy)
        .map(|(i, p)| (i as f64, p.strategy))
        .collect();
    let sells: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_sell)
        .map(|(i, p)| (i as f64, p.strategy))
        .collect();

    let mut datasets = vec![Dataset::default()
        .name(title.to_string())
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(theme.accent))
        .graph_type(GraphType::Line)
        .data(&strategy)];
    if !buy_hold.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Buy & Hold")
                .marker(symbols::Marker::Braille)
                .style(Style::default().fg(theme.neutral))
                .graph_type(GraphType::Line)
                .data(&buy_hold),
        );
    }
    if !buys.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Buy")
                .marker(symbols::Marker::Dot)
                .style(theme.positive().add_modifier(Modifier::BOLD))
                .graph_type(GraphType::Scatter)
                .data(&buys),
        );
    }
    if !sells.is_empty() {
        datasets.push(
            Dataset::default()
                .name("Sell")
                .marker(symbols::Marker::Dot)
                .style(theme.negative().add_modifier(Modifier::BOLD))
                .graph_type(GraphType::Scatter)
                .data(&sells),
        );
    }

    let first = points.first().map(|p| p.date.to_string()).unwrap_or_default();
    let last = points.last().map(|p| p.date.to_string()).unwrap_or_default();

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .style(theme.muted())
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::styled(first, theme.muted()),
                    Span::styled(last, theme.muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(theme.muted())
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::styled(format!("{y_min:.2}"), theme.muted()),
                    Span::styled(format!("{:.2}", (y_min + y_max) / 2.0), theme.muted()),
                    Span::styled(format!("{y_max:.2}"), theme.muted()),
                ]),
        );

    f.render_widget(chart, area);
}

fn reading(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "-".into())
}

/// Trade history, newest last, scrolled so the most recent trades are visible.
pub fn render_trades(f: &mut Frame, area: Rect, theme: &Theme, trades: &[TradeEvent]) {
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "  {:<10}  {:<4}  {:>9}  {:>7}  {:>7}  {:>8}  {:>8}",
            "Date", "Side", "Price", "Spread", "CHG4", "RET3", "ΔSpread"
        ),
        theme.muted().add_modifier(Modifier::BOLD),
    ))];

    if trades.is_empty() {
        lines.push(Line::from(Span::styled("  No trades.", theme.muted())));
        f.render_widget(Paragraph::new(lines), area);
        return;
    }

    let visible = (area.height as usize).saturating_sub(1);
    let skip = trades.len().saturating_sub(visible);
    for trade in &trades[skip..] {
        let (side, style) = match trade.action {
            TradeAction::Buy => ("BUY", theme.positive()),
            TradeAction::Sell => ("SELL", theme.negative()),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<10}  ", trade.date), theme.text()),
            Span::styled(format!("{side:<4}"), style),
            Span::styled(
                format!(
                    "  {:>9.2}  {:>7}  {:>7}  {:>8}  {:>8}",
                    trade.price,
                    reading(trade.spread, 2),
                    reading(trade.chg4, 3),
                    reading(trade.ret3, 4),
                    reading(trade.spread_delta, 3),
                ),
                theme.text(),
            ),
        ]));
    }

    f.render_widget(Paragraph::new(lines), area);
}
