//! Chart panel (key 3): the open drill-down's equity curve with the
//! buy-and-hold overlay and trade markers.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{AppState, EXPORT_FILE};
use crate::table::format_percent;
use crate::ui::widgets::{render_equity_chart, render_hint, render_trades};

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let drill = app.drill.state();

    let Some(params) = drill.open else {
        render_hint(
            f,
            area,
            theme,
            &[
                "No row selected.",
                "Go to Results (press 2), pick a row and press Enter.",
            ],
        );
        return;
    };

    if drill.loading {
        render_hint(f, area, theme, &[&format!("Running backtest for {params}...")]);
        return;
    }
    if let Some(err) = &drill.error {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(format!("  Backtest failed for {params}"), theme.negative())),
            Line::from(Span::styled(format!("  {err}"), theme.negative())),
        ];
        f.render_widget(Paragraph::new(lines), area);
        return;
    }
    let (Some(result), Some(points)) = (&drill.result, app.chart_points()) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(8),
            Constraint::Length(8),
        ])
        .split(area);

    let overlay = &app.chart.overlay;
    let overlay_status = match (app.chart.show_buy_hold, overlay.loading, &overlay.error) {
        (false, _, _) => Span::styled("buy & hold hidden", theme.muted()),
        (true, true, _) => Span::styled("buy & hold loading...", theme.muted()),
        (true, false, Some(_)) => Span::styled("buy & hold unavailable", theme.warning()),
        (true, false, None) => Span::styled("buy & hold shown", theme.neutral()),
    };

    let header = vec![
        Line::from(vec![
            Span::styled(params.to_string(), theme.accent_bold()),
            Span::styled("  APY ", theme.muted()),
            Span::styled(format_percent(result.apy), theme.signed(result.apy)),
            Span::styled(format!("  final {:.6}  ", result.final_value), theme.muted()),
            overlay_status,
        ]),
        Line::from(Span::styled(
            format!("  b: toggle buy & hold   x: export {EXPORT_FILE}"),
            theme.muted(),
        )),
    ];
    f.render_widget(Paragraph::new(header), chunks[0]);

    render_equity_chart(f, chunks[1], theme, &points, "Strategy");
    render_trades(f, chunks[2], theme, &result.trade_history);
}
