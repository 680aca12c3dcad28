//! Optimizer panel (key 1): range editor, run options and sweep progress.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Gauge, Paragraph};
use ratatui::Frame;

use stratopt_core::ParamName;

use crate::app::AppState;
use crate::form::{OptimizerForm, RangePart};
use crate::ui::widgets::{field_span, render_hint, row_label};

const CELL: usize = 12;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(4),
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    render_ranges(f, chunks[0], app);
    render_options(f, chunks[1], app);
    render_grid_summary(f, chunks[2], app);
    render_progress(f, chunks[3], app);
}

fn render_ranges(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let form = &app.optimizer;

    let mut header = vec![Span::styled(format!("  {:<12}", "Param"), theme.muted())];
    for part in RangePart::ALL {
        header.push(Span::styled(format!("{:<CELL$}", part.label()), theme.muted()));
    }
    let mut lines = vec![
        Line::from(header).style(theme.muted().add_modifier(Modifier::BOLD)),
        Line::from(""),
    ];

    for (row, name) in ParamName::ALL.iter().enumerate() {
        let range = form.ranges.get(*name);
        let on_row = form.row == row;
        let mut spans = vec![row_label(theme, name.as_str(), on_row)];
        for (col, part) in RangePart::ALL.iter().enumerate() {
            let selected = on_row && form.col == col;
            spans.push(field_span(
                theme,
                part.get(range).to_string(),
                CELL,
                selected,
                if selected { form.editing.as_deref() } else { None },
            ));
        }
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn render_options(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let form = &app.optimizer;
    let rows = [
        (OptimizerForm::ROW_INPUT_TYPE, "Data source", form.options.input_type.label().to_string()),
        (OptimizerForm::ROW_CASH_RATE, "Cash rate", form.options.cash_rate.to_string()),
        (OptimizerForm::ROW_START, "Start", form.options.start_invested.label().to_string()),
    ];

    let mut lines = vec![Line::from("")];
    for (row, label, value) in rows {
        let selected = form.row == row;
        lines.push(Line::from(vec![
            row_label(theme, label, selected),
            field_span(
                theme,
                value,
                CELL,
                selected,
                if selected { form.editing.as_deref() } else { None },
            ),
        ]));
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn render_grid_summary(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let line = match app.optimizer.ranges.to_grids() {
        Ok(grids) => Line::from(vec![
            Span::styled("  Grid: ", theme.muted()),
            Span::styled(format!("{} combinations", grids.combinations()), theme.accent()),
        ]),
        Err(e) => Line::from(vec![
            Span::styled("  Grid: ", theme.muted()),
            Span::styled(e.to_string(), theme.negative()),
        ]),
    };
    f.render_widget(Paragraph::new(vec![Line::from(""), line]), area);
}

fn render_progress(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let state = app.session.state();

    if state.loading {
        let (ratio, label) = match state.progress {
            Some(p) => (p.ratio(), format!("{} / {}", p.current, p.total)),
            None => (0.0, "starting...".to_string()),
        };
        let gauge = Gauge::default()
            .gauge_style(theme.accent())
            .ratio(ratio)
            .label(Span::styled(label, theme.text().add_modifier(Modifier::BOLD)));
        let inner = Rect {
            x: area.x + 2,
            width: area.width.saturating_sub(4),
            y: area.y + 1,
            height: 1,
        };
        f.render_widget(gauge, inner);
        return;
    }

    match (&state.result, &state.error) {
        (_, Some(err)) => {
            let lines = vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Sweep failed: ", theme.negative().add_modifier(Modifier::BOLD)),
                    Span::styled(err.as_str(), theme.negative()),
                ]),
            ];
            f.render_widget(Paragraph::new(lines), area);
        }
        (Some(response), None) => {
            let lines = vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled("  Best: ", theme.muted()),
                    Span::styled(response.best_params.to_string(), theme.positive()),
                    Span::styled("  (press 2 for results)", theme.muted()),
                ]),
            ];
            f.render_widget(Paragraph::new(lines), area);
        }
        (None, None) => render_hint(f, area, theme, &["Press r to run the sweep."]),
    }
}
