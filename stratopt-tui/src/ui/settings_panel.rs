//! Settings panel (key 6): local preferences and the backend config draft.

use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use stratopt_core::ParamName;

use crate::app::AppState;
use crate::form::{format_param, RangePart, SettingsForm, SettingsRow};
use crate::ui::widgets::{field_span, row_label};

const CELL: usize = 12;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let form = &app.settings_form;
    let settings = form.settings();
    let dirty = app.config.as_ref() != Some(&form.draft);

    let heading = theme.accent_bold().add_modifier(Modifier::UNDERLINED);
    let cell = |row: usize, col: usize, text: String| {
        let selected = form.row == row && form.col == col;
        field_span(
            theme,
            text,
            CELL,
            selected,
            if selected { form.editing.as_deref() } else { None },
        )
    };

    let mut lines = vec![Line::from(Span::styled("  Local (saved immediately)", heading))];
    for row in 0..4 {
        let (label, value) = match SettingsForm::kind_at(row) {
            SettingsRow::Theme => ("Theme", settings.theme.clone()),
            SettingsRow::InputType => ("Data source", settings.input_type.label().to_string()),
            SettingsRow::CashRate => ("Cash rate", settings.cash_rate.to_string()),
            SettingsRow::StartPosition => ("Start", settings.start_invested.label().to_string()),
            _ => continue,
        };
        lines.push(Line::from(vec![
            row_label(theme, label, form.row == row),
            cell(row, 0, value),
        ]));
    }

    lines.push(Line::from(""));
    let status = if app.config_saving {
        Span::styled("  saving...", theme.warning())
    } else if dirty {
        Span::styled("  unsaved changes (s: save, u: undo)", theme.warning())
    } else {
        Span::styled("  in sync with backend", theme.muted())
    };
    lines.push(Line::from(vec![
        Span::styled("  Backend config", heading),
        status,
    ]));

    let n = ParamName::ALL.len();
    for (i, name) in ParamName::ALL.iter().enumerate() {
        let row = 4 + i;
        let def = form.draft.default_params.get(*name);
        lines.push(Line::from(vec![
            row_label(theme, name.as_str(), form.row == row),
            cell(row, 0, format_param(*name, def.value)),
            Span::styled(def.desc.clone(), theme.muted()),
        ]));
    }

    lines.push(Line::from(""));
    let mut header = vec![Span::styled(format!("  {:<12}", "Range"), theme.muted())];
    for part in RangePart::ALL {
        header.push(Span::styled(format!("{:<CELL$}", part.label()), theme.muted()));
    }
    lines.push(Line::from(header));

    for (i, name) in ParamName::ALL.iter().enumerate() {
        let row = 4 + n + i;
        let range = form.draft.default_ranges.get(*name);
        let mut spans = vec![row_label(theme, name.as_str(), form.row == row)];
        for (col, part) in RangePart::ALL.iter().enumerate() {
            spans.push(cell(row, col, part.get(range).to_string()));
        }
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines), area);
}
