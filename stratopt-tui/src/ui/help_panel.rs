//! Help panel (key 7): keyboard shortcuts.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::AppState;
use crate::theme::Theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let theme = &app.theme;
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, theme, "Global");
    key(&mut lines, theme, "1-7", "Switch to panel by number");
    key(&mut lines, theme, "Tab / Shift+Tab", "Cycle panels forward / back");
    key(&mut lines, theme, "e", "Error history");
    key(&mut lines, theme, "q / Ctrl-C", "Quit");
    lines.push(Line::from(""));

    section(&mut lines, theme, "Forms (Optimizer, Buy & Hold, Signal, Settings)");
    key(&mut lines, theme, "arrows / hjkl", "Move the cursor");
    key(&mut lines, theme, "Enter / Space", "Edit a number or flip a toggle");
    key(&mut lines, theme, "Enter / Esc", "Commit / cancel an edit");
    lines.push(Line::from(""));

    section(&mut lines, theme, "Optimizer (1)");
    key(&mut lines, theme, "r", "Run the sweep over the grid");
    key(&mut lines, theme, "c", "Cancel the running sweep");
    key(&mut lines, theme, "d", "Reset ranges to the config defaults");
    lines.push(Line::from(""));

    section(&mut lines, theme, "Results (2)");
    key(&mut lines, theme, "j / k, PgUp / PgDn", "Move the selection");
    key(&mut lines, theme, "g / G", "First / last row");
    key(&mut lines, theme, "h / l, s", "Pick a column, sort by it");
    key(&mut lines, theme, "a", "Sort by APY");
    key(&mut lines, theme, "Enter", "Open or close the chart for the row");
    lines.push(Line::from(""));

    section(&mut lines, theme, "Chart (3)");
    key(&mut lines, theme, "b", "Show / hide the buy & hold overlay");
    key(&mut lines, theme, "x", "Export the chart to CSV");
    key(&mut lines, theme, "Esc", "Close the chart");
    lines.push(Line::from(""));

    section(&mut lines, theme, "Buy & Hold, Signal (4-5)");
    key(&mut lines, theme, "r", "Run");
    key(&mut lines, theme, "d", "Signal: reset params to the config defaults");
    lines.push(Line::from(""));

    section(&mut lines, theme, "Settings (6)");
    key(&mut lines, theme, "s", "Save the config draft to the backend");
    key(&mut lines, theme, "u", "Discard the config draft");

    f.render_widget(Paragraph::new(lines), area);
}

fn section<'a>(lines: &mut Vec<Line<'a>>, theme: &Theme, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme.accent_bold())));
}

fn key<'a>(lines: &mut Vec<Line<'a>>, theme: &Theme, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {keys:>20}  "), theme.accent()),
        Span::styled(desc.to_string(), theme.muted()),
    ]));
}
