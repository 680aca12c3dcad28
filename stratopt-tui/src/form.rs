//! Editable panel forms.
//!
//! Each form is a list of rows with a cursor. A row is either a number,
//! edited through a text buffer and committed with `coerce_number`, or a
//! toggle flipped in place.

use stratopt_core::{
    coerce_number, AppConfig, InputType, ParamName, ParamRange, ParamRanges, Settings,
    StartPosition, StrategyParams,
};

/// Options a run is submitted with, seeded from the persisted settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub input_type: InputType,
    pub cash_rate: f64,
    pub start_invested: StartPosition,
}

impl From<&Settings> for RunOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            input_type: settings.input_type,
            cash_rate: settings.cash_rate,
            start_invested: settings.start_invested,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePart {
    Min,
    Max,
    Step,
}

impl RangePart {
    pub const ALL: [RangePart; 3] = [RangePart::Min, RangePart::Max, RangePart::Step];

    pub fn label(self) -> &'static str {
        match self {
            RangePart::Min => "Min",
            RangePart::Max => "Max",
            RangePart::Step => "Step",
        }
    }

    pub fn get(self, range: &ParamRange) -> f64 {
        match self {
            RangePart::Min => range.min,
            RangePart::Max => range.max,
            RangePart::Step => range.step,
        }
    }

    pub fn set(self, range: &mut ParamRange, value: f64) {
        match self {
            RangePart::Min => range.min = value,
            RangePart::Max => range.max = value,
            RangePart::Step => range.step = value,
        }
    }
}

/// Characters accepted while typing a number.
pub fn accepts(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')
}

/// Text shown when a number starts being edited.
pub fn edit_text(value: f64) -> String {
    value.to_string()
}

/// Fixed-precision display for a parameter value.
pub fn format_param(name: ParamName, value: f64) -> String {
    format!("{:.*}", name.display_decimals(), value)
}

/// What the cursor is on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Number(f64),
    Toggle,
}

/// Cursor movement and commit shared by every form.
pub trait Form {
    fn row_count(&self) -> usize;
    fn row(&self) -> usize;
    fn set_row(&mut self, row: usize);
    fn column_count(&self) -> usize {
        1
    }
    fn col(&self) -> usize {
        0
    }
    fn set_col(&mut self, _col: usize) {}

    fn field(&self) -> FieldKind;
    fn set_number(&mut self, value: f64);
    fn toggle(&mut self);

    fn editing(&mut self) -> &mut Option<String>;
    fn buffer(&self) -> Option<&str>;

    fn move_row(&mut self, delta: isize) {
        let last = self.row_count() as isize - 1;
        let next = (self.row() as isize + delta).clamp(0, last.max(0));
        self.set_row(next as usize);
    }

    fn move_col(&mut self, delta: isize) {
        let last = self.column_count() as isize - 1;
        let next = (self.col() as isize + delta).clamp(0, last.max(0));
        self.set_col(next as usize);
    }

    /// Enter on the current row: start editing a number or flip a toggle.
    fn activate(&mut self) {
        match self.field() {
            FieldKind::Number(value) => *self.editing() = Some(edit_text(value)),
            FieldKind::Toggle => self.toggle(),
        }
    }

    /// Commit the edit buffer. Unparseable text becomes `0`.
    fn commit(&mut self) -> Option<f64> {
        let text = self.editing().take()?;
        let value = coerce_number(&text);
        self.set_number(value);
        Some(value)
    }

    fn cancel_edit(&mut self) {
        *self.editing() = None;
    }

    fn is_editing(&self) -> bool {
        self.buffer().is_some()
    }
}

// ── Optimizer ─────────────────────────────────────────────────────────

/// Rows 0..5 are the parameter ranges (three columns each), then the options.
#[derive(Debug, Clone)]
pub struct OptimizerForm {
    pub ranges: ParamRanges,
    pub options: RunOptions,
    pub row: usize,
    pub col: usize,
    pub editing: Option<String>,
}

impl OptimizerForm {
    pub const ROW_INPUT_TYPE: usize = 5;
    pub const ROW_CASH_RATE: usize = 6;
    pub const ROW_START: usize = 7;

    pub fn new(ranges: ParamRanges, options: RunOptions) -> Self {
        Self {
            ranges,
            options,
            row: 0,
            col: 0,
            editing: None,
        }
    }

    pub fn cursor_param(&self) -> Option<(ParamName, RangePart)> {
        let name = *ParamName::ALL.get(self.row)?;
        Some((name, RangePart::ALL[self.col.min(2)]))
    }
}

impl Form for OptimizerForm {
    fn row_count(&self) -> usize {
        Self::ROW_START + 1
    }

    fn row(&self) -> usize {
        self.row
    }

    fn set_row(&mut self, row: usize) {
        self.row = row;
    }

    fn column_count(&self) -> usize {
        if self.row < ParamName::ALL.len() {
            RangePart::ALL.len()
        } else {
            1
        }
    }

    fn col(&self) -> usize {
        self.col
    }

    fn set_col(&mut self, col: usize) {
        self.col = col;
    }

    fn field(&self) -> FieldKind {
        match self.cursor_param() {
            Some((name, part)) => FieldKind::Number(part.get(self.ranges.get(name))),
            None if self.row == Self::ROW_CASH_RATE => FieldKind::Number(self.options.cash_rate),
            None => FieldKind::Toggle,
        }
    }

    fn set_number(&mut self, value: f64) {
        match self.cursor_param() {
            Some((name, part)) => part.set(self.ranges.get_mut(name), value),
            None if self.row == Self::ROW_CASH_RATE => self.options.cash_rate = value,
            None => {}
        }
    }

    fn toggle(&mut self) {
        match self.row {
            Self::ROW_INPUT_TYPE => self.options.input_type = self.options.input_type.toggle(),
            Self::ROW_START => self.options.start_invested = self.options.start_invested.toggle(),
            _ => {}
        }
    }

    fn editing(&mut self) -> &mut Option<String> {
        &mut self.editing
    }

    fn buffer(&self) -> Option<&str> {
        self.editing.as_deref()
    }
}

// ── Buy & Hold ────────────────────────────────────────────────────────

/// Rows: input type, cash rate.
#[derive(Debug, Clone)]
pub struct BuyHoldForm {
    pub options: RunOptions,
    pub row: usize,
    pub editing: Option<String>,
}

impl BuyHoldForm {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            row: 0,
            editing: None,
        }
    }
}

impl Form for BuyHoldForm {
    fn row_count(&self) -> usize {
        2
    }

    fn row(&self) -> usize {
        self.row
    }

    fn set_row(&mut self, row: usize) {
        self.row = row;
    }

    fn field(&self) -> FieldKind {
        match self.row {
            1 => FieldKind::Number(self.options.cash_rate),
            _ => FieldKind::Toggle,
        }
    }

    fn set_number(&mut self, value: f64) {
        if self.row == 1 {
            self.options.cash_rate = value;
        }
    }

    fn toggle(&mut self) {
        if self.row == 0 {
            self.options.input_type = self.options.input_type.toggle();
        }
    }

    fn editing(&mut self) -> &mut Option<String> {
        &mut self.editing
    }

    fn buffer(&self) -> Option<&str> {
        self.editing.as_deref()
    }
}

// ── Signal ────────────────────────────────────────────────────────────

/// Rows 0..5 are the parameter values, then start position, cash rate, input type.
#[derive(Debug, Clone)]
pub struct SignalForm {
    pub params: StrategyParams,
    pub options: RunOptions,
    pub row: usize,
    pub editing: Option<String>,
}

impl SignalForm {
    pub const ROW_START: usize = 5;
    pub const ROW_CASH_RATE: usize = 6;
    pub const ROW_INPUT_TYPE: usize = 7;

    pub fn new(params: StrategyParams, options: RunOptions) -> Self {
        Self {
            params,
            options,
            row: 0,
            editing: None,
        }
    }
}

impl Form for SignalForm {
    fn row_count(&self) -> usize {
        Self::ROW_INPUT_TYPE + 1
    }

    fn row(&self) -> usize {
        self.row
    }

    fn set_row(&mut self, row: usize) {
        self.row = row;
    }

    fn field(&self) -> FieldKind {
        match ParamName::ALL.get(self.row) {
            Some(&name) => FieldKind::Number(self.params.get(name)),
            None if self.row == Self::ROW_CASH_RATE => FieldKind::Number(self.options.cash_rate),
            None => FieldKind::Toggle,
        }
    }

    fn set_number(&mut self, value: f64) {
        match ParamName::ALL.get(self.row) {
            Some(&name) => self.params.set(name, value),
            None if self.row == Self::ROW_CASH_RATE => self.options.cash_rate = value,
            None => {}
        }
    }

    fn toggle(&mut self) {
        match self.row {
            Self::ROW_START => self.options.start_invested = self.options.start_invested.toggle(),
            Self::ROW_INPUT_TYPE => self.options.input_type = self.options.input_type.toggle(),
            _ => {}
        }
    }

    fn editing(&mut self) -> &mut Option<String> {
        &mut self.editing
    }

    fn buffer(&self) -> Option<&str> {
        self.editing.as_deref()
    }
}

// ── Settings ──────────────────────────────────────────────────────────

/// A settings row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    Theme,
    InputType,
    CashRate,
    StartPosition,
    DefaultValue(ParamName),
    DefaultRange(ParamName),
}

/// Local settings and a draft of the backend config.
///
/// Local settings rows apply (and persist) immediately. Config rows edit
/// the draft, which only reaches the backend on save.
#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub draft: AppConfig,
    pub row: usize,
    pub col: usize,
    pub editing: Option<String>,
    /// Settings-row edits waiting to be applied by the app.
    pub pending: Vec<SettingsEdit>,
    settings: Settings,
}

/// A change to a persisted setting produced by the form.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEdit {
    NextTheme,
    ToggleInputType,
    CashRate(f64),
    ToggleStart,
}

impl SettingsForm {
    pub fn new(draft: AppConfig, settings: Settings) -> Self {
        Self {
            draft,
            row: 0,
            col: 0,
            editing: None,
            pending: Vec::new(),
            settings,
        }
    }

    /// Refresh the settings shown on the local rows.
    pub fn sync_settings(&mut self, settings: &Settings) {
        self.settings = settings.clone();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn row_kind(&self) -> SettingsRow {
        Self::kind_at(self.row)
    }

    pub fn kind_at(row: usize) -> SettingsRow {
        let n = ParamName::ALL.len();
        match row {
            0 => SettingsRow::Theme,
            1 => SettingsRow::InputType,
            2 => SettingsRow::CashRate,
            3 => SettingsRow::StartPosition,
            r if r < 4 + n => SettingsRow::DefaultValue(ParamName::ALL[r - 4]),
            r => SettingsRow::DefaultRange(ParamName::ALL[(r - 4 - n).min(n - 1)]),
        }
    }
}

impl Form for SettingsForm {
    fn row_count(&self) -> usize {
        4 + 2 * ParamName::ALL.len()
    }

    fn row(&self) -> usize {
        self.row
    }

    fn set_row(&mut self, row: usize) {
        self.row = row;
    }

    fn column_count(&self) -> usize {
        match self.row_kind() {
            SettingsRow::DefaultRange(_) => RangePart::ALL.len(),
            _ => 1,
        }
    }

    fn col(&self) -> usize {
        self.col
    }

    fn set_col(&mut self, col: usize) {
        self.col = col;
    }

    fn field(&self) -> FieldKind {
        match self.row_kind() {
            SettingsRow::Theme | SettingsRow::InputType | SettingsRow::StartPosition => {
                FieldKind::Toggle
            }
            SettingsRow::CashRate => FieldKind::Number(self.settings.cash_rate),
            SettingsRow::DefaultValue(name) => {
                FieldKind::Number(self.draft.default_params.get(name).value)
            }
            SettingsRow::DefaultRange(name) => FieldKind::Number(
                RangePart::ALL[self.col.min(2)].get(self.draft.default_ranges.get(name)),
            ),
        }
    }

    fn set_number(&mut self, value: f64) {
        match self.row_kind() {
            SettingsRow::CashRate => self.pending.push(SettingsEdit::CashRate(value)),
            SettingsRow::DefaultValue(name) => {
                self.draft.default_params.get_mut(name).value = value;
            }
            SettingsRow::DefaultRange(name) => {
                RangePart::ALL[self.col.min(2)].set(self.draft.default_ranges.get_mut(name), value)
            }
            _ => {}
        }
    }

    fn toggle(&mut self) {
        let edit = match self.row_kind() {
            SettingsRow::Theme => SettingsEdit::NextTheme,
            SettingsRow::InputType => SettingsEdit::ToggleInputType,
            SettingsRow::StartPosition => SettingsEdit::ToggleStart,
            _ => return,
        };
        self.pending.push(edit);
    }

    fn editing(&mut self) -> &mut Option<String> {
        &mut self.editing
    }

    fn buffer(&self) -> Option<&str> {
        self.editing.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RunOptions {
        RunOptions::from(&Settings::default())
    }

    #[test]
    fn optimizer_edits_the_cell_under_the_cursor() {
        let mut form = OptimizerForm::new(AppConfig::fallback().default_ranges, options());
        form.move_row(1);
        form.move_col(1);
        assert_eq!(form.cursor_param(), Some((ParamName::Drop, RangePart::Max)));

        form.activate();
        assert_eq!(form.editing.as_deref(), Some("0.016"));
        form.editing = Some("0.02".into());
        assert_eq!(form.commit(), Some(0.02));
        assert_eq!(form.ranges.drop.max, 0.02);
        assert_eq!(form.ranges.drop.min, 0.016);
    }

    #[test]
    fn unparseable_input_commits_zero() {
        let mut form = OptimizerForm::new(AppConfig::fallback().default_ranges, options());
        form.activate();
        form.editing = Some("abc".into());
        form.commit();
        assert_eq!(form.ranges.ma.min, 0.0);
    }

    #[test]
    fn option_rows_toggle_and_edit() {
        let mut form = OptimizerForm::new(AppConfig::fallback().default_ranges, options());
        form.set_row(OptimizerForm::ROW_INPUT_TYPE);
        form.activate();
        assert_eq!(form.options.input_type, InputType::Api);

        form.set_row(OptimizerForm::ROW_START);
        form.activate();
        assert_eq!(form.options.start_invested, StartPosition::Cash);

        form.set_row(OptimizerForm::ROW_CASH_RATE);
        form.activate();
        form.editing = Some("0.05".into());
        form.commit();
        assert_eq!(form.options.cash_rate, 0.05);
    }

    #[test]
    fn cursor_is_clamped_and_option_rows_have_one_column() {
        let mut form = OptimizerForm::new(AppConfig::fallback().default_ranges, options());
        form.move_row(-3);
        assert_eq!(form.row, 0);
        form.move_row(100);
        assert_eq!(form.row, OptimizerForm::ROW_START);
        assert_eq!(form.column_count(), 1);
        form.move_col(2);
        assert_eq!(form.col, 0);
    }

    #[test]
    fn signal_ma_is_rounded() {
        let mut form = SignalForm::new(StrategyParams::default(), options());
        form.activate();
        form.editing = Some("52.6".into());
        form.commit();
        assert_eq!(form.params.ma, 53);
    }

    #[test]
    fn cancelled_edit_leaves_value() {
        let mut form = BuyHoldForm::new(options());
        form.set_row(1);
        form.activate();
        form.editing = Some("0.09".into());
        form.cancel_edit();
        assert!(!form.is_editing());
        assert_eq!(form.options.cash_rate, 0.04);
    }

    #[test]
    fn settings_rows_queue_local_edits_and_change_the_draft() {
        let mut form = SettingsForm::new(AppConfig::fallback(), Settings::default());
        form.activate();
        form.set_row(2);
        form.activate();
        form.editing = Some("0.03".into());
        form.commit();
        assert_eq!(
            form.pending,
            vec![SettingsEdit::NextTheme, SettingsEdit::CashRate(0.03)]
        );

        form.set_row(4);
        assert_eq!(form.row_kind(), SettingsRow::DefaultValue(ParamName::Ma));
        form.activate();
        form.editing = Some("60".into());
        form.commit();
        assert_eq!(form.draft.default_params.ma.value, 60.0);

        form.set_row(form.row_count() - 1);
        assert_eq!(form.row_kind(), SettingsRow::DefaultRange(ParamName::SpreadLvl));
        form.move_col(2);
        form.activate();
        form.editing = Some("0.2".into());
        form.commit();
        assert_eq!(form.draft.default_ranges.spread_lvl.step, 0.2);
    }
}
