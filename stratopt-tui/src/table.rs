//! Sortable view over a sweep's result rows.
//!
//! The table keeps its own copy of the rows in display order. The cursor is
//! a row index; a re-sort carries it to the row's new position, so the same
//! row stays highlighted even when several rows share a tuple. Selection is
//! independent of the open drill-down.

use std::cmp::Ordering;

use stratopt_core::{OptimizerResponse, OptimizerResultRow, StrategyParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Ma,
    Drop,
    Chg4,
    Ret3,
    SpreadLvl,
    Apy,
    FinalValue,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Ma,
        Column::Drop,
        Column::Chg4,
        Column::Ret3,
        Column::SpreadLvl,
        Column::Apy,
        Column::FinalValue,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Ma => "MA",
            Column::Drop => "DROP",
            Column::Chg4 => "CHG4",
            Column::Ret3 => "RET3",
            Column::SpreadLvl => "SPREAD_LVL",
            Column::Apy => "APY",
            Column::FinalValue => "Final",
        }
    }

    pub fn width(self) -> usize {
        match self {
            Column::Ma => 5,
            Column::Drop | Column::Chg4 => 7,
            Column::Ret3 => 8,
            Column::SpreadLvl => 10,
            Column::Apy => 8,
            Column::FinalValue => 11,
        }
    }

    fn value(self, row: &OptimizerResultRow) -> f64 {
        match self {
            Column::Ma => row.ma as f64,
            Column::Drop => row.drop,
            Column::Chg4 => row.chg4,
            Column::Ret3 => row.ret3,
            Column::SpreadLvl => row.spread_lvl,
            Column::Apy => row.apy,
            Column::FinalValue => row.final_value,
        }
    }

    /// Cell text for `row` in this column.
    pub fn format(self, row: &OptimizerResultRow) -> String {
        match self {
            Column::Ma => row.ma.to_string(),
            Column::Drop => format!("{:.3}", row.drop),
            Column::Chg4 => format!("{:.3}", row.chg4),
            Column::Ret3 => format!("{:.4}", row.ret3),
            Column::SpreadLvl => format!("{:.1}", row.spread_lvl),
            Column::Apy => format_percent(row.apy),
            Column::FinalValue => format!("{:.6}", row.final_value),
        }
    }
}

/// `0.0812` → `8.12%`.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultsTable {
    rows: Vec<OptimizerResultRow>,
    best: Option<StrategyParams>,
    sort_column: Column,
    sort_direction: SortDirection,
    selected: Option<usize>,
    /// Column the `<`/`>` keys point at before `s` applies it.
    pub column_cursor: usize,
}

impl Default for ResultsTable {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            best: None,
            sort_column: Column::Apy,
            sort_direction: SortDirection::Descending,
            selected: None,
            column_cursor: Column::ALL.len() - 2,
        }
    }
}

impl ResultsTable {
    /// Replace the rows with a fresh result and pre-select its best row.
    pub fn load(&mut self, response: &OptimizerResponse) {
        self.rows = response.all_results.clone();
        self.best = Some(response.best_params);
        self.selected = None;
        self.apply_sort();
        self.selected = self
            .rows
            .iter()
            .position(|r| r.params() == response.best_params);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.best = None;
        self.selected = None;
    }

    pub fn rows(&self) -> &[OptimizerResultRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_best(&self, row: &OptimizerResultRow) -> bool {
        self.best == Some(row.params())
    }

    pub fn sort_state(&self) -> (Column, SortDirection) {
        (self.sort_column, self.sort_direction)
    }

    /// Sort by `column`: a new column starts descending, the current one flips.
    pub fn sort_by(&mut self, column: Column) {
        if column == self.sort_column {
            self.sort_direction = self.sort_direction.flip();
        } else {
            self.sort_column = column;
            self.sort_direction = SortDirection::Descending;
        }
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        let column = self.sort_column;
        let direction = self.sort_direction;
        let rows = &self.rows;
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| {
            let ord = column
                .value(&rows[a])
                .partial_cmp(&column.value(&rows[b]))
                .unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        self.selected = self
            .selected
            .and_then(|old| order.iter().position(|&i| i == old));
        self.rows = order.iter().map(|&i| self.rows[i]).collect();
    }

    pub fn selected_params(&self) -> Option<StrategyParams> {
        self.selected_index().map(|i| self.rows[i].params())
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.filter(|&i| i < self.rows.len())
    }

    /// Move the cursor by `delta` rows, clamped to the table.
    pub fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        let current = self.selected_index().unwrap_or(0) as isize;
        let last = self.rows.len() as isize - 1;
        self.selected = Some((current + delta).clamp(0, last) as usize);
    }

    pub fn select_first(&mut self) {
        self.selected = (!self.rows.is_empty()).then_some(0);
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().checked_sub(1);
    }

    pub fn cursor_column(&self) -> Column {
        Column::ALL[self.column_cursor.min(Column::ALL.len() - 1)]
    }

    pub fn move_column_cursor(&mut self, delta: isize) {
        let last = Column::ALL.len() as isize - 1;
        self.column_cursor = (self.column_cursor as isize + delta).clamp(0, last) as usize;
    }
}
