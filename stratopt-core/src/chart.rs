//! Chart data merging and export.
//!
//! The primary curve's dates are authoritative: secondary values are attached
//! where their date matches and dropped otherwise. Buy/sell membership is a
//! flag on the merged point, so markers always sit on the primary series.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::ExportError;
use crate::result::EquityPoint;

/// One merged point, ready to render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub strategy: f64,
    pub buy_hold: Option<f64>,
    pub is_buy: bool,
    pub is_sell: bool,
}

/// Merge a primary curve with an optional secondary curve and trade markers.
pub fn merge_curves(
    primary: &[EquityPoint],
    secondary: Option<&[EquityPoint]>,
    buy_dates: &[NaiveDate],
    sell_dates: &[NaiveDate],
) -> Vec<ChartPoint> {
    let secondary_by_date: HashMap<NaiveDate, f64> = secondary
        .unwrap_or_default()
        .iter()
        .map(|p| (p.date, p.strategy))
        .collect();
    let buys: HashSet<NaiveDate> = buy_dates.iter().copied().collect();
    let sells: HashSet<NaiveDate> = sell_dates.iter().copied().collect();

    primary
        .iter()
        .map(|p| ChartPoint {
            date: p.date,
            strategy: p.strategy,
            buy_hold: secondary_by_date.get(&p.date).copied(),
            is_buy: buys.contains(&p.date),
            is_sell: sells.contains(&p.date),
        })
        .collect()
}

/// Min/max over every plotted value (primary and, if present, secondary).
pub fn value_bounds(points: &[ChartPoint]) -> Option<(f64, f64)> {
    points
        .iter()
        .flat_map(|p| std::iter::once(p.strategy).chain(p.buy_hold))
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Flat tabular projection of a merged chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRow {
    pub date: NaiveDate,
    pub strategy: f64,
    pub buy_hold: Option<f64>,
}

/// Project merged points to export rows, in the same order.
///
/// With `include_secondary == false` the secondary column is dropped.
pub fn export_rows(points: &[ChartPoint], include_secondary: bool) -> Vec<ExportRow> {
    points
        .iter()
        .map(|p| ExportRow {
            date: p.date,
            strategy: p.strategy,
            buy_hold: if include_secondary { p.buy_hold } else { None },
        })
        .collect()
}

/// Write rows as CSV: `date,strategy[,buyhold]`. Missing secondary values are empty cells.
pub fn write_csv<W: Write>(
    writer: W,
    rows: &[ExportRow],
    include_secondary: bool,
) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    if include_secondary {
        csv.write_record(["date", "strategy", "buyhold"])?;
    } else {
        csv.write_record(["date", "strategy"])?;
    }

    for row in rows {
        let date = row.date.format("%Y-%m-%d").to_string();
        let strategy = row.strategy.to_string();
        if include_secondary {
            let secondary = row.buy_hold.map(|v| v.to_string()).unwrap_or_default();
            csv.write_record([date, strategy, secondary])?;
        } else {
            csv.write_record([date, strategy])?;
        }
    }
    csv.flush()?;
    Ok(())
}

pub fn write_csv_file(
    path: &Path,
    rows: &[ExportRow],
    include_secondary: bool,
) -> Result<(), ExportError> {
    let file = File::create(path)?;
    write_csv(file, rows, include_secondary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn curve(points: &[(u32, f64)]) -> Vec<EquityPoint> {
        points
            .iter()
            .map(|&(day, v)| EquityPoint {
                date: d(day),
                strategy: v,
            })
            .collect()
    }

    #[test]
    fn primary_dates_are_authoritative() {
        let primary = curve(&[(5, 1.0), (12, 1.1), (19, 1.2)]);
        let secondary = curve(&[(5, 1.0), (19, 1.05), (26, 1.3)]);
        let merged = merge_curves(&primary, Some(&secondary), &[], &[]);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].buy_hold, Some(1.0));
        assert_eq!(merged[1].buy_hold, None);
        assert_eq!(merged[2].buy_hold, Some(1.05));
        assert!(merged.iter().all(|p| p.date != d(26)));
    }

    #[test]
    fn trade_flags_sit_on_primary_points() {
        let primary = curve(&[(5, 1.0), (12, 1.1), (19, 1.2)]);
        let merged = merge_curves(&primary, None, &[d(5)], &[d(19), d(30)]);

        assert!(merged[0].is_buy && !merged[0].is_sell);
        assert!(!merged[1].is_buy && !merged[1].is_sell);
        assert!(merged[2].is_sell);
        // A sell date absent from the primary produces no extra point.
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn export_rows_follow_primary_order() {
        let primary = curve(&[(5, 1.0), (12, 1.1), (19, 1.2)]);
        let secondary = curve(&[(12, 0.9)]);
        let merged = merge_curves(&primary, Some(&secondary), &[], &[]);
        let rows = export_rows(&merged, true);

        assert_eq!(rows.len(), primary.len());
        for (row, point) in rows.iter().zip(primary.iter()) {
            assert_eq!(row.date, point.date);
        }

        let hidden = export_rows(&merged, false);
        assert!(hidden.iter().all(|r| r.buy_hold.is_none()));
    }

    #[test]
    fn csv_layout() {
        let primary = curve(&[(5, 1.0), (12, 1.5)]);
        let secondary = curve(&[(12, 0.9)]);
        let merged = merge_curves(&primary, Some(&secondary), &[], &[]);

        let mut buf = Vec::new();
        write_csv(&mut buf, &export_rows(&merged, true), true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "date,strategy,buyhold\n2024-01-05,1,\n2024-01-12,1.5,0.9\n");

        let mut buf = Vec::new();
        write_csv(&mut buf, &export_rows(&merged, false), false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "date,strategy\n2024-01-05,1\n2024-01-12,1.5\n");
    }

    #[test]
    fn csv_file_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equity_curve.csv");
        let merged = merge_curves(&curve(&[(5, 1.0)]), None, &[], &[]);
        write_csv_file(&path, &export_rows(&merged, false), false).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,strategy\n"));
    }

    #[test]
    fn bounds_include_secondary() {
        let primary = curve(&[(5, 1.0), (12, 1.5)]);
        let secondary = curve(&[(5, 0.8)]);
        let merged = merge_curves(&primary, Some(&secondary), &[], &[]);
        assert_eq!(value_bounds(&merged), Some((0.8, 1.5)));
        assert_eq!(value_bounds(&[]), None);
    }
}
