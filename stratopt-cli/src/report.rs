//! Plain-text reports written to stdout.

use std::io::{self, Write};

use clap::ValueEnum;

use stratopt_core::{
    AppConfig, BacktestResult, OptimizerGrids, OptimizerResultRow, ParamName, SignalResponse,
    TradeAction,
};

/// Result table sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    Ma,
    Drop,
    Chg4,
    Ret3,
    SpreadLvl,
    Apy,
    Final,
}

impl SortKey {
    fn value(self, row: &OptimizerResultRow) -> f64 {
        match self {
            SortKey::Ma => row.ma as f64,
            SortKey::Drop => row.drop,
            SortKey::Chg4 => row.chg4,
            SortKey::Ret3 => row.ret3,
            SortKey::SpreadLvl => row.spread_lvl,
            SortKey::Apy => row.apy,
            SortKey::Final => row.final_value,
        }
    }
}

/// Sort rows by `key`, descending unless `ascending`. Ties keep backend order.
pub fn sort_rows(rows: &mut [OptimizerResultRow], key: SortKey, ascending: bool) {
    rows.sort_by(|a, b| {
        let ord = key.value(a).total_cmp(&key.value(b));
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
}

pub fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn reading(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "-".into())
}

pub fn write_grid(out: &mut impl Write, grids: &OptimizerGrids) -> io::Result<()> {
    let ma: Vec<String> = grids.ma.iter().map(|v| v.to_string()).collect();
    writeln!(out, "{:<12} {:>4}  {}", "MA", grids.ma.len(), ma.join(", "))?;
    for (name, values) in [
        (ParamName::Drop, &grids.drop),
        (ParamName::Chg4, &grids.chg4),
        (ParamName::Ret3, &grids.ret3),
        (ParamName::SpreadLvl, &grids.spread_lvl),
    ] {
        let shown: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{:<12} {:>4}  {}", name.as_str(), values.len(), shown.join(", "))?;
    }
    writeln!(out, "Combinations: {}", grids.combinations())
}

/// Result table; `best` rows are starred. Row numbers are 1-based.
pub fn write_results(
    out: &mut impl Write,
    rows: &[OptimizerResultRow],
    is_best: impl Fn(&OptimizerResultRow) -> bool,
) -> io::Result<()> {
    writeln!(
        out,
        "{:>4}   {:>5} {:>7} {:>7} {:>8} {:>10} {:>9} {:>10}",
        "#", "MA", "DROP", "CHG4", "RET3", "SPREAD_LVL", "APY", "Final"
    )?;
    writeln!(out, "{}", "-".repeat(69))?;
    for (i, row) in rows.iter().enumerate() {
        let marker = if is_best(row) { '*' } else { ' ' };
        writeln!(
            out,
            "{:>4} {marker} {:>5} {:>7.3} {:>7.3} {:>8.4} {:>10.1} {:>9} {:>10.6}",
            i + 1,
            row.ma,
            row.drop,
            row.chg4,
            row.ret3,
            row.spread_lvl,
            percent(row.apy),
            row.final_value
        )?;
    }
    Ok(())
}

pub fn write_backtest(out: &mut impl Write, title: &str, result: &BacktestResult) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "=== {title} ===")?;
    if let (Some(first), Some(last)) = (result.equity_curve.first(), result.equity_curve.last()) {
        writeln!(out, "Period:         {} to {}", first.date, last.date)?;
    }
    writeln!(out, "Points:         {}", result.equity_curve.len())?;
    writeln!(out, "Trades:         {}", result.trade_history.len())?;
    writeln!(out, "APY:            {}", percent(result.apy))?;
    writeln!(out, "Final value:    {:.6}", result.final_value)?;
    write_trades(out, result)
}

fn write_trades(out: &mut impl Write, result: &BacktestResult) -> io::Result<()> {
    if result.trade_history.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(
        out,
        "{:<10}  {:<4}  {:>9}  {:>7}  {:>7}  {:>8}  {:>8}",
        "Date", "Side", "Price", "Spread", "CHG4", "RET3", "dSpread"
    )?;
    for trade in &result.trade_history {
        let side = match trade.action {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        };
        writeln!(
            out,
            "{:<10}  {side:<4}  {:>9.2}  {:>7}  {:>7}  {:>8}  {:>8}",
            trade.date.to_string(),
            trade.price,
            reading(trade.spread, 2),
            reading(trade.chg4, 3),
            reading(trade.ret3, 4),
            reading(trade.spread_delta, 3),
        )?;
    }
    Ok(())
}

pub fn write_signal(out: &mut impl Write, ticker: &str, resp: &SignalResponse) -> io::Result<()> {
    let m = &resp.metrics;
    writeln!(out, "{ticker}: {} (as of {})", resp.signal, m.last_date)?;
    writeln!(out)?;
    writeln!(out, "Close:          {:.2}", m.close)?;
    writeln!(out, "MA:             {}", reading(m.ma, 2))?;
    writeln!(out, "Spread:         {}", reading(m.spread, 2))?;
    writeln!(out, "Spread delta:   {}", reading(m.spread_delta, 3))?;
    writeln!(out, "CHG4:           {}", reading(m.chg4, 3))?;
    writeln!(out, "RET3:           {}", reading(m.ret3, 4))?;
    writeln!(out, "APY:            {}", percent(resp.apy))?;
    writeln!(out, "Final value:    {:.6}", resp.final_value)?;
    if !resp.trade_history.is_empty() {
        writeln!(out, "Trades:         {}", resp.trade_history.len())?;
    }
    Ok(())
}

pub fn write_config(out: &mut impl Write, config: &AppConfig) -> io::Result<()> {
    writeln!(out, "Default params:")?;
    for name in ParamName::ALL {
        let def = config.default_params.get(name);
        writeln!(
            out,
            "  {:<12} {:>10}  {}",
            name.as_str(),
            format!("{:.*}", name.display_decimals().max(1), def.value),
            def.desc
        )?;
    }
    writeln!(out, "Default ranges (min:max:step):")?;
    for name in ParamName::ALL {
        let r = config.default_ranges.get(name);
        writeln!(out, "  {:<12} {}:{}:{}", name.as_str(), r.min, r.max, r.step)?;
    }
    Ok(())
}
