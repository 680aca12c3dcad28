//! Backtest and sweep results as returned by the backend.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::params::StrategyParams;

/// One backtest period on the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    /// Strategy value relative to the starting value (1.0 = flat).
    pub strategy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// A buy or sell event with the indicator readings that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub action: TradeAction,
    pub price: f64,
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub chg4: Option<f64>,
    #[serde(default)]
    pub ret3: Option<f64>,
    #[serde(default)]
    pub spread_delta: Option<f64>,
}

/// Full result of one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    #[serde(default)]
    pub buy_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub sell_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub trade_history: Vec<TradeEvent>,
    pub final_value: f64,
    pub apy: f64,
}

impl BacktestResult {
    /// Buy/sell dates that do not appear on the equity curve.
    pub fn orphan_trade_dates(&self) -> Vec<NaiveDate> {
        let on_curve = |d: &NaiveDate| self.equity_curve.iter().any(|p| p.date == *d);
        self.buy_dates
            .iter()
            .chain(self.sell_dates.iter())
            .filter(|d| !on_curve(d))
            .copied()
            .collect()
    }
}

/// One evaluated grid point, flattened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerResultRow {
    #[serde(rename = "MA")]
    pub ma: i64,
    #[serde(rename = "DROP")]
    pub drop: f64,
    #[serde(rename = "CHG4")]
    pub chg4: f64,
    #[serde(rename = "RET3")]
    pub ret3: f64,
    #[serde(rename = "SPREAD_LVL")]
    pub spread_lvl: f64,
    #[serde(rename = "APY")]
    pub apy: f64,
    pub final_value: f64,
}

impl OptimizerResultRow {
    pub fn new(params: &StrategyParams, apy: f64, final_value: f64) -> Self {
        Self {
            ma: params.ma,
            drop: params.drop,
            chg4: params.chg4,
            ret3: params.ret3,
            spread_lvl: params.spread_lvl,
            apy,
            final_value,
        }
    }

    pub fn params(&self) -> StrategyParams {
        StrategyParams {
            ma: self.ma,
            drop: self.drop,
            chg4: self.chg4,
            ret3: self.ret3,
            spread_lvl: self.spread_lvl,
        }
    }
}

/// Terminal payload of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerResponse {
    pub best_params: StrategyParams,
    pub best_result: BacktestResult,
    pub all_results: Vec<OptimizerResultRow>,
}

impl OptimizerResponse {
    /// The row evaluated at `params`, if any.
    pub fn row_for(&self, params: &StrategyParams) -> Option<&OptimizerResultRow> {
        self.all_results.iter().find(|r| r.params() == *params)
    }

    /// `best_params` appears among the rows and its metrics match `best_result`.
    pub fn is_consistent(&self) -> bool {
        match self.row_for(&self.best_params) {
            Some(row) => {
                row.apy == self.best_result.apy && row.final_value == self.best_result.final_value
            }
            None => false,
        }
    }
}

/// Current trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        })
    }
}

/// Indicator readings on the most recent bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetrics {
    #[serde(default)]
    pub spread: Option<f64>,
    #[serde(default)]
    pub ma: Option<f64>,
    #[serde(default)]
    pub ret3: Option<f64>,
    #[serde(default)]
    pub chg4: Option<f64>,
    #[serde(default)]
    pub spread_delta: Option<f64>,
    pub last_date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResponse {
    pub signal: Signal,
    pub metrics: SignalMetrics,
    #[serde(default)]
    pub trade_history: Vec<TradeEvent>,
    pub apy: f64,
    pub final_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    const RESPONSE_JSON: &str = r#"{
        "best_params": {"MA": 50, "DROP": 0.017, "CHG4": 0.165, "RET3": -0.021, "SPREAD_LVL": 7.0},
        "best_result": {
            "equity_curve": [
                {"date": "2020-01-03", "strategy": 1.0},
                {"date": "2020-01-10", "strategy": 1.02}
            ],
            "buy_dates": ["2020-01-03"],
            "sell_dates": [],
            "trade_history": [
                {"date": "2020-01-03", "action": "BUY", "price": 10.5, "spread": null}
            ],
            "final_value": 1.02,
            "apy": 0.11
        },
        "all_results": [
            {"MA": 50, "DROP": 0.017, "CHG4": 0.165, "RET3": -0.021, "SPREAD_LVL": 7.0, "APY": 0.11, "final_value": 1.02},
            {"MA": 55, "DROP": 0.017, "CHG4": 0.165, "RET3": -0.021, "SPREAD_LVL": 7.0, "APY": 0.05, "final_value": 1.01}
        ]
    }"#;

    #[test]
    fn parses_backend_response() {
        let resp: OptimizerResponse = serde_json::from_str(RESPONSE_JSON).unwrap();
        assert_eq!(resp.best_params, StrategyParams::default());
        assert_eq!(resp.best_result.equity_curve.len(), 2);
        assert_eq!(resp.best_result.equity_curve[0].date, date("2020-01-03"));
        assert_eq!(resp.best_result.trade_history[0].action, TradeAction::Buy);
        assert_eq!(resp.best_result.trade_history[0].chg4, None);
        assert_eq!(resp.all_results.len(), 2);
        assert!(resp.is_consistent());
        assert!(resp.best_result.orphan_trade_dates().is_empty());
    }

    #[test]
    fn inconsistent_best_is_detected() {
        let mut resp: OptimizerResponse = serde_json::from_str(RESPONSE_JSON).unwrap();
        resp.best_result.apy = 0.2;
        assert!(!resp.is_consistent());
        resp.best_params.ma = 99;
        assert!(resp.row_for(&resp.best_params).is_none());
    }

    #[test]
    fn parses_signal_response() {
        let json = r#"{
            "signal": "HOLD",
            "metrics": {"spread": 6.9, "ma": 10.2, "last_date": "2024-05-31", "close": 10.4},
            "trade_history": [],
            "apy": 0.07,
            "final_value": 2.1
        }"#;
        let resp: SignalResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.signal, Signal::Hold);
        assert_eq!(resp.signal.to_string(), "HOLD");
        assert_eq!(resp.metrics.ret3, None);
        assert_eq!(resp.metrics.last_date, date("2024-05-31"));
    }
}
