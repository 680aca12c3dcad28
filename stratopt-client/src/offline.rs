//! In-process simulated backend.
//!
//! A deterministic synthetic weekly market (close price plus a credit
//! spread) and a small rule over it. Sweeps are evaluated lazily, one grid
//! point per stream step, so cancellation takes effect mid-sweep. The
//! numbers are only good for exercising the client.

use chrono::{Duration as ChronoDuration, NaiveDate};
use std::f64::consts::TAU;
use std::sync::Mutex;
use std::time::Duration;

use stratopt_core::{
    AppConfig, BacktestResult, BuyHoldRequest, EquityPoint, IntoGridPoints, OptimizerResponse,
    OptimizerResultRow, Signal, SignalMetrics, SignalRequest, SignalResponse, StartPosition,
    StrategyParams, SweepRequest, TradeAction, TradeEvent,
};

use crate::backend::{Backend, SweepEvent, SweepStream};
use crate::error::ClientError;

const WEEKS: usize = 520;
const WEEKS_PER_YEAR: f64 = 52.0;

/// One synthetic weekly bar.
#[derive(Debug, Clone, Copy)]
struct Bar {
    date: NaiveDate,
    close: f64,
    spread: f64,
}

/// Indicator readings at one bar for a given MA length.
#[derive(Debug, Clone, Copy, Default)]
struct Readings {
    ma: Option<f64>,
    ret3: Option<f64>,
    chg4: Option<f64>,
    spread_delta: Option<f64>,
    spread_peak4: f64,
}

#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    bars: Vec<Bar>,
}

impl SyntheticMarket {
    /// Series for `ticker`. Different tickers get phase-shifted series.
    pub fn new(ticker: &str) -> Self {
        let phase = ticker.bytes().map(f64::from).sum::<f64>() % 97.0 / 97.0 * TAU;
        let start = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap_or_default();
        let bars = (0..WEEKS)
            .map(|t| {
                let t_f = t as f64;
                let spread = 5.5
                    + 1.8 * (TAU * t_f / 150.0 + phase).sin()
                    + 0.6 * (TAU * t_f / 23.0).sin()
                    + 0.25 * (TAU * t_f / 7.0 + phase).cos();
                let log_price = 0.0012 * t_f - 0.03 * (spread - 5.5)
                    + 0.015 * (TAU * t_f / 9.0 + phase).sin();
                Bar {
                    date: start + ChronoDuration::weeks(t as i64),
                    close: 100.0 * log_price.exp(),
                    spread,
                }
            })
            .collect();
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    fn readings(&self, ma_len: usize) -> Vec<Readings> {
        let ma_len = ma_len.max(1);
        let mut window_sum = 0.0;
        self.bars
            .iter()
            .enumerate()
            .map(|(t, bar)| {
                window_sum += bar.close;
                if t >= ma_len {
                    window_sum -= self.bars[t - ma_len].close;
                }
                let back = |k: usize| t.checked_sub(k).map(|i| self.bars[i]);
                Readings {
                    ma: (t + 1 >= ma_len).then(|| window_sum / ma_len as f64),
                    ret3: back(3).map(|b| bar.close / b.close - 1.0),
                    chg4: back(4).map(|b| bar.spread / b.spread - 1.0),
                    spread_delta: back(1).map(|b| bar.spread - b.spread),
                    spread_peak4: self.bars[t.saturating_sub(3)..=t]
                        .iter()
                        .map(|b| b.spread)
                        .fold(f64::MIN, f64::max),
                }
            })
            .collect()
    }

    /// Run the rule (or buy-and-hold when `params` is `None`).
    ///
    /// Returns the backtest and the position held at each bar.
    fn backtest(
        &self,
        params: Option<&StrategyParams>,
        start: StartPosition,
        cash_rate: f64,
    ) -> (BacktestResult, Vec<bool>, Vec<Readings>) {
        let ma_len = params.map(|p| p.ma.max(1) as usize).unwrap_or(1);
        let readings = self.readings(ma_len);
        let weekly_cash = (1.0 + cash_rate).powf(1.0 / WEEKS_PER_YEAR);

        let mut invested = params.is_none() || start == StartPosition::Invested;
        let mut equity = 1.0;
        let mut positions = Vec::with_capacity(self.bars.len());
        let mut curve = Vec::with_capacity(self.bars.len());
        let mut buy_dates = Vec::new();
        let mut sell_dates = Vec::new();
        let mut trade_history = Vec::new();

        for (t, (bar, r)) in self.bars.iter().zip(readings.iter()).enumerate() {
            if t > 0 {
                equity *= if positions[t - 1] {
                    bar.close / self.bars[t - 1].close
                } else {
                    weekly_cash
                };
            }

            let action = match params {
                None if t == 0 => Some(TradeAction::Buy),
                None => None,
                Some(p) if invested && sells(p, bar, r) => Some(TradeAction::Sell),
                Some(p) if !invested && buys(p, bar, r, t, &readings) => Some(TradeAction::Buy),
                Some(_) => None,
            };
            match action {
                Some(TradeAction::Buy) => {
                    invested = true;
                    buy_dates.push(bar.date);
                }
                Some(TradeAction::Sell) => {
                    invested = false;
                    sell_dates.push(bar.date);
                }
                None => {}
            }
            if let Some(action) = action {
                trade_history.push(TradeEvent {
                    date: bar.date,
                    action,
                    price: bar.close,
                    spread: Some(bar.spread),
                    chg4: r.chg4,
                    ret3: r.ret3,
                    spread_delta: r.spread_delta,
                });
            }

            positions.push(invested);
            curve.push(EquityPoint {
                date: bar.date,
                strategy: equity,
            });
        }

        let years = (self.bars.len().saturating_sub(1)) as f64 / WEEKS_PER_YEAR;
        let apy = if years > 0.0 {
            equity.powf(1.0 / years) - 1.0
        } else {
            0.0
        };
        let result = BacktestResult {
            equity_curve: curve,
            buy_dates,
            sell_dates,
            trade_history,
            final_value: equity,
            apy,
        };
        (result, positions, readings)
    }
}

fn sells(p: &StrategyParams, bar: &Bar, r: &Readings) -> bool {
    bar.spread > p.spread_lvl
        || r.chg4.is_some_and(|c| c > p.chg4)
        || r.ret3.is_some_and(|v| v < p.ret3)
}

fn buys(p: &StrategyParams, bar: &Bar, r: &Readings, t: usize, all: &[Readings]) -> bool {
    let above_ma = r.ma.is_some_and(|ma| bar.close > ma);
    let easing = t >= 2
        && all[t - 1..=t]
            .iter()
            .all(|x| x.spread_delta.is_some_and(|d| d < 0.0));
    let off_peak = bar.spread <= r.spread_peak4 * (1.0 - p.drop);
    above_ma && easing && off_peak
}

/// Simulated backend with an in-memory config.
pub struct OfflineBackend {
    config: Mutex<AppConfig>,
    step_delay: Duration,
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(AppConfig::fallback()),
            step_delay: Duration::ZERO,
        }
    }

    /// Sleep this long per evaluated grid point, so progress is visible.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    fn lock_config(&self) -> std::sync::MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Backend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn config(&self) -> Result<AppConfig, ClientError> {
        Ok(self.lock_config().clone())
    }

    fn save_config(&self, config: &AppConfig) -> Result<(), ClientError> {
        *self.lock_config() = config.clone();
        Ok(())
    }

    fn buy_hold(&self, request: &BuyHoldRequest) -> Result<BacktestResult, ClientError> {
        let market = SyntheticMarket::new(&request.ticker);
        let (result, _, _) = market.backtest(None, StartPosition::Invested, request.cash_rate);
        Ok(result)
    }

    fn signal(&self, request: &SignalRequest) -> Result<SignalResponse, ClientError> {
        let market = SyntheticMarket::new(&request.ticker);
        let (result, positions, readings) =
            market.backtest(Some(&request.params), request.start_invested, request.cash_rate);

        let (prev, last) = match positions.as_slice() {
            [.., prev, last] => (*prev, *last),
            [only] => (*only, *only),
            [] => return Err(ClientError::Protocol("no market data".into())),
        };
        let signal = match (prev, last) {
            (false, true) => Signal::Buy,
            (true, false) => Signal::Sell,
            _ => Signal::Hold,
        };

        let bar = market.bars[market.len() - 1];
        let r = readings[readings.len() - 1];
        Ok(SignalResponse {
            signal,
            metrics: SignalMetrics {
                spread: Some(bar.spread),
                ma: r.ma,
                ret3: r.ret3,
                chg4: r.chg4,
                spread_delta: r.spread_delta,
                last_date: bar.date,
                close: bar.close,
            },
            trade_history: result.trade_history,
            apy: result.apy,
            final_value: result.final_value,
        })
    }

    fn securities(&self) -> Result<Vec<String>, ClientError> {
        Ok(vec!["SPHY".to_string()])
    }

    fn open_sweep(&self, request: &SweepRequest) -> Result<SweepStream, ClientError> {
        tracing::info!(
            "offline sweep for {} ({} combinations)",
            request.ticker,
            request.grids.combinations()
        );
        Ok(Box::new(OfflineSweep::new(request, self.step_delay)))
    }
}

/// Lazily evaluated sweep: progress `(0, N)`, one progress per point, then the result.
///
/// Grid points are generated one at a time, so a large product starts
/// streaming immediately and can be cancelled before it is exhausted.
struct OfflineSweep {
    market: SyntheticMarket,
    points: IntoGridPoints,
    total: u64,
    done: u64,
    start: StartPosition,
    cash_rate: f64,
    step_delay: Duration,
    rows: Vec<OptimizerResultRow>,
    best: Option<(StrategyParams, BacktestResult)>,
    started: bool,
    finished: bool,
}

impl OfflineSweep {
    fn new(request: &SweepRequest, step_delay: Duration) -> Self {
        Self {
            market: SyntheticMarket::new(&request.ticker),
            total: request.grids.combinations() as u64,
            points: request.grids.clone().into_points(),
            done: 0,
            start: request.start_invested,
            cash_rate: request.cash_rate,
            step_delay,
            rows: Vec::new(),
            best: None,
            started: false,
            finished: false,
        }
    }

    fn evaluate(&mut self, params: StrategyParams) {
        if !self.step_delay.is_zero() {
            std::thread::sleep(self.step_delay);
        }
        let (result, _, _) = self.market.backtest(Some(&params), self.start, self.cash_rate);
        self.rows
            .push(OptimizerResultRow::new(&params, result.apy, result.final_value));
        let better = match &self.best {
            Some((_, best)) => result.apy > best.apy,
            None => true,
        };
        if better {
            self.best = Some((params, result));
        }
        self.done += 1;
    }
}

impl Iterator for OfflineSweep {
    type Item = Result<SweepEvent, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            if self.total == 0 {
                self.finished = true;
                return Some(Ok(SweepEvent::Error("parameter grid is empty".into())));
            }
            return Some(Ok(SweepEvent::Progress {
                current: 0,
                total: self.total,
            }));
        }
        if let Some(params) = self.points.next() {
            self.evaluate(params);
            return Some(Ok(SweepEvent::Progress {
                current: self.done,
                total: self.total,
            }));
        }

        self.finished = true;
        let event = match self.best.take() {
            Some((best_params, best_result)) => SweepEvent::Result(Box::new(OptimizerResponse {
                best_params,
                best_result,
                all_results: std::mem::take(&mut self.rows),
            })),
            None => SweepEvent::Error("no grid points were evaluated".into()),
        };
        Some(Ok(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratopt_core::{InputType, OptimizerGrids};

    fn request(grids: OptimizerGrids) -> SweepRequest {
        SweepRequest {
            ticker: "SPHY".into(),
            grids,
            start_invested: StartPosition::Invested,
            cash_rate: 0.04,
            input_type: InputType::Csv,
        }
    }

    #[test]
    fn market_is_deterministic() {
        let a = SyntheticMarket::new("SPHY");
        let b = SyntheticMarket::new("SPHY");
        assert_eq!(a.len(), WEEKS);
        assert_eq!(a.bars[100].close, b.bars[100].close);
        assert_ne!(a.bars[100].close, SyntheticMarket::new("HYG").bars[100].close);
    }

    #[test]
    fn trade_dates_lie_on_the_curve() {
        let market = SyntheticMarket::new("SPHY");
        let (result, _, _) =
            market.backtest(Some(&StrategyParams::default()), StartPosition::Invested, 0.04);
        assert_eq!(result.equity_curve.len(), WEEKS);
        assert!(result.orphan_trade_dates().is_empty());
        assert_eq!(
            result.trade_history.len(),
            result.buy_dates.len() + result.sell_dates.len()
        );
    }

    #[test]
    fn buy_hold_tracks_price() {
        let backend = OfflineBackend::new();
        let result = backend
            .buy_hold(&BuyHoldRequest {
                ticker: "SPHY".into(),
                cash_rate: 0.04,
                input_type: InputType::Csv,
            })
            .unwrap();
        let market = SyntheticMarket::new("SPHY");
        let expected = market.bars[WEEKS - 1].close / market.bars[0].close;
        assert!((result.final_value - expected).abs() < 1e-9);
        assert_eq!(result.buy_dates, vec![market.bars[0].date]);
    }

    #[test]
    fn sweep_reports_every_point_then_best() {
        let mut grids = OptimizerGrids::singleton(&StrategyParams::default());
        grids.ma = vec![20, 50];
        grids.drop = vec![0.01, 0.02];
        let events: Vec<SweepEvent> = OfflineBackend::new()
            .open_sweep(&request(grids))
            .unwrap()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(events.len(), 6);
        for (i, event) in events[..5].iter().enumerate() {
            assert_eq!(
                *event,
                SweepEvent::Progress {
                    current: i as u64,
                    total: 4
                }
            );
        }
        match &events[5] {
            SweepEvent::Result(response) => {
                assert_eq!(response.all_results.len(), 4);
                assert!(response.is_consistent());
                let max = response
                    .all_results
                    .iter()
                    .map(|r| r.apy)
                    .fold(f64::MIN, f64::max);
                assert_eq!(response.best_result.apy, max);
            }
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[test]
    fn large_grid_streams_without_expanding_the_product() {
        // GIVEN: three axes of 1000 values, a billion combinations
        let mut grids = OptimizerGrids::singleton(&StrategyParams::default());
        grids.ma = (1..=1000).collect();
        grids.drop = (0..1000).map(|i| i as f64 * 1e-4).collect();
        grids.chg4 = (0..1000).map(|i| i as f64 * 1e-3).collect();

        // WHEN: the sweep is opened and only its first frames are read
        let events: Vec<SweepEvent> = OfflineBackend::new()
            .open_sweep(&request(grids))
            .unwrap()
            .take(3)
            .map(|e| e.unwrap())
            .collect();

        // THEN: progress starts at once against the full total
        let total = 1_000_000_000;
        assert_eq!(
            events,
            vec![
                SweepEvent::Progress { current: 0, total },
                SweepEvent::Progress { current: 1, total },
                SweepEvent::Progress { current: 2, total },
            ]
        );
    }

    #[test]
    fn empty_grid_is_an_error_frame() {
        let mut grids = OptimizerGrids::singleton(&StrategyParams::default());
        grids.chg4.clear();
        let events: Vec<_> = OfflineBackend::new()
            .open_sweep(&request(grids))
            .unwrap()
            .collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(SweepEvent::Error(_))));
    }

    #[test]
    fn saved_config_is_returned() {
        let backend = OfflineBackend::new();
        let mut config = backend.config().unwrap();
        config.default_params.ma.value = 40.0;
        backend.save_config(&config).unwrap();
        assert_eq!(backend.config().unwrap().default_params.ma.value, 40.0);
    }

    #[test]
    fn signal_metrics_describe_last_bar() {
        let backend = OfflineBackend::new();
        let response = backend
            .signal(&SignalRequest {
                ticker: "SPHY".into(),
                params: StrategyParams::default(),
                start_invested: StartPosition::Invested,
                cash_rate: 0.04,
                input_type: InputType::Csv,
            })
            .unwrap();
        let market = SyntheticMarket::new("SPHY");
        assert_eq!(response.metrics.last_date, market.bars[WEEKS - 1].date);
        assert!(response.metrics.ma.is_some());
    }
}
