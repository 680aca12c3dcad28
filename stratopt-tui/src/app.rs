//! Application state: panels, forms, status line and the request plumbing.
//!
//! Sweeps and drill-downs are owned by the session manager and the
//! drill-down resolver and are polled every tick. One-shot requests
//! (config, buy-and-hold, signal) go through the worker; their results land
//! in generation-tagged [`RequestSlot`]s so a superseded response is dropped.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use chrono::NaiveDateTime;

use stratopt_client::{Backend, DrillDownResolver, DrillOutcome, StreamingSessionManager, SweepContext};
use stratopt_core::{
    export_rows, merge_curves, write_csv_file, AppConfig, BacktestResult, BuyHoldRequest,
    ChartPoint, SettingsPatch, SettingsStore, SignalRequest, SignalResponse,
};

use crate::form::{
    BuyHoldForm, Form, OptimizerForm, RunOptions, SettingsEdit, SettingsForm, SignalForm,
};
use crate::table::{format_percent, ResultsTable};
use crate::theme::Theme;
use crate::worker::{BuyHoldPurpose, WorkerCommand, WorkerResponse};

/// File name for chart exports, written into the export directory.
pub const EXPORT_FILE: &str = "equity_curve.csv";

const MAX_ERROR_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Optimizer,
    Results,
    Chart,
    BuyHold,
    Signal,
    Settings,
    Help,
}

impl Panel {
    pub const ALL: [Panel; 7] = [
        Panel::Optimizer,
        Panel::Results,
        Panel::Chart,
        Panel::BuyHold,
        Panel::Signal,
        Panel::Settings,
        Panel::Help,
    ];

    pub fn index(self) -> usize {
        match self {
            Panel::Optimizer => 0,
            Panel::Results => 1,
            Panel::Chart => 2,
            Panel::BuyHold => 3,
            Panel::Signal => 4,
            Panel::Settings => 5,
            Panel::Help => 6,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Panel::Optimizer => "Optimizer",
            Panel::Results => "Results",
            Panel::Chart => "Chart",
            Panel::BuyHold => "Buy & Hold",
            Panel::Signal => "Signal",
            Panel::Settings => "Settings",
            Panel::Help => "Help",
        }
    }

    pub fn next(self) -> Panel {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Panel {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub timestamp: NaiveDateTime,
    pub category: ErrorCategory,
    pub message: String,
    pub context: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Sweep,
    DrillDown,
    BuyHold,
    Signal,
    Settings,
    Export,
    Other,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Config => "Config",
            ErrorCategory::Sweep => "Sweep",
            ErrorCategory::DrillDown => "Drill-down",
            ErrorCategory::BuyHold => "Buy & Hold",
            ErrorCategory::Signal => "Signal",
            ErrorCategory::Settings => "Settings",
            ErrorCategory::Export => "Export",
            ErrorCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    ErrorHistory,
    /// Blocking: the config could not be loaded.
    ConfigError,
}

/// `{loading, result, error}` for one kind of request.
///
/// `begin` bumps the generation; `resolve` applies a response only if it
/// carries the current generation and the slot is still loading.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSlot<T> {
    pub generation: u64,
    pub loading: bool,
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> Default for RequestSlot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            loading: false,
            result: None,
            error: None,
        }
    }
}

impl<T> RequestSlot<T> {
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.result = None;
        self.error = None;
        self.generation
    }

    pub fn resolve(&mut self, generation: u64, outcome: Result<T, String>) -> bool {
        if generation != self.generation || !self.loading {
            tracing::debug!(
                "dropping response from generation {generation} (current {})",
                self.generation
            );
            return false;
        }
        self.loading = false;
        match outcome {
            Ok(value) => self.result = Some(value),
            Err(e) => self.error = Some(e),
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ChartState {
    pub show_buy_hold: bool,
    /// Buy-and-hold curve fetched alongside the current sweep.
    pub overlay: RequestSlot<BacktestResult>,
}

impl Default for ChartState {
    fn default() -> Self {
        Self {
            show_buy_hold: true,
            overlay: RequestSlot::default(),
        }
    }
}

pub struct AppState {
    pub running: bool,
    pub active_panel: Panel,
    pub overlay: Overlay,
    pub status_message: Option<(String, StatusLevel)>,
    pub error_history: VecDeque<ErrorRecord>,
    pub error_scroll: usize,
    pub theme: Theme,
    pub ticker: String,
    pub backend_name: String,
    pub export_dir: PathBuf,

    pub settings: SettingsStore,
    pub config: Option<AppConfig>,
    pub config_loading: bool,
    pub config_error: Option<String>,
    pub config_saving: bool,

    pub session: StreamingSessionManager,
    pub drill: DrillDownResolver,
    /// Context of the most recent sweep; drill-downs reuse it.
    pub sweep_ctx: Option<SweepContext>,
    /// Last session/drill generation whose outcome has been reported.
    session_seen: u64,
    drill_seen: u64,

    pub optimizer: OptimizerForm,
    pub results: ResultsTable,
    pub chart: ChartState,
    pub buyhold: BuyHoldForm,
    pub buyhold_view: RequestSlot<BacktestResult>,
    pub signal: SignalForm,
    pub signal_view: RequestSlot<SignalResponse>,
    pub settings_form: SettingsForm,

    pub worker_tx: Sender<WorkerCommand>,
    pub worker_rx: Receiver<WorkerResponse>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn Backend>,
        settings: SettingsStore,
        ticker: String,
        worker_tx: Sender<WorkerCommand>,
        worker_rx: Receiver<WorkerResponse>,
        export_dir: PathBuf,
    ) -> Self {
        let fallback = AppConfig::fallback();
        let options = RunOptions::from(settings.settings());
        let theme = Theme::named(&settings.settings().theme);
        let settings_form = SettingsForm::new(fallback.clone(), settings.settings().clone());

        Self {
            running: true,
            active_panel: Panel::Optimizer,
            overlay: Overlay::None,
            status_message: None,
            error_history: VecDeque::new(),
            error_scroll: 0,
            theme,
            ticker,
            backend_name: backend.name().to_string(),
            export_dir,
            settings,
            config: None,
            config_loading: false,
            config_error: None,
            config_saving: false,
            session: StreamingSessionManager::new(Arc::clone(&backend)),
            drill: DrillDownResolver::new(backend),
            sweep_ctx: None,
            session_seen: 0,
            drill_seen: 0,
            optimizer: OptimizerForm::new(fallback.default_ranges, options),
            results: ResultsTable::default(),
            chart: ChartState::default(),
            buyhold: BuyHoldForm::new(options),
            buyhold_view: RequestSlot::default(),
            signal: SignalForm::new(fallback.default_params.to_params(), options),
            signal_view: RequestSlot::default(),
            settings_form,
            worker_tx,
            worker_rx,
        }
    }

    pub fn push_error(&mut self, category: ErrorCategory, message: String, context: String) {
        tracing::warn!("{}: {message}", category.label());
        let record = ErrorRecord {
            timestamp: chrono::Local::now().naive_local(),
            category,
            message: message.clone(),
            context,
        };
        self.error_history.push_front(record);
        if self.error_history.len() > MAX_ERROR_HISTORY {
            self.error_history.pop_back();
        }
        self.status_message = Some((message, StatusLevel::Error));
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Info));
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.status_message = Some((msg.into(), StatusLevel::Warning));
    }

    fn send(&mut self, cmd: WorkerCommand) -> bool {
        if self.worker_tx.send(cmd).is_err() {
            self.push_error(
                ErrorCategory::Other,
                "Background worker is not running".into(),
                String::new(),
            );
            return false;
        }
        true
    }

    /// Panels stay locked until the backend config has loaded.
    pub fn is_ready(&self) -> bool {
        self.config.is_some()
    }

    // ── Config ───────────────────────────────────────────────────────────

    pub fn request_config(&mut self) {
        self.config_loading = true;
        self.config_error = None;
        if !self.send(WorkerCommand::LoadConfig) {
            self.config_loading = false;
        }
    }

    fn apply_config(&mut self, config: AppConfig) {
        self.optimizer.ranges = config.default_ranges;
        self.signal.params = config.default_params.to_params();
        self.settings_form.draft = config.clone();
        self.config = Some(config);
    }

    /// Reset the optimizer ranges to the config's defaults.
    pub fn reset_ranges(&mut self) {
        if let Some(config) = &self.config {
            self.optimizer.ranges = config.default_ranges;
            self.set_status("Ranges reset to defaults");
        }
    }

    pub fn reset_signal_params(&mut self) {
        if let Some(config) = &self.config {
            self.signal.params = config.default_params.to_params();
            self.set_status("Parameters reset to defaults");
        }
    }

    pub fn save_config(&mut self) {
        if self.config_saving || !self.is_ready() {
            return;
        }
        self.config_saving = true;
        let draft = Box::new(self.settings_form.draft.clone());
        if self.send(WorkerCommand::SaveConfig(draft)) {
            self.set_status("Saving config...");
        } else {
            self.config_saving = false;
        }
    }

    pub fn revert_config_draft(&mut self) {
        if let Some(config) = &self.config {
            self.settings_form.draft = config.clone();
            self.set_status("Unsaved config changes discarded");
        }
    }

    // ── Local settings ───────────────────────────────────────────────────

    /// Apply queued Settings-panel edits to the persisted store.
    pub fn apply_settings_edits(&mut self) {
        let edits: Vec<SettingsEdit> = self.settings_form.pending.drain(..).collect();
        if edits.is_empty() {
            return;
        }
        for edit in edits {
            let current = self.settings.settings();
            let patch = match edit {
                SettingsEdit::NextTheme => SettingsPatch {
                    theme: Some(Theme::next_name(&current.theme).to_string()),
                    ..SettingsPatch::default()
                },
                SettingsEdit::ToggleInputType => SettingsPatch {
                    input_type: Some(current.input_type.toggle()),
                    ..SettingsPatch::default()
                },
                SettingsEdit::CashRate(rate) => SettingsPatch {
                    cash_rate: Some(rate),
                    ..SettingsPatch::default()
                },
                SettingsEdit::ToggleStart => SettingsPatch {
                    start_invested: Some(current.start_invested.toggle()),
                    ..SettingsPatch::default()
                },
            };
            if let Err(e) = self.settings.update(patch) {
                self.push_error(
                    ErrorCategory::Settings,
                    format!("Settings not saved: {e}"),
                    String::new(),
                );
            }
        }

        let settings = self.settings.settings().clone();
        self.theme = Theme::named(&settings.theme);
        let options = RunOptions::from(&settings);
        self.optimizer.options = options;
        self.buyhold.options = options;
        self.signal.options = options;
        self.settings_form.sync_settings(&settings);
    }

    // ── Sweep ────────────────────────────────────────────────────────────

    /// Expand the ranges and start a sweep, replacing any sweep in flight.
    ///
    /// Also clears the table and drill-down and fetches the buy-and-hold
    /// curve for the chart overlay.
    pub fn run_sweep(&mut self) {
        if !self.is_ready() {
            return;
        }
        let grids = match self.optimizer.ranges.to_grids() {
            Ok(grids) => grids,
            Err(e) => {
                self.push_error(
                    ErrorCategory::Sweep,
                    format!("Invalid range: {e}"),
                    String::new(),
                );
                return;
            }
        };

        let options = self.optimizer.options;
        let ctx = SweepContext {
            ticker: self.ticker.clone(),
            start_invested: options.start_invested,
            cash_rate: options.cash_rate,
            input_type: options.input_type,
        };
        let total = grids.combinations();

        self.drill.close();
        self.results.clear();
        self.session.start(&ctx, grids);

        let generation = self.chart.overlay.begin();
        self.send(WorkerCommand::BuyHold {
            purpose: BuyHoldPurpose::Overlay,
            generation,
            request: BuyHoldRequest {
                ticker: ctx.ticker.clone(),
                cash_rate: ctx.cash_rate,
                input_type: ctx.input_type,
            },
        });

        self.sweep_ctx = Some(ctx);
        self.set_status(format!("Sweep started: {total} combinations"));
    }

    pub fn cancel_sweep(&mut self) {
        if self.session.is_loading() {
            self.session.cancel();
            self.set_warning("Sweep cancelled");
        }
    }

    /// Apply streamed sweep and drill-down frames.
    pub fn tick(&mut self) {
        self.session.poll();
        self.sync_session();
        self.drill.poll();
        self.sync_drill();
    }

    /// React once to a session that finished under its current generation.
    fn sync_session(&mut self) {
        let generation = self.session.generation();
        if self.session.is_loading() || self.session_seen == generation {
            return;
        }
        if let Some(response) = self.session.state().result.as_ref() {
            self.results.load(response);
            let msg = format!(
                "Sweep complete: {} combinations, best APY {}",
                response.all_results.len(),
                format_percent(response.best_result.apy)
            );
            self.session_seen = generation;
            self.set_status(msg);
        } else if let Some(err) = self.session.state().error.clone() {
            self.session_seen = generation;
            self.push_error(ErrorCategory::Sweep, format!("Sweep failed: {err}"), String::new());
        }
    }

    fn sync_drill(&mut self) {
        let generation = self.drill.generation();
        if self.drill_seen == generation {
            return;
        }
        let state = self.drill.state();
        if let (false, Some(err)) = (state.loading, state.error.clone()) {
            let context = state.open.map(|p| p.to_string()).unwrap_or_default();
            self.drill_seen = generation;
            self.push_error(ErrorCategory::DrillDown, format!("Backtest failed: {err}"), context);
        }
    }

    // ── Drill-down & chart ───────────────────────────────────────────────

    /// Open or close the drill-down for the selected row.
    pub fn toggle_drill(&mut self) {
        let (Some(params), Some(ctx)) = (self.results.selected_params(), self.sweep_ctx.clone())
        else {
            return;
        };
        let outcome = self
            .drill
            .toggle(params, self.session.state().result.as_ref(), &ctx);
        match outcome {
            DrillOutcome::Closed => self.set_status("Chart closed"),
            DrillOutcome::Cached => self.set_status(format!("Chart: best result {params}")),
            DrillOutcome::Requested { .. } => {
                self.set_status(format!("Running backtest for {params}"))
            }
        }
    }

    pub fn close_drill(&mut self) {
        self.drill.close();
    }

    pub fn toggle_buy_hold_overlay(&mut self) {
        self.chart.show_buy_hold = !self.chart.show_buy_hold;
    }

    /// Secondary curve included in the chart and its export, if any.
    fn overlay_included(&self) -> bool {
        self.chart.show_buy_hold && self.chart.overlay.result.is_some()
    }

    /// Merged points for the open drill-down.
    pub fn chart_points(&self) -> Option<Vec<ChartPoint>> {
        let result = self.drill.state().result.as_ref()?;
        let secondary = if self.chart.show_buy_hold {
            self.chart
                .overlay
                .result
                .as_ref()
                .map(|bh| bh.equity_curve.as_slice())
        } else {
            None
        };
        Some(merge_curves(
            &result.equity_curve,
            secondary,
            &result.buy_dates,
            &result.sell_dates,
        ))
    }

    pub fn export_chart(&mut self) {
        let Some(points) = self.chart_points() else {
            self.set_warning("Nothing to export: open a result row first");
            return;
        };
        let include = self.overlay_included();
        let rows = export_rows(&points, include);
        let path = self.export_dir.join(EXPORT_FILE);
        match write_csv_file(&path, &rows, include) {
            Ok(()) => {
                self.set_status(format!("Exported {} rows to {}", rows.len(), path.display()))
            }
            Err(e) => self.push_error(
                ErrorCategory::Export,
                format!("Export failed: {e}"),
                path.display().to_string(),
            ),
        }
    }

    // ── Buy & Hold / Signal views ────────────────────────────────────────

    pub fn run_buy_hold(&mut self) {
        if !self.is_ready() {
            return;
        }
        let options = self.buyhold.options;
        let generation = self.buyhold_view.begin();
        self.send(WorkerCommand::BuyHold {
            purpose: BuyHoldPurpose::View,
            generation,
            request: BuyHoldRequest {
                ticker: self.ticker.clone(),
                cash_rate: options.cash_rate,
                input_type: options.input_type,
            },
        });
    }

    pub fn run_signal(&mut self) {
        if !self.is_ready() {
            return;
        }
        let options = self.signal.options;
        let generation = self.signal_view.begin();
        self.send(WorkerCommand::Signal {
            generation,
            request: SignalRequest {
                ticker: self.ticker.clone(),
                params: self.signal.params,
                start_invested: options.start_invested,
                cash_rate: options.cash_rate,
                input_type: options.input_type,
            },
        });
    }

    // ── Worker responses ─────────────────────────────────────────────────

    pub fn handle_worker_response(&mut self, resp: WorkerResponse) {
        match resp {
            WorkerResponse::ConfigLoaded(Ok(config)) => {
                self.config_loading = false;
                self.config_error = None;
                self.apply_config(*config);
                if self.overlay == Overlay::ConfigError {
                    self.overlay = Overlay::None;
                }
                let msg = format!("Config loaded from {}", self.backend_name);
                self.set_status(msg);
            }
            WorkerResponse::ConfigLoaded(Err(e)) => {
                self.config_loading = false;
                self.config_error = Some(e.clone());
                self.overlay = Overlay::ConfigError;
                let context = self.backend_name.clone();
                self.push_error(ErrorCategory::Config, format!("Failed to load config: {e}"), context);
            }
            WorkerResponse::ConfigSaved(Ok(config)) => {
                self.config_saving = false;
                self.config = Some(*config);
                self.set_status("Config saved");
            }
            WorkerResponse::ConfigSaved(Err(e)) => {
                self.config_saving = false;
                self.push_error(ErrorCategory::Config, format!("Config save failed: {e}"), String::new());
            }
            WorkerResponse::BuyHold {
                purpose: BuyHoldPurpose::Overlay,
                generation,
                result,
            } => {
                if self.chart.overlay.resolve(generation, result.map(|r| *r)) {
                    if let Some(e) = self.chart.overlay.error.clone() {
                        self.set_warning(format!("Buy & Hold overlay failed: {e}"));
                    }
                }
            }
            WorkerResponse::BuyHold {
                purpose: BuyHoldPurpose::View,
                generation,
                result,
            } => {
                if self.buyhold_view.resolve(generation, result.map(|r| *r)) {
                    if let Some(e) = self.buyhold_view.error.clone() {
                        self.push_error(ErrorCategory::BuyHold, format!("Buy & Hold failed: {e}"), String::new());
                    }
                }
            }
            WorkerResponse::Signal { generation, result } => {
                if self.signal_view.resolve(generation, result.map(|r| *r)) {
                    let signal = self.signal_view.result.as_ref().map(|r| r.signal);
                    match (signal, self.signal_view.error.clone()) {
                        (Some(signal), _) => self.set_status(format!("Current signal: {signal}")),
                        (None, Some(e)) => self.push_error(
                            ErrorCategory::Signal,
                            format!("Signal failed: {e}"),
                            String::new(),
                        ),
                        (None, None) => {}
                    }
                }
            }
        }
    }

    // ── Forms ────────────────────────────────────────────────────────────

    /// The form on the active panel, if it has one.
    pub fn active_form_mut(&mut self) -> Option<&mut dyn Form> {
        match self.active_panel {
            Panel::Optimizer => Some(&mut self.optimizer),
            Panel::BuyHold => Some(&mut self.buyhold),
            Panel::Signal => Some(&mut self.signal),
            Panel::Settings => Some(&mut self.settings_form),
            Panel::Results | Panel::Chart | Panel::Help => None,
        }
    }

    /// Whether a number is being typed on the active panel.
    pub fn is_editing(&self) -> bool {
        match self.active_panel {
            Panel::Optimizer => self.optimizer.is_editing(),
            Panel::BuyHold => self.buyhold.is_editing(),
            Panel::Signal => self.signal.is_editing(),
            Panel::Settings => self.settings_form.is_editing(),
            Panel::Results | Panel::Chart | Panel::Help => false,
        }
    }
}
