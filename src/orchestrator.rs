// =============================================================================
// Cycle Orchestrator - one full evaluation per bar close
// =============================================================================
//
// Single logical thread of control. Each cycle:
//
//   1. Fetch the rolling window (abort cycle on data failure, retry next bar)
//   2. If a position is open: manage it (SL/TP/time/ML exit, stop ratchet)
//      and stop; entries are never evaluated while a position exists
//   3. Collect strategy votes and fold them through the ensemble cascade
//   4. Evaluate the statistical gate (fails closed)
//   5. Build the feature vector and poll the entry filter
//   6. Submit the order; open a Position only on a confirmed fill
//
// Every cycle produces a CycleReport for the audit trail. Any expected
// failure inside signal/gate/filter logic degrades to "no action this
// cycle"; the only error that escapes is a feature-schema contract
// violation, which indicates an operator-level packaging mismatch.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::OrderExecutor;
use crate::config::EngineConfig;
use crate::exit::lifecycle::{LifecycleAction, LifecycleManager, LifecycleSettings};
use crate::exit::trailing::TrailingPolicy;
use crate::gate::{GateVerdict, RegimeGate, RegimeModel, VolatilityModel};
use crate::journal::{JournalEvent, TradeJournal};
use crate::market_data::{BarWindow, MarketData};
use crate::ml::entry_filter::{EntryClassifier, EntryFilter};
use crate::ml::exit_model::ExitProbabilityModel;
use crate::ml::features::{FeatureError, FeatureVector};
use crate::position::{ExitEvent, ExitReason, Position, PositionBook};
use crate::signals::{self, SignalStrategy, SignalVote};
use crate::types::Direction;

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// What one cycle did, for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleOutcome {
    /// Window fetch failed; nothing evaluated.
    DataUnavailable,
    /// No strategy produced a tradeable direction.
    NoSignal,
    /// The statistical gate vetoed the entry.
    GateBlocked,
    /// The window was too short (or too dirty) for the feature schema.
    FeaturesUnavailable,
    /// The classifier ensemble rejected the entry.
    FilterRejected,
    /// A position was opened on a confirmed fill.
    Entered,
    /// The broker rejected or failed the entry order.
    OrderFailed,
    /// The open position was held unchanged.
    PositionHeld,
    /// The open position's stop was ratcheted.
    StopTightened,
    /// The broker refused the stop modification; retried next cycle.
    StopModifyFailed,
    /// The open position was closed with an exit event.
    PositionClosed,
    /// The broker refused the close; the position remains and is retried.
    CloseFailed,
}

/// Auditable record of a single cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub id: String,
    pub at: DateTime<Utc>,
    pub symbol: String,
    pub outcome: CycleOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateVerdict>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitEvent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CycleReport {
    fn new(symbol: &str, outcome: CycleOutcome) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            at: Utc::now(),
            symbol: symbol.to_string(),
            outcome,
            gate: None,
            decision_label: None,
            exit: None,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The per-bar decision engine. Owns all mutable trading state; one
/// instance is driven by the cycle loop in `main`.
pub struct Engine {
    config: EngineConfig,
    market: Arc<dyn MarketData>,
    broker: Arc<dyn OrderExecutor>,
    journal: Arc<dyn TradeJournal>,
    strategies: Vec<Box<dyn SignalStrategy>>,
    gate: RegimeGate,
    entry_filter: EntryFilter,
    lifecycle: LifecycleManager,
    book: PositionBook,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        market: Arc<dyn MarketData>,
        broker: Arc<dyn OrderExecutor>,
        journal: Arc<dyn TradeJournal>,
        volatility: Box<dyn VolatilityModel>,
        regime: Box<dyn RegimeModel>,
        classifiers: Vec<Box<dyn EntryClassifier>>,
        exit_model: Box<dyn ExitProbabilityModel>,
    ) -> Self {
        let strategies = signals::default_strategies(&config.signals);
        let gate = RegimeGate::new(volatility, regime, config.gate.volatility_ceiling_pct);
        let entry_filter = EntryFilter::new(classifiers);
        let lifecycle = LifecycleManager::new(
            TrailingPolicy::new(
                config.exit.trailing_distance_points,
                config.exit.allow_seed_when_unset,
            ),
            LifecycleSettings {
                max_holding_minutes: config.exit.max_holding_minutes,
                exit_probability_floor: config.exit.exit_probability_floor,
                point_size: config.point_size,
            },
            exit_model,
        );

        Self {
            config,
            market,
            broker,
            journal,
            strategies,
            gate,
            entry_filter,
            lifecycle,
            book: PositionBook::new(),
        }
    }

    /// The open position for the engine's symbol, if any.
    pub fn open_position(&self) -> Option<&Position> {
        self.book.get(&self.config.symbol)
    }

    /// Run one full cycle.
    ///
    /// `Err` is reserved for feature-schema contract violations; every
    /// market condition and collaborator failure folds into the report.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, FeatureError> {
        let symbol = self.config.symbol.clone();

        // ── 1. Fetch the window ──────────────────────────────────────────
        let bars = match self
            .market
            .fetch_window(&symbol, &self.config.interval, self.config.window_bars)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "window fetch failed, retrying next bar");
                return Ok(
                    CycleReport::new(&symbol, CycleOutcome::DataUnavailable).with_detail(e.to_string())
                );
            }
        };

        let window = BarWindow::from_bars(self.config.window_bars, bars);
        let Some(price) = window.last().map(|b| b.close) else {
            return Ok(CycleReport::new(&symbol, CycleOutcome::DataUnavailable)
                .with_detail("empty window"));
        };
        let now = Utc::now();

        // ── 2. Manage an open position, entries wait ─────────────────────
        if self.book.is_open(&symbol) {
            return Ok(self.manage_position(&symbol, &window, price, now).await);
        }

        // ── 3. Votes and cascade ─────────────────────────────────────────
        let votes: Vec<SignalVote> = self
            .strategies
            .iter()
            .map(|s| s.evaluate(&window))
            .collect();

        debug!(
            symbol = %symbol,
            votes = ?votes.iter().map(|v| (v.strategy, v.value())).collect::<Vec<_>>(),
            "strategy votes collected"
        );

        let Some(decision) = signals::decide(&votes) else {
            return Ok(CycleReport::new(&symbol, CycleOutcome::NoSignal));
        };

        // ── 4. Statistical gate ──────────────────────────────────────────
        let verdict = self.gate.evaluate(&window);
        if !verdict.pass {
            let mut report = CycleReport::new(&symbol, CycleOutcome::GateBlocked);
            report.decision_label = Some(decision.label.to_string());
            report.detail = verdict.block_reason.clone();
            report.gate = Some(verdict);
            return Ok(report);
        }

        let (Some(volatility), Some(regime)) =
            (verdict.volatility_forecast, verdict.regime_current)
        else {
            let mut report = CycleReport::new(&symbol, CycleOutcome::GateBlocked);
            report.gate = Some(verdict);
            return Ok(report.with_detail("incomplete gate verdict"));
        };

        // ── 5. Features and the entry filter ─────────────────────────────
        let features = match FeatureVector::build(&window, volatility, regime) {
            Ok(f) => f,
            Err(e @ (FeatureError::Insufficient(_) | FeatureError::NonFinite(_))) => {
                debug!(symbol = %symbol, error = %e, "features unavailable, abstaining");
                let mut report = CycleReport::new(&symbol, CycleOutcome::FeaturesUnavailable);
                report.gate = Some(verdict);
                return Ok(report.with_detail(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let filter = self.entry_filter.decide(&features)?;
        if !filter.accepted {
            let mut report = CycleReport::new(&symbol, CycleOutcome::FilterRejected);
            report.decision_label = Some(decision.label.to_string());
            report.gate = Some(verdict);
            return Ok(report.with_detail(format!(
                "{} of {} classifiers accepted",
                filter.votes_for, filter.votes_cast
            )));
        }

        // ── 6. Entry ─────────────────────────────────────────────────────
        let sl_offset = self.config.exit.stop_loss_points * self.config.point_size;
        let tp_offset = self.config.exit.take_profit_points * self.config.point_size;
        let (stop_loss, take_profit) = match decision.direction {
            Direction::Long => (price - sl_offset, price + tp_offset),
            Direction::Short => (price + sl_offset, price - tp_offset),
        };

        let fill = match self
            .broker
            .submit_order(
                &symbol,
                decision.direction,
                self.config.lot_size,
                price,
                stop_loss,
                take_profit,
            )
            .await
        {
            Ok(fill) => fill,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "entry order failed, no position created");
                let mut report = CycleReport::new(&symbol, CycleOutcome::OrderFailed);
                report.decision_label = Some(decision.label.to_string());
                return Ok(report.with_detail(e.to_string()));
            }
        };

        let position = Position {
            id: fill.ticket,
            symbol: symbol.clone(),
            direction: decision.direction,
            entry_price: fill.fill_price,
            entry_time: now,
            stop_loss,
            take_profit,
            size: self.config.lot_size,
            strategy_label: decision.label.to_string(),
        };

        info!(
            symbol = %symbol,
            side = %position.direction,
            label = %position.strategy_label,
            entry_price = position.entry_price,
            stop_loss,
            take_profit,
            "position opened"
        );

        self.journal.record(&JournalEvent::entry(&position));

        if let Err(e) = self.book.open(position) {
            // Unreachable for a single-symbol engine (the open-position
            // branch returned above), but never silently drop a live fill.
            warn!(symbol = %symbol, error = %e, "fill could not be booked");
        }

        let mut report = CycleReport::new(&symbol, CycleOutcome::Entered);
        report.decision_label = Some(decision.label.to_string());
        report.gate = Some(verdict);
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Position management
    // -------------------------------------------------------------------------

    async fn manage_position(
        &mut self,
        symbol: &str,
        window: &BarWindow,
        price: f64,
        now: DateTime<Utc>,
    ) -> CycleReport {
        let Some(position) = self.book.get(symbol).cloned() else {
            return CycleReport::new(symbol, CycleOutcome::PositionHeld);
        };

        match self.lifecycle.evaluate(&position, window, now) {
            LifecycleAction::Hold => {
                debug!(id = %position.id, price, "position held");
                CycleReport::new(symbol, CycleOutcome::PositionHeld)
            }

            LifecycleAction::TightenStop(new_stop) => {
                match self.broker.modify_stop(&position.id, new_stop).await {
                    Ok(()) => {
                        if let Some(p) = self.book.get_mut(symbol) {
                            p.stop_loss = new_stop;
                        }
                        info!(
                            id = %position.id,
                            new_stop,
                            price,
                            "trailing stop tightened"
                        );
                        CycleReport::new(symbol, CycleOutcome::StopTightened)
                            .with_detail(format!("stop -> {new_stop:.2}"))
                    }
                    Err(e) => {
                        // Local state untouched; the same candidate (or a
                        // better one) is recomputed next cycle.
                        warn!(id = %position.id, error = %e, "stop modification failed");
                        CycleReport::new(symbol, CycleOutcome::StopModifyFailed)
                            .with_detail(e.to_string())
                    }
                }
            }

            LifecycleAction::Close(reason) => {
                self.close_position(symbol, &position, reason, price, now)
                    .await
            }
        }
    }

    async fn close_position(
        &mut self,
        symbol: &str,
        position: &Position,
        reason: ExitReason,
        price: f64,
        now: DateTime<Utc>,
    ) -> CycleReport {
        match self.broker.close_position(&position.id, price).await {
            Ok(fill) => {
                self.book.remove(symbol);
                let event = ExitEvent::from_close(position, reason, fill.exit_price, now);

                info!(
                    id = %position.id,
                    symbol = %symbol,
                    side = %position.direction,
                    reason = %reason,
                    entry_price = position.entry_price,
                    exit_price = event.exit_price,
                    pnl = event.pnl,
                    "position closed"
                );

                self.journal.record(&JournalEvent::exit(&event));

                let mut report = CycleReport::new(symbol, CycleOutcome::PositionClosed)
                    .with_detail(reason.to_string());
                report.exit = Some(event);
                report
            }
            Err(e) => {
                // The position stays in the book; the exit condition will
                // re-fire next cycle against fresh prices.
                warn!(id = %position.id, error = %e, reason = %reason, "close failed");
                CycleReport::new(symbol, CycleOutcome::CloseFailed).with_detail(e.to_string())
            }
        }
    }
}
