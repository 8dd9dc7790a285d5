// =============================================================================
// Positions - the live trade, its terminal event, and the owned book
// =============================================================================
//
// Exactly one position may be open per symbol. The book is plain owned
// state inside the orchestrator; there is no global registry and no lock,
// because a single cycle owns all mutation.
//
// A position's stop_loss is the only field that mutates during its life,
// and only ever in the favourable direction. Closing a position produces
// exactly one immutable ExitEvent.
// =============================================================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Direction;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A confirmed open trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Broker ticket identifying the position at the execution boundary.
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    /// Current effective stop. Zero means unset (e.g. an adopted ticket).
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Size in lots.
    pub size: f64,
    /// Cascade label copied from the decision that opened the trade.
    pub strategy_label: String,
}

impl Position {
    /// Realised pnl if closed at `exit_price`:
    /// `(exit - entry) * direction * size`.
    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        (exit_price - self.entry_price) * self.direction.sign() * self.size
    }

    /// Unrealised pnl as a percentage of the entry price, signed by
    /// direction.
    pub fn unrealized_pnl_pct(&self, price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.direction.sign() * (price - self.entry_price) / self.entry_price * 100.0
    }

    /// Minutes elapsed since entry.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> f64 {
        now.signed_duration_since(self.entry_time).num_seconds() as f64 / 60.0
    }
}

// ---------------------------------------------------------------------------
// Exit
// ---------------------------------------------------------------------------

/// Why a position was closed. Exactly one reason fires per close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TimeLimit,
    MlExit,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopLoss => write!(f, "SL"),
            Self::TakeProfit => write!(f, "TP"),
            Self::TimeLimit => write!(f, "TIME"),
            Self::MlExit => write!(f, "ML_EXIT"),
        }
    }
}

/// Terminal artifact of a closed position, immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitEvent {
    pub position_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub reason: ExitReason,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub closed_at: DateTime<Utc>,
}

impl ExitEvent {
    /// Build the terminal event for `position` closed at `exit_price`.
    pub fn from_close(
        position: &Position,
        reason: ExitReason,
        exit_price: f64,
        closed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            position_id: position.id.clone(),
            symbol: position.symbol.clone(),
            direction: position.direction,
            reason,
            entry_price: position.entry_price,
            exit_price,
            pnl: position.pnl_at(exit_price),
            closed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// PositionBook
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("a position is already open for {0}")]
    AlreadyOpen(String),
}

/// Owned collection of open positions, keyed by symbol.
#[derive(Debug, Default)]
pub struct PositionBook {
    open: HashMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a confirmed position. Rejects a second position for the same
    /// symbol; the caller must close the existing one first.
    pub fn open(&mut self, position: Position) -> Result<(), PositionError> {
        if self.open.contains_key(&position.symbol) {
            return Err(PositionError::AlreadyOpen(position.symbol));
        }
        self.open.insert(position.symbol.clone(), position);
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.open.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.open.get_mut(symbol)
    }

    /// Remove and return the symbol's position (on confirmed close).
    pub fn remove(&mut self, symbol: &str) -> Option<Position> {
        self.open.remove(symbol)
    }

    pub fn is_open(&self, symbol: &str) -> bool {
        self.open.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
