// =============================================================================
// Trade Journal - append-only entry/exit log
// =============================================================================
//
// Every confirmed entry and exit is appended to a durable JSON-lines file,
// feeding the audit trail and the offline retraining pipeline. The journal
// sits OFF the decision path: a failed write is logged with a warning and
// swallowed, never propagated into the cycle.
// =============================================================================

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::position::{ExitEvent, Position};
use crate::types::Direction;

/// One journal line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEvent {
    Entry {
        at: DateTime<Utc>,
        ticket: String,
        symbol: String,
        direction: Direction,
        strategy: String,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
        size: f64,
    },
    Exit {
        at: DateTime<Utc>,
        ticket: String,
        symbol: String,
        direction: Direction,
        reason: String,
        entry_price: f64,
        exit_price: f64,
        pnl: f64,
    },
}

impl JournalEvent {
    /// Build the entry record for a freshly opened position.
    pub fn entry(position: &Position) -> Self {
        Self::Entry {
            at: position.entry_time,
            ticket: position.id.clone(),
            symbol: position.symbol.clone(),
            direction: position.direction,
            strategy: position.strategy_label.clone(),
            entry_price: position.entry_price,
            stop_loss: position.stop_loss,
            take_profit: position.take_profit,
            size: position.size,
        }
    }

    /// Build the exit record from a terminal event.
    pub fn exit(event: &ExitEvent) -> Self {
        Self::Exit {
            at: event.closed_at,
            ticket: event.position_id.clone(),
            symbol: event.symbol.clone(),
            direction: event.direction,
            reason: event.reason.to_string(),
            entry_price: event.entry_price,
            exit_price: event.exit_price,
            pnl: event.pnl,
        }
    }
}

/// Append-only journal collaborator.
pub trait TradeJournal: Send + Sync {
    /// Record an event. Implementations must not fail the caller.
    fn record(&self, event: &JournalEvent);
}

// ---------------------------------------------------------------------------
// JSON-lines file journal
// ---------------------------------------------------------------------------

pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, event: &JournalEvent) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let line = serde_json::to_string(event)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl TradeJournal for JsonlJournal {
    fn record(&self, event: &JournalEvent) {
        if let Err(e) = self.append(event) {
            warn!(
                path = %self.path.display(),
                error = %e,
                "journal write failed, event dropped"
            );
        }
    }
}

/// Journal that drops everything. Used in tests and when journalling is
/// disabled.
#[derive(Debug, Default)]
pub struct NullJournal;

impl TradeJournal for NullJournal {
    fn record(&self, _event: &JournalEvent) {}
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::ExitReason;

    fn sample_position() -> Position {
        Position {
            id: "t-42".to_string(),
            symbol: "XAUUSD".to_string(),
            direction: Direction::Long,
            entry_price: 2000.0,
            entry_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            stop_loss: 1998.5,
            take_profit: 2003.0,
            size: 0.1,
            strategy_label: "Ensemble Long".to_string(),
        }
    }

    fn temp_journal_path() -> PathBuf {
        std::env::temp_dir().join(format!("aurum-journal-{}.jsonl", uuid::Uuid::new_v4()))
    }

    #[test]
    fn entries_and_exits_append_as_json_lines() {
        let path = temp_journal_path();
        let journal = JsonlJournal::new(&path);

        let position = sample_position();
        journal.record(&JournalEvent::entry(&position));

        let exit = ExitEvent::from_close(&position, ExitReason::TakeProfit, 2003.0, Utc::now());
        journal.record(&JournalEvent::exit(&exit));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "entry");
        assert_eq!(first["ticket"], "t-42");
        assert_eq!(first["strategy"], "Ensemble Long");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "exit");
        assert_eq!(second["reason"], "TP");
        assert!((second["pnl"].as_f64().unwrap() - 0.3).abs() < 1e-10);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn unwritable_path_is_swallowed() {
        // A directory as the journal path makes every append fail; record
        // must not panic or propagate.
        let journal = JsonlJournal::new(std::env::temp_dir());
        journal.record(&JournalEvent::entry(&sample_position()));
    }

    #[test]
    fn null_journal_accepts_everything() {
        NullJournal.record(&JournalEvent::entry(&sample_position()));
    }
}
