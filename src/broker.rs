// =============================================================================
// Broker Boundary - order execution collaborator
// =============================================================================
//
// The engine never assumes an order succeeded: positions are created and
// destroyed only on a confirmed fill from this boundary. Errors surface to
// the orchestrator untouched; retry policy belongs to the execution layer
// behind the trait, not to the engine.
//
// `PaperBroker` is the shipped implementation: it fills at the requested
// reference price and tracks tickets in memory, which is exactly what the
// engine needs for demo runs and tests.
// =============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::Direction;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("broker transport failure: {0}")]
    Transport(String),

    #[error("unknown position ticket: {0}")]
    UnknownTicket(String),
}

/// Confirmation of a filled entry order.
#[derive(Debug, Clone)]
pub struct OrderFill {
    pub ticket: String,
    pub fill_price: f64,
}

/// Confirmation of a closed position.
#[derive(Debug, Clone)]
pub struct ClosedFill {
    pub exit_price: f64,
}

/// Order execution collaborator.
///
/// `price` parameters are the engine's reference price (the bar close that
/// triggered the call); implementations may fill at a different price and
/// report it back.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    async fn submit_order(
        &self,
        symbol: &str,
        direction: Direction,
        size: f64,
        price: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Result<OrderFill, BrokerError>;

    async fn modify_stop(&self, ticket: &str, new_stop: f64) -> Result<(), BrokerError>;

    async fn close_position(&self, ticket: &str, price: f64) -> Result<ClosedFill, BrokerError>;
}

// ---------------------------------------------------------------------------
// PaperBroker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct PaperTicket {
    symbol: String,
    direction: Direction,
    size: f64,
    stop_loss: f64,
    take_profit: f64,
}

/// In-memory broker that fills every valid order at the reference price.
#[derive(Default)]
pub struct PaperBroker {
    tickets: RwLock<HashMap<String, PaperTicket>>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open tickets.
    pub fn open_tickets(&self) -> usize {
        self.tickets.read().len()
    }

    /// Current stop for a ticket, if it exists.
    pub fn stop_of(&self, ticket: &str) -> Option<f64> {
        self.tickets.read().get(ticket).map(|t| t.stop_loss)
    }
}

#[async_trait]
impl OrderExecutor for PaperBroker {
    async fn submit_order(
        &self,
        symbol: &str,
        direction: Direction,
        size: f64,
        price: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Result<OrderFill, BrokerError> {
        if size <= 0.0 {
            return Err(BrokerError::Rejected(format!("non-positive size {size}")));
        }
        if price <= 0.0 || !price.is_finite() {
            return Err(BrokerError::Rejected(format!("invalid price {price}")));
        }

        let ticket = Uuid::new_v4().to_string();
        self.tickets.write().insert(
            ticket.clone(),
            PaperTicket {
                symbol: symbol.to_string(),
                direction,
                size,
                stop_loss,
                take_profit,
            },
        );

        info!(
            ticket = %ticket,
            symbol,
            side = %direction,
            price,
            size,
            stop_loss,
            take_profit,
            "paper fill"
        );

        Ok(OrderFill {
            ticket,
            fill_price: price,
        })
    }

    async fn modify_stop(&self, ticket: &str, new_stop: f64) -> Result<(), BrokerError> {
        let mut tickets = self.tickets.write();
        match tickets.get_mut(ticket) {
            Some(t) => {
                t.stop_loss = new_stop;
                info!(ticket, new_stop, "paper stop modified");
                Ok(())
            }
            None => {
                warn!(ticket, "stop modification for unknown ticket");
                Err(BrokerError::UnknownTicket(ticket.to_string()))
            }
        }
    }

    async fn close_position(&self, ticket: &str, price: f64) -> Result<ClosedFill, BrokerError> {
        let removed = self.tickets.write().remove(ticket);
        match removed {
            Some(t) => {
                info!(
                    ticket,
                    symbol = %t.symbol,
                    side = %t.direction,
                    size = t.size,
                    stop_loss = t.stop_loss,
                    take_profit = t.take_profit,
                    exit_price = price,
                    "paper close"
                );
                Ok(ClosedFill { exit_price: price })
            }
            None => {
                warn!(ticket, "close for unknown ticket");
                Err(BrokerError::UnknownTicket(ticket.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for PaperBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperBroker")
            .field("open_tickets", &self.open_tickets())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn order_round_trip() {
        let broker = PaperBroker::new();
        let fill = broker
            .submit_order("XAUUSD", Direction::Long, 0.1, 2000.0, 1998.5, 2003.0)
            .await
            .unwrap();
        assert!((fill.fill_price - 2000.0).abs() < f64::EPSILON);
        assert_eq!(broker.open_tickets(), 1);

        let closed = broker.close_position(&fill.ticket, 2003.0).await.unwrap();
        assert!((closed.exit_price - 2003.0).abs() < f64::EPSILON);
        assert_eq!(broker.open_tickets(), 0);
    }

    #[tokio::test]
    async fn stop_modification_is_acknowledged() {
        let broker = PaperBroker::new();
        let fill = broker
            .submit_order("XAUUSD", Direction::Long, 0.1, 2000.0, 1998.5, 2003.0)
            .await
            .unwrap();

        broker.modify_stop(&fill.ticket, 2001.0).await.unwrap();
        assert_eq!(broker.stop_of(&fill.ticket), Some(2001.0));
    }

    #[tokio::test]
    async fn invalid_orders_are_rejected() {
        let broker = PaperBroker::new();
        let err = broker
            .submit_order("XAUUSD", Direction::Long, 0.0, 2000.0, 0.0, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Rejected(_)));

        let err = broker
            .submit_order("XAUUSD", Direction::Long, 0.1, f64::NAN, 0.0, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Rejected(_)));
        assert_eq!(broker.open_tickets(), 0);
    }

    #[tokio::test]
    async fn unknown_tickets_error() {
        let broker = PaperBroker::new();
        assert!(matches!(
            broker.modify_stop("nope", 1.0).await.unwrap_err(),
            BrokerError::UnknownTicket(_)
        ));
        assert!(matches!(
            broker.close_position("nope", 1.0).await.unwrap_err(),
            BrokerError::UnknownTicket(_)
        ));
    }
}
