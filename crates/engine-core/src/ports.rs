use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PortResult;
use crate::types::{
    AccountState, Bar, Direction, Position, PositionTag, Tick, Timeframe,
};

// ---------------------------------------------------------------------------
// Broker port
// ---------------------------------------------------------------------------

/// One order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub direction: Direction,
    pub volume: f64,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub tag: PositionTag,
    pub comment: String,
}

/// Tagged acknowledgment for submit/modify/close calls. Connectivity faults
/// surface as `PortError::Unavailable` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderOutcome {
    Accepted { ticket: u64 },
    Rejected { reason: String },
}

impl OrderOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, OrderOutcome::Accepted { .. })
    }
}

/// Abstract broker connectivity. Implemented outside the core (live binding)
/// and by `sim-broker` for paper mode and tests.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Most recent `count` bars for the symbol, oldest first.
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> PortResult<Vec<Bar>>;

    /// Current best bid/ask.
    async fn get_tick(&self, symbol: &str) -> PortResult<Tick>;

    /// Account snapshot (balance, equity, free margin, open profit).
    async fn get_account(&self) -> PortResult<AccountState>;

    /// Open positions, optionally filtered by symbol.
    async fn get_open_positions(&self, symbol: Option<&str>) -> PortResult<Vec<Position>>;

    /// Submit a market order with attached SL/TP.
    async fn submit_order(&self, request: &OrderRequest) -> PortResult<OrderOutcome>;

    /// Adjust SL and/or TP of an open position.
    async fn modify_position(
        &self,
        ticket: u64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> PortResult<OrderOutcome>;

    /// Close an open position at market.
    async fn close_position(&self, ticket: u64) -> PortResult<OrderOutcome>;

    /// Whether this is a paper/simulated account.
    fn is_paper(&self) -> bool;

    /// Broker name for logging.
    fn broker_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Notification port
// ---------------------------------------------------------------------------

/// Events pushed to the alerting channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradeEvent {
    Opened {
        symbol: String,
        direction: Direction,
        volume: f64,
        price: f64,
        stop_loss: f64,
        take_profit: f64,
        confidence: f64,
        tag: PositionTag,
    },
    Closed {
        symbol: String,
        ticket: u64,
        profit: f64,
        balance: f64,
        equity: f64,
    },
    Error {
        context: String,
        detail: String,
    },
}

/// Outbound alert delivery. Failures are the caller's to swallow; a lost
/// notification never fails a trading cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &TradeEvent) -> Result<()>;
}
