//! In-memory paper broker. Fills market orders instantly at the current
//! tick, keeps positions and an account ledger, and supports fault injection
//! so execution retry and supervision paths can be tested deterministically.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use engine_core::{
    AccountState, Bar, BrokerPort, Direction, OrderOutcome, OrderRequest, PortError, PortResult,
    Position, Tick, Timeframe,
};

/// Units per 1.0 lot, used to convert a price move into account currency.
const CONTRACT_SIZE: f64 = 100_000.0;

/// What the next submit calls should do before normal fills resume.
#[derive(Debug, Clone)]
enum SubmitFault {
    Unavailable,
    Reject(String),
}

pub struct SimBroker {
    bars: DashMap<(String, Timeframe), Vec<Bar>>,
    ticks: DashMap<String, Tick>,
    positions: DashMap<u64, Position>,
    balance: Mutex<f64>,
    next_ticket: AtomicU64,
    submit_faults: Mutex<Vec<SubmitFault>>,
    submit_attempts: AtomicUsize,
    modify_calls: AtomicUsize,
}

impl SimBroker {
    pub fn new(balance: f64) -> Self {
        Self {
            bars: DashMap::new(),
            ticks: DashMap::new(),
            positions: DashMap::new(),
            balance: Mutex::new(balance),
            next_ticket: AtomicU64::new(1),
            submit_faults: Mutex::new(Vec::new()),
            submit_attempts: AtomicUsize::new(0),
            modify_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_bars(&self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.bars.insert((symbol.to_string(), timeframe), bars);
    }

    pub fn set_tick(&self, symbol: &str, tick: Tick) {
        self.ticks.insert(symbol.to_string(), tick);
    }

    /// Queue transport failures for upcoming submit calls.
    pub fn fail_next_submits(&self, count: usize) {
        let mut faults = self.faults();
        for _ in 0..count {
            faults.push(SubmitFault::Unavailable);
        }
    }

    /// Queue a broker-side rejection for the next submit call.
    pub fn reject_next_submit(&self, reason: &str) {
        self.faults().push(SubmitFault::Reject(reason.to_string()));
    }

    pub fn submit_attempts(&self) -> usize {
        self.submit_attempts.load(Ordering::SeqCst)
    }

    pub fn modify_calls(&self) -> usize {
        self.modify_calls.load(Ordering::SeqCst)
    }

    pub fn balance(&self) -> f64 {
        *self.balance.lock().expect("balance lock poisoned")
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Vec<SubmitFault>> {
        self.submit_faults.lock().expect("fault queue lock poisoned")
    }

    fn tick_for(&self, symbol: &str) -> PortResult<Tick> {
        self.ticks
            .get(symbol)
            .map(|t| *t)
            .ok_or_else(|| PortError::Unavailable(format!("no tick for {symbol}")))
    }

    /// Closable price and signed profit for a position at the current tick.
    fn mark(&self, position: &Position) -> PortResult<f64> {
        let tick = self.tick_for(&position.symbol)?;
        let close_price = match position.direction {
            Direction::Buy => tick.bid,
            Direction::Sell => tick.ask,
        };
        let diff = match position.direction {
            Direction::Buy => close_price - position.entry_price,
            Direction::Sell => position.entry_price - close_price,
        };
        Ok(diff * position.volume * CONTRACT_SIZE)
    }

    fn open_profit(&self) -> f64 {
        self.positions
            .iter()
            .filter_map(|p| self.mark(&p).ok())
            .sum()
    }
}

#[async_trait]
impl BrokerPort for SimBroker {
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> PortResult<Vec<Bar>> {
        let bars = self
            .bars
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| PortError::Unavailable(format!("no bar feed for {symbol}")))?;
        let start = bars.len().saturating_sub(count);
        Ok(bars[start..].to_vec())
    }

    async fn get_tick(&self, symbol: &str) -> PortResult<Tick> {
        self.tick_for(symbol)
    }

    async fn get_account(&self) -> PortResult<AccountState> {
        let balance = self.balance();
        let open_profit = self.open_profit();
        Ok(AccountState {
            balance,
            equity: balance + open_profit,
            free_margin: balance + open_profit,
            open_profit,
        })
    }

    async fn get_open_positions(&self, symbol: Option<&str>) -> PortResult<Vec<Position>> {
        let mut out = Vec::new();
        for entry in self.positions.iter() {
            if symbol.is_some_and(|s| s != entry.symbol) {
                continue;
            }
            let mut position = entry.value().clone();
            position.profit = self.mark(&position)?;
            out.push(position);
        }
        out.sort_by_key(|p| p.ticket);
        Ok(out)
    }

    async fn submit_order(&self, request: &OrderRequest) -> PortResult<OrderOutcome> {
        self.submit_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(fault) = {
            let mut faults = self.faults();
            if faults.is_empty() {
                None
            } else {
                Some(faults.remove(0))
            }
        } {
            match fault {
                SubmitFault::Unavailable => {
                    return Err(PortError::Unavailable("simulated transport fault".into()))
                }
                SubmitFault::Reject(reason) => return Ok(OrderOutcome::Rejected { reason }),
            }
        }

        if request.volume <= 0.0 {
            return Ok(OrderOutcome::Rejected {
                reason: "volume must be positive".into(),
            });
        }

        let tick = self.tick_for(&request.symbol)?;
        let fill_price = match request.direction {
            Direction::Buy => tick.ask,
            Direction::Sell => tick.bid,
        };

        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let position = Position {
            ticket,
            symbol: request.symbol.clone(),
            direction: request.direction,
            volume: request.volume,
            entry_price: fill_price,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            open_time: chrono::Utc::now(),
            tag: request.tag,
            profit: 0.0,
        };
        tracing::debug!(
            ticket,
            symbol = %request.symbol,
            direction = request.direction.as_str(),
            volume = request.volume,
            price = fill_price,
            "paper order filled"
        );
        self.positions.insert(ticket, position);
        Ok(OrderOutcome::Accepted { ticket })
    }

    async fn modify_position(
        &self,
        ticket: u64,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> PortResult<OrderOutcome> {
        self.modify_calls.fetch_add(1, Ordering::SeqCst);
        match self.positions.get_mut(&ticket) {
            Some(mut position) => {
                if let Some(sl) = stop_loss {
                    position.stop_loss = sl;
                }
                if let Some(tp) = take_profit {
                    position.take_profit = tp;
                }
                Ok(OrderOutcome::Accepted { ticket })
            }
            None => Ok(OrderOutcome::Rejected {
                reason: format!("unknown ticket {ticket}"),
            }),
        }
    }

    async fn close_position(&self, ticket: u64) -> PortResult<OrderOutcome> {
        let Some((_, position)) = self.positions.remove(&ticket) else {
            return Ok(OrderOutcome::Rejected {
                reason: format!("unknown ticket {ticket}"),
            });
        };
        let profit = self.mark(&position)?;
        {
            let mut balance = self.balance.lock().expect("balance lock poisoned");
            *balance += profit;
        }
        tracing::debug!(ticket, profit, "paper position closed");
        Ok(OrderOutcome::Accepted { ticket })
    }

    fn is_paper(&self) -> bool {
        true
    }

    fn broker_name(&self) -> &str {
        "sim"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine_core::PositionTag;

    fn broker_with_tick(bid: f64, ask: f64) -> SimBroker {
        let broker = SimBroker::new(1000.0);
        broker.set_tick("EURUSD", Tick { bid, ask });
        broker
    }

    fn buy_request(volume: f64) -> OrderRequest {
        OrderRequest {
            symbol: "EURUSD".into(),
            direction: Direction::Buy,
            volume,
            price: 1.1001,
            stop_loss: 1.0989,
            take_profit: 1.1009,
            tag: PositionTag::Scalp,
            comment: "test".into(),
        }
    }

    #[tokio::test]
    async fn buy_fills_at_ask_and_tracks_position() {
        let broker = broker_with_tick(1.1000, 1.1001);
        let outcome = broker.submit_order(&buy_request(0.1)).await.unwrap();
        let OrderOutcome::Accepted { ticket } = outcome else {
            panic!("expected fill");
        };

        let open = broker.get_open_positions(Some("EURUSD")).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].ticket, ticket);
        assert!((open[0].entry_price - 1.1001).abs() < 1e-9);
    }

    #[tokio::test]
    async fn close_realizes_profit_into_balance() {
        let broker = broker_with_tick(1.1000, 1.1001);
        let outcome = broker.submit_order(&buy_request(0.1)).await.unwrap();
        let OrderOutcome::Accepted { ticket } = outcome else {
            panic!("expected fill");
        };

        // price moves 10 pips in favor: 0.0010 * 0.1 * 100000 = 10.00
        broker.set_tick("EURUSD", Tick { bid: 1.1011, ask: 1.1012 });
        broker.close_position(ticket).await.unwrap();

        assert!((broker.balance() - 1010.0).abs() < 1e-6);
        assert!(broker
            .get_open_positions(None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn injected_faults_surface_then_clear() {
        let broker = broker_with_tick(1.1000, 1.1001);
        broker.fail_next_submits(2);

        assert!(broker.submit_order(&buy_request(0.1)).await.is_err());
        assert!(broker.submit_order(&buy_request(0.1)).await.is_err());
        assert!(broker
            .submit_order(&buy_request(0.1))
            .await
            .unwrap()
            .is_accepted());
        assert_eq!(broker.submit_attempts(), 3);
    }

    #[tokio::test]
    async fn rejection_is_an_outcome_not_an_error() {
        let broker = broker_with_tick(1.1000, 1.1001);
        broker.reject_next_submit("not enough money");
        let outcome = broker.submit_order(&buy_request(0.1)).await.unwrap();
        assert!(!outcome.is_accepted());
    }

    #[tokio::test]
    async fn modify_updates_stops_in_place() {
        let broker = broker_with_tick(1.1000, 1.1001);
        let OrderOutcome::Accepted { ticket } =
            broker.submit_order(&buy_request(0.1)).await.unwrap()
        else {
            panic!("expected fill");
        };

        broker
            .modify_position(ticket, Some(1.1001), None)
            .await
            .unwrap();
        let open = broker.get_open_positions(None).await.unwrap();
        assert!((open[0].stop_loss - 1.1001).abs() < 1e-9);
        assert!((open[0].take_profit - 1.1009).abs() < 1e-9);
    }

    #[tokio::test]
    async fn get_bars_returns_most_recent_window() {
        let broker = SimBroker::new(1000.0);
        let bars: Vec<Bar> = (0..30)
            .map(|i| Bar {
                open_time: Utc::now(),
                open: 1.0,
                high: 1.01,
                low: 0.99,
                close: 1.0 + i as f64 * 0.001,
                tick_volume: 100.0,
            })
            .collect();
        broker.set_bars("EURUSD", Timeframe::M5, bars);

        let window = broker.get_bars("EURUSD", Timeframe::M5, 10).await.unwrap();
        assert_eq!(window.len(), 10);
        assert!((window[9].close - (1.0 + 29.0 * 0.001)).abs() < 1e-9);
    }
}
