//! Order placement with bounded retry. Pre-trade spread and margin checks
//! live here; portfolio-level gates run earlier in the decision cycle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;

use engine_core::{
    BrokerPort, Direction, EngineContext, Notifier, OrderOutcome, OrderRequest, Position,
    PositionTag, SymbolConfig, TradeEvent,
};

const MAX_SUBMIT_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

pub struct TradeExecutor {
    broker: Arc<dyn BrokerPort>,
    context: Arc<EngineContext>,
    notifier: Arc<dyn Notifier>,
}

impl TradeExecutor {
    pub fn new(
        broker: Arc<dyn BrokerPort>,
        context: Arc<EngineContext>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            broker,
            context,
            notifier,
        }
    }

    /// Open a position. Returns the ticket on success, `None` when a
    /// pre-check declined the trade or every submit attempt failed. Neither
    /// outcome is fatal to the decision loop.
    pub async fn open_trade(
        &self,
        symbol: &SymbolConfig,
        direction: Direction,
        confidence: f64,
        volume: f64,
        scalp: bool,
    ) -> Result<Option<u64>> {
        let tick = match self.broker.get_tick(&symbol.name).await {
            Ok(tick) => tick,
            Err(e) => {
                tracing::warn!(symbol = %symbol.name, error = %e, "tick unavailable, skipping");
                return Ok(None);
            }
        };

        let max_spread = if scalp {
            symbol.scalping.max_spread
        } else {
            symbol.max_spread
        };
        let spread = tick.spread_pips(symbol.pip_value);
        if spread > max_spread {
            tracing::info!(
                symbol = %symbol.name,
                spread = format!("{spread:.2}"),
                max_spread,
                "spread too wide, no trade"
            );
            return Ok(None);
        }

        if scalp {
            if let Some(account) = self.context.account() {
                if account.free_margin < symbol.scalping.min_margin_required {
                    tracing::info!(
                        symbol = %symbol.name,
                        free_margin = account.free_margin,
                        required = symbol.scalping.min_margin_required,
                        "insufficient free margin for scalp, no trade"
                    );
                    return Ok(None);
                }
            }
        }

        let (sl_pips, tp_pips, tag) = if scalp {
            (
                symbol.scalping.sl_pips,
                symbol.scalping.tp_pips,
                PositionTag::Scalp,
            )
        } else {
            let rr = symbol.risk_reward_for(confidence);
            (
                symbol.stop_loss_pips,
                symbol.stop_loss_pips * rr,
                PositionTag::Trade,
            )
        };

        let pip = symbol.pip_value;
        let (price, stop_loss, take_profit) = match direction {
            Direction::Buy => (
                tick.ask,
                tick.ask - sl_pips * pip,
                tick.ask + tp_pips * pip,
            ),
            Direction::Sell => (
                tick.bid,
                tick.bid + sl_pips * pip,
                tick.bid - tp_pips * pip,
            ),
        };

        let request = OrderRequest {
            symbol: symbol.name.clone(),
            direction,
            volume,
            price,
            stop_loss,
            take_profit,
            tag,
            comment: format!("scalper {:.0}%", confidence),
        };

        let mut last_failure = String::new();
        for attempt in 1..=MAX_SUBMIT_ATTEMPTS {
            match self.broker.submit_order(&request).await {
                Ok(OrderOutcome::Accepted { ticket }) => {
                    tracing::info!(
                        symbol = %symbol.name,
                        direction = direction.as_str(),
                        ticket,
                        volume,
                        attempt,
                        "order accepted"
                    );
                    self.context.track(Position {
                        ticket,
                        symbol: symbol.name.clone(),
                        direction,
                        volume,
                        entry_price: price,
                        stop_loss,
                        take_profit,
                        open_time: Utc::now(),
                        tag,
                        profit: 0.0,
                    });
                    self.notifier
                        .notify(&TradeEvent::Opened {
                            symbol: symbol.name.clone(),
                            direction,
                            volume,
                            price,
                            stop_loss,
                            take_profit,
                            confidence,
                            tag,
                        })
                        .await
                        .ok();
                    return Ok(Some(ticket));
                }
                Ok(OrderOutcome::Rejected { reason }) => {
                    tracing::warn!(
                        symbol = %symbol.name,
                        attempt,
                        %reason,
                        "order rejected"
                    );
                    last_failure = reason;
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol.name, attempt, error = %e, "submit failed");
                    last_failure = e.to_string();
                }
            }
            if attempt < MAX_SUBMIT_ATTEMPTS {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        tracing::error!(
            symbol = %symbol.name,
            attempts = MAX_SUBMIT_ATTEMPTS,
            "trade abandoned after exhausting submit attempts"
        );
        self.notifier
            .notify(&TradeEvent::Error {
                context: format!("open {}", symbol.name),
                detail: last_failure,
            })
            .await
            .ok();
        Ok(None)
    }

    /// Close a position. Single attempt; a failure is logged and the
    /// position stays tracked for the next supervisory pass.
    pub async fn close_trade(&self, ticket: u64) -> Result<bool> {
        match self.broker.close_position(ticket).await {
            Ok(OrderOutcome::Accepted { .. }) => Ok(true),
            Ok(OrderOutcome::Rejected { reason }) => {
                tracing::warn!(ticket, %reason, "close rejected");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(ticket, error = %e, "close failed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::TracingNotifier;
    use engine_core::{SymbolCatalog, Tick};
    use sim_broker::SimBroker;

    fn eurusd() -> SymbolConfig {
        SymbolCatalog::builtin().get("EURUSD").unwrap().clone()
    }

    fn setup(bid: f64, ask: f64) -> (Arc<SimBroker>, TradeExecutor, Arc<EngineContext>) {
        let broker = Arc::new(SimBroker::new(1000.0));
        broker.set_tick("EURUSD", Tick { bid, ask });
        let context = Arc::new(EngineContext::new());
        let executor = TradeExecutor::new(
            broker.clone(),
            context.clone(),
            Arc::new(TracingNotifier),
        );
        (broker, executor, context)
    }

    #[tokio::test]
    async fn accepted_order_is_tracked() {
        let (_, executor, context) = setup(1.1000, 1.1001);
        let ticket = executor
            .open_trade(&eurusd(), Direction::Buy, 75.0, 0.05, true)
            .await
            .unwrap();
        assert!(ticket.is_some());
        assert_eq!(context.tracked_count("EURUSD"), 1);
    }

    #[tokio::test]
    async fn scalp_stops_use_scalping_pips() {
        let (broker, executor, _) = setup(1.1000, 1.1001);
        executor
            .open_trade(&eurusd(), Direction::Buy, 75.0, 0.05, true)
            .await
            .unwrap();
        let open = broker.get_open_positions(None).await.unwrap();
        // scalping profile: sl 12 pips, tp 8 pips from the ask
        assert!((open[0].stop_loss - (1.1001 - 0.0012)).abs() < 1e-9);
        assert!((open[0].take_profit - (1.1001 + 0.0008)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn standard_trade_scales_tp_by_risk_reward() {
        let (broker, executor, _) = setup(1.1000, 1.1001);
        // confidence 85 -> high tier rr 3.0 -> tp = 10 * 3 = 30 pips
        executor
            .open_trade(&eurusd(), Direction::Sell, 85.0, 0.05, false)
            .await
            .unwrap();
        let open = broker.get_open_positions(None).await.unwrap();
        assert!((open[0].stop_loss - (1.1000 + 0.0010)).abs() < 1e-9);
        assert!((open[0].take_profit - (1.1000 - 0.0030)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn submit_attempts_are_bounded_at_three() {
        let (broker, executor, context) = setup(1.1000, 1.1001);
        broker.fail_next_submits(5);
        let ticket = executor
            .open_trade(&eurusd(), Direction::Buy, 75.0, 0.05, true)
            .await
            .unwrap();
        assert!(ticket.is_none());
        assert_eq!(broker.submit_attempts(), 3);
        assert_eq!(context.tracked_count("EURUSD"), 0);
    }

    #[tokio::test]
    async fn transient_fault_recovers_within_budget() {
        let (broker, executor, _) = setup(1.1000, 1.1001);
        broker.fail_next_submits(2);
        let ticket = executor
            .open_trade(&eurusd(), Direction::Buy, 75.0, 0.05, true)
            .await
            .unwrap();
        assert!(ticket.is_some());
        assert_eq!(broker.submit_attempts(), 3);
    }

    #[tokio::test]
    async fn wide_spread_declines_without_submitting() {
        // 5 pips of spread against a 1.5 pip scalping cap
        let (broker, executor, _) = setup(1.1000, 1.1005);
        let ticket = executor
            .open_trade(&eurusd(), Direction::Buy, 75.0, 0.05, true)
            .await
            .unwrap();
        assert!(ticket.is_none());
        assert_eq!(broker.submit_attempts(), 0);
    }

    #[tokio::test]
    async fn low_margin_declines_scalp() {
        let (broker, executor, context) = setup(1.1000, 1.1001);
        context.set_account(engine_core::AccountState {
            balance: 40.0,
            equity: 40.0,
            free_margin: 40.0,
            open_profit: 0.0,
        });
        let ticket = executor
            .open_trade(&eurusd(), Direction::Buy, 75.0, 0.01, true)
            .await
            .unwrap();
        assert!(ticket.is_none());
        assert_eq!(broker.submit_attempts(), 0);
    }
}
