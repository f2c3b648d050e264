//! Position lifecycle supervision: breakeven promotion, trailing stops,
//! scalp timeouts and closure detection. Runs on its own interval and keeps
//! working while the decision loop is halted.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};

use engine_core::{
    BrokerPort, Direction, EngineContext, Notifier, OrderOutcome, Position, PositionTag,
    SymbolCatalog, TradeEvent,
};
use risk_engine::CircuitBreaker;

pub struct PositionSupervisor {
    broker: Arc<dyn BrokerPort>,
    context: Arc<EngineContext>,
    notifier: Arc<dyn Notifier>,
    breaker: CircuitBreaker,
    catalog: Arc<SymbolCatalog>,
    scalp_timeout: Duration,
}

impl PositionSupervisor {
    pub fn new(
        broker: Arc<dyn BrokerPort>,
        context: Arc<EngineContext>,
        notifier: Arc<dyn Notifier>,
        breaker: CircuitBreaker,
        catalog: Arc<SymbolCatalog>,
        scalp_timeout: Duration,
    ) -> Self {
        Self {
            broker,
            context,
            notifier,
            breaker,
            catalog,
            scalp_timeout,
        }
    }

    /// One supervisory pass: refresh the account snapshot, reconcile the
    /// tracked set against the broker, then manage each open position.
    pub async fn run_pass(&self) -> Result<()> {
        let account = match self.broker.get_account().await {
            Ok(account) => {
                self.context.set_account(account);
                account
            }
            Err(e) => {
                tracing::warn!(error = %e, "account unavailable, skipping pass");
                return Ok(());
            }
        };

        let open = match self.broker.get_open_positions(None).await {
            Ok(open) => open,
            Err(e) => {
                tracing::warn!(error = %e, "positions unavailable, skipping pass");
                return Ok(());
            }
        };

        self.reconcile_closures(&open, account.balance, account.equity)
            .await;

        for position in &open {
            if let Err(e) = self.manage(position).await {
                tracing::warn!(
                    ticket = position.ticket,
                    symbol = %position.symbol,
                    error = %e,
                    "position management failed, will retry next pass"
                );
            }
        }
        Ok(())
    }

    /// Tracked tickets the broker no longer reports have closed: finalize
    /// their profit into the daily counters and notify.
    async fn reconcile_closures(&self, open: &[Position], balance: f64, equity: f64) {
        for tracked in self.context.tracked() {
            let ticket = tracked.position.ticket;
            if open.iter().any(|p| p.ticket == ticket) {
                continue;
            }
            if self.context.untrack(ticket).is_none() {
                continue;
            }
            let profit = tracked.last_profit;
            let tripped = self.breaker.record_close(profit, balance);
            tracing::info!(
                ticket,
                symbol = %tracked.position.symbol,
                profit,
                tripped,
                "position closed"
            );
            self.notifier
                .notify(&TradeEvent::Closed {
                    symbol: tracked.position.symbol.clone(),
                    ticket,
                    profit,
                    balance,
                    equity,
                })
                .await
                .ok();
        }
    }

    async fn manage(&self, position: &Position) -> Result<()> {
        let Ok(symbol) = self.catalog.get(&position.symbol) else {
            tracing::warn!(symbol = %position.symbol, "unknown symbol, not managing");
            return Ok(());
        };

        // Positions opened outside this process still get supervised.
        if self.context.update_or_adopt(position) {
            tracing::info!(
                ticket = position.ticket,
                symbol = %position.symbol,
                "adopted externally opened position"
            );
        }

        let tick = self.broker.get_tick(&position.symbol).await?;
        let profit_pips = position.profit_pips(&tick, symbol.pip_value);

        let (sl_pips, tp_pips) = match position.tag {
            PositionTag::Scalp => (symbol.scalping.sl_pips, symbol.scalping.tp_pips),
            PositionTag::Trade => (symbol.stop_loss_pips, symbol.take_profit_pips),
        };
        let breakeven_trigger = 0.5 * tp_pips;

        if position.tag == PositionTag::Scalp
            && Utc::now() - position.open_time >= self.scalp_timeout
        {
            tracing::info!(
                ticket = position.ticket,
                symbol = %position.symbol,
                age_minutes = (Utc::now() - position.open_time).num_minutes(),
                "scalp timed out, force closing"
            );
            match self.broker.close_position(position.ticket).await? {
                OrderOutcome::Accepted { .. } => return Ok(()),
                OrderOutcome::Rejected { reason } => {
                    tracing::warn!(ticket = position.ticket, %reason, "timeout close rejected");
                    return Ok(());
                }
            }
        }

        if profit_pips >= breakeven_trigger {
            self.promote_breakeven(position).await?;
            self.trail_stop(position, &tick, sl_pips, symbol.pip_value)
                .await?;
        }
        Ok(())
    }

    /// Move the stop to entry once, no matter how often the trigger fires.
    async fn promote_breakeven(&self, position: &Position) -> Result<()> {
        let already_set = self
            .context
            .tracked()
            .iter()
            .find(|t| t.position.ticket == position.ticket)
            .map(|t| t.breakeven_set)
            .unwrap_or(false);
        if already_set {
            return Ok(());
        }

        match self
            .broker
            .modify_position(position.ticket, Some(position.entry_price), None)
            .await?
        {
            OrderOutcome::Accepted { .. } => {
                self.context.update_tracked(position.ticket, |t| {
                    t.breakeven_set = true;
                    t.position.stop_loss = position.entry_price;
                });
                tracing::info!(
                    ticket = position.ticket,
                    symbol = %position.symbol,
                    entry = position.entry_price,
                    "stop moved to breakeven"
                );
            }
            OrderOutcome::Rejected { reason } => {
                tracing::warn!(ticket = position.ticket, %reason, "breakeven modify rejected");
            }
        }
        Ok(())
    }

    /// Tighten the stop toward the current price; never loosen it.
    async fn trail_stop(
        &self,
        position: &Position,
        tick: &engine_core::Tick,
        sl_pips: f64,
        pip_value: f64,
    ) -> Result<()> {
        let current_stop = self
            .context
            .tracked()
            .iter()
            .find(|t| t.position.ticket == position.ticket)
            .map(|t| t.position.stop_loss)
            .unwrap_or(position.stop_loss);

        let candidate = match position.direction {
            Direction::Buy => tick.bid - sl_pips * pip_value,
            Direction::Sell => tick.ask + sl_pips * pip_value,
        };
        let tightens = match position.direction {
            Direction::Buy => candidate > current_stop,
            Direction::Sell => candidate < current_stop,
        };
        if !tightens {
            return Ok(());
        }

        match self
            .broker
            .modify_position(position.ticket, Some(candidate), None)
            .await?
        {
            OrderOutcome::Accepted { .. } => {
                self.context
                    .update_tracked(position.ticket, |t| t.position.stop_loss = candidate);
                tracing::debug!(
                    ticket = position.ticket,
                    stop = candidate,
                    "trailing stop tightened"
                );
            }
            OrderOutcome::Rejected { reason } => {
                tracing::warn!(ticket = position.ticket, %reason, "trailing modify rejected");
            }
        }
        Ok(())
    }
}
