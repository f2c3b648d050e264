//! The decision loop body: bars in, gated and sized orders out. Every
//! failure is local to one symbol and one cycle; the loop itself never dies.

use std::sync::Arc;

use anyhow::Result;

use engine_core::{BrokerPort, EngineContext, Signal, SymbolCatalog};
use feature_engine::compute_features;
use ml_signaler::LearnedSignaler;
use risk_engine::{LotSizer, SizerConfig};
use smc_patterns::{detect_contrarian_trend, detect_premium_entry, detect_trend};

use crate::config::{AgentConfig, TrendMode};
use crate::executor::TradeExecutor;
use crate::fuser::SignalFuser;
use crate::state::Tunables;

const TREND_LOOKBACK: usize = 20;
const MIN_DECISION_BARS: usize = 30;

pub struct DecisionEngine {
    broker: Arc<dyn BrokerPort>,
    context: Arc<EngineContext>,
    catalog: Arc<SymbolCatalog>,
    config: AgentConfig,
    signaler: LearnedSignaler,
    fuser: SignalFuser,
    executor: TradeExecutor,
    tunables: Arc<Tunables>,
}

impl DecisionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        broker: Arc<dyn BrokerPort>,
        context: Arc<EngineContext>,
        catalog: Arc<SymbolCatalog>,
        config: AgentConfig,
        signaler: LearnedSignaler,
        executor: TradeExecutor,
        tunables: Arc<Tunables>,
    ) -> Self {
        Self {
            broker,
            context,
            catalog,
            config,
            signaler,
            fuser: SignalFuser::new(),
            executor,
            tunables,
        }
    }

    /// One pass over the configured symbols. Checked against the run flag at
    /// the top; a tripped circuit breaker stops new entries within one tick.
    pub async fn run_cycle(&mut self) -> Result<()> {
        if !self.context.is_running() {
            tracing::debug!("decision loop halted, skipping cycle");
            return Ok(());
        }

        self.signaler.set_floor(self.tunables.confidence_floor());

        let account = match self.broker.get_account().await {
            Ok(account) => {
                self.context.set_account(account);
                account
            }
            Err(e) => {
                tracing::warn!(error = %e, "account unavailable, skipping cycle");
                return Ok(());
            }
        };

        // Portfolio gate applies to every symbol for the rest of the cycle.
        let open = match self.broker.get_open_positions(None).await {
            Ok(open) => open,
            Err(e) => {
                tracing::warn!(error = %e, "positions unavailable, skipping cycle");
                return Ok(());
            }
        };
        let exposure = LotSizer::check_exposure(&account, &open);
        if !exposure.allowed {
            tracing::info!(
                unrealized_loss = exposure.unrealized_loss,
                reason = exposure.reason.as_deref().unwrap_or(""),
                "portfolio exposure gate closed, no new trades this cycle"
            );
            return Ok(());
        }

        let symbols = self.config.symbols.clone();
        for name in &symbols {
            if !self.context.is_running() {
                break;
            }
            if let Err(e) = self.evaluate_symbol(name, account.balance).await {
                tracing::warn!(symbol = %name, error = %e, "symbol evaluation failed");
            }
        }
        Ok(())
    }

    async fn evaluate_symbol(&mut self, name: &str, balance: f64) -> Result<()> {
        let symbol = match self.catalog.get(name) {
            Ok(symbol) => symbol.clone(),
            Err(e) => {
                tracing::warn!(symbol = %name, error = %e, "not in catalog, skipping");
                return Ok(());
            }
        };

        if self.context.tracked_count(name) >= symbol.max_positions {
            tracing::debug!(symbol = %name, "position cap reached");
            return Ok(());
        }

        let bars = match self
            .broker
            .get_bars(name, self.config.timeframe, self.config.bar_window)
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!(symbol = %name, error = %e, "bars unavailable this cycle");
                return Ok(());
            }
        };
        if bars.len() < MIN_DECISION_BARS {
            tracing::debug!(symbol = %name, bars = bars.len(), "window too short");
            return Ok(());
        }

        let features = compute_features(&bars);
        let learned = self.signaler.evaluate(&features);

        let mut pattern = detect_premium_entry(&bars);
        if !pattern.is_actionable() {
            pattern = match self.config.trend_mode {
                TrendMode::Standard => detect_trend(&bars, TREND_LOOKBACK),
                TrendMode::Contrarian => detect_contrarian_trend(&bars),
            };
        }

        let Some(decision) = self.fuser.fuse(&learned, &pattern) else {
            tracing::debug!(
                symbol = %name,
                learned_confidence = learned.confidence,
                pattern_confidence = pattern.confidence,
                "no actionable signal"
            );
            return Ok(());
        };
        let Signal {
            direction: Some(direction),
            confidence,
            source,
        } = decision
        else {
            return Ok(());
        };

        tracing::info!(
            symbol = %name,
            direction = direction.as_str(),
            confidence = format!("{confidence:.1}"),
            ?source,
            "signal selected"
        );

        let scalp = symbol.scalping.enabled && self.tunables.scalping_enabled();
        let sizer = LotSizer::new(SizerConfig {
            risk_percentage: self.tunables.risk_percentage(),
        });
        let base = if scalp {
            sizer.optimal_scalp_lot(balance, symbol.scalping.sl_pips)
        } else {
            sizer.calculate_lot_size(balance, symbol.stop_loss_pips, &symbol)
        };
        let factor = LotSizer::volatility_factor(&bars, features.atr);
        let volume =
            ((base * factor).clamp(symbol.min_lot, symbol.max_lot) * 100.0).round() / 100.0;

        self.executor
            .open_trade(&symbol, direction, confidence, volume, scalp)
            .await?;
        Ok(())
    }
}
