//! Position sizing. Lot volume is derived from the account balance and the
//! stop distance, then adjusted for recent volatility and clamped to the
//! symbol's volume limits.

use serde::{Deserialize, Serialize};

use engine_core::{AccountState, Bar, Position, SymbolConfig};

/// Unrealized portfolio loss beyond this share of balance blocks new entries.
pub const MAX_PORTFOLIO_LOSS_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizerConfig {
    /// Percent of balance risked per trade.
    pub risk_percentage: f64,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            risk_percentage: 1.0,
        }
    }
}

/// Outcome of the portfolio exposure gate, with the reason when blocked.
#[derive(Debug, Clone)]
pub struct ExposureCheck {
    pub allowed: bool,
    pub unrealized_loss: f64,
    pub reason: Option<String>,
}

impl ExposureCheck {
    fn allowed(unrealized_loss: f64) -> Self {
        Self {
            allowed: true,
            unrealized_loss,
            reason: None,
        }
    }

    fn blocked(unrealized_loss: f64, reason: String) -> Self {
        Self {
            allowed: false,
            unrealized_loss,
            reason: Some(reason),
        }
    }
}

pub struct LotSizer {
    config: SizerConfig,
}

impl LotSizer {
    pub fn new(config: SizerConfig) -> Self {
        Self { config }
    }

    pub fn risk_percentage(&self) -> f64 {
        self.config.risk_percentage
    }

    pub fn set_risk_percentage(&mut self, risk_percentage: f64) {
        self.config.risk_percentage = risk_percentage;
    }

    /// Risk-proportional lot volume for a standard entry.
    ///
    /// Sizes so that `sl_pips` against the position loses the configured
    /// percent of balance, assuming $10 per pip per standard lot, then clamps
    /// to the symbol's volume limits.
    pub fn calculate_lot_size(&self, balance: f64, sl_pips: f64, symbol: &SymbolConfig) -> f64 {
        let risk_amount = balance * (self.config.risk_percentage / 100.0);
        let pip_value_per_lot = 10.0;
        let raw = if sl_pips > 0.0 {
            risk_amount / (sl_pips * pip_value_per_lot)
        } else {
            symbol.min_lot
        };
        raw.clamp(symbol.min_lot, symbol.max_lot)
    }

    /// Conservative volume for scalp entries on small accounts.
    ///
    /// Small balances get fixed micro volumes; larger accounts take half the
    /// 1%-risk volume, capped at half a lot.
    pub fn optimal_scalp_lot(&self, balance: f64, sl_pips: f64) -> f64 {
        if balance < 100.0 {
            0.01
        } else if balance < 500.0 {
            0.02
        } else if balance < 1000.0 {
            0.05
        } else {
            let risk_amount = balance * 0.01;
            let raw = if sl_pips > 0.0 {
                risk_amount / (sl_pips * 10.0)
            } else {
                0.01
            };
            (raw * 0.5).clamp(0.01, 0.5)
        }
    }

    /// Scale factor in [0.5, 1.5] that shrinks volume when current volatility
    /// exceeds the reference (0.1% of mean bar high) and grows it when calm.
    pub fn volatility_factor(bars: &[Bar], atr: f64) -> f64 {
        if bars.is_empty() || atr <= 0.0 {
            return 1.0;
        }
        let mean_high = bars.iter().map(|b| b.high).sum::<f64>() / bars.len() as f64;
        let reference_atr = mean_high * 0.001;
        (reference_atr / atr).clamp(0.5, 1.5)
    }

    /// Gate on total unrealized loss across open positions: once losses reach
    /// 5% of balance, no new positions are opened.
    pub fn check_exposure(account: &AccountState, positions: &[Position]) -> ExposureCheck {
        let unrealized_loss: f64 = positions
            .iter()
            .map(|p| p.profit)
            .filter(|p| *p < 0.0)
            .sum::<f64>()
            .abs();

        let limit = account.balance * (MAX_PORTFOLIO_LOSS_PERCENT / 100.0);
        if unrealized_loss >= limit && limit > 0.0 {
            return ExposureCheck::blocked(
                unrealized_loss,
                format!(
                    "unrealized loss {:.2} at or above {:.1}% of balance",
                    unrealized_loss, MAX_PORTFOLIO_LOSS_PERCENT
                ),
            );
        }
        ExposureCheck::allowed(unrealized_loss)
    }
}
