use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Risk/reward multipliers keyed by signal confidence band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskRewardTiers {
    /// Confidence > 80%.
    pub high: f64,
    /// Confidence 50-80%.
    pub medium: f64,
    /// Confidence < 50%.
    pub low: f64,
}

/// Short-horizon trade parameters for a symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalpingConfig {
    pub enabled: bool,
    pub sl_pips: f64,
    pub tp_pips: f64,
    pub max_spread: f64,
    pub min_margin_required: f64,
    pub target_profit: f64,
}

/// Static per-instrument trading parameters. Loaded once at startup and never
/// mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub name: String,
    pub pip_value: f64,
    pub min_lot: f64,
    pub max_lot: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    pub risk_reward: RiskRewardTiers,
    pub max_spread: f64,
    pub scalping: ScalpingConfig,
    pub max_positions: usize,
}

impl SymbolConfig {
    /// Risk/reward multiplier for a given confidence score.
    pub fn risk_reward_for(&self, confidence: f64) -> f64 {
        if confidence > 80.0 {
            self.risk_reward.high
        } else if confidence >= 50.0 {
            self.risk_reward.medium
        } else {
            self.risk_reward.low
        }
    }
}

/// Immutable catalog of tradable instruments, keyed by symbol name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolCatalog {
    symbols: HashMap<String, SymbolConfig>,
}

impl SymbolCatalog {
    pub fn new(configs: Vec<SymbolConfig>) -> Self {
        Self {
            symbols: configs.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    /// Parse a catalog from a JSON array of symbol configs.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let configs: Vec<SymbolConfig> = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(format!("symbol catalog: {e}")))?;
        if configs.is_empty() {
            return Err(EngineError::InvalidConfig(
                "symbol catalog is empty".to_string(),
            ));
        }
        Ok(Self::new(configs))
    }

    pub fn get(&self, symbol: &str) -> Result<&SymbolConfig, EngineError> {
        self.symbols
            .get(symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.to_string()))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The four FX majors with their standard scalping parameters.
    pub fn builtin() -> Self {
        let scalping = ScalpingConfig {
            enabled: true,
            sl_pips: 12.0,
            tp_pips: 8.0,
            max_spread: 1.5,
            min_margin_required: 50.0,
            target_profit: 1.0,
        };

        let make = |name: &str, pip_value: f64, tiers: RiskRewardTiers| SymbolConfig {
            name: name.to_string(),
            pip_value,
            min_lot: 0.01,
            max_lot: 1.0,
            stop_loss_pips: 10.0,
            take_profit_pips: 20.0,
            risk_reward: tiers,
            max_spread: 3.0,
            scalping,
            max_positions: 3,
        };

        Self::new(vec![
            make(
                "EURUSD",
                0.0001,
                RiskRewardTiers {
                    high: 3.0,
                    medium: 2.0,
                    low: 1.5,
                },
            ),
            make(
                "GBPUSD",
                0.0001,
                RiskRewardTiers {
                    high: 4.0,
                    medium: 2.5,
                    low: 1.5,
                },
            ),
            make(
                "USDJPY",
                0.01,
                RiskRewardTiers {
                    high: 3.0,
                    medium: 2.0,
                    low: 1.5,
                },
            ),
            make(
                "USDCAD",
                0.0001,
                RiskRewardTiers {
                    high: 5.0,
                    medium: 3.0,
                    low: 2.0,
                },
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_majors() {
        let catalog = SymbolCatalog::builtin();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.contains("EURUSD"));
        assert!(catalog.contains("USDJPY"));
        assert_eq!(catalog.get("USDJPY").unwrap().pip_value, 0.01);
        assert!(catalog.get("XAUUSD").is_err());
    }

    #[test]
    fn risk_reward_tier_selection() {
        let catalog = SymbolCatalog::builtin();
        let cfg = catalog.get("EURUSD").unwrap();
        assert_eq!(cfg.risk_reward_for(90.0), 3.0);
        assert_eq!(cfg.risk_reward_for(65.0), 2.0);
        assert_eq!(cfg.risk_reward_for(40.0), 1.5);
    }

    #[test]
    fn catalog_round_trips_through_json() {
        let catalog = SymbolCatalog::builtin();
        let json = serde_json::to_string(
            &catalog
                .names()
                .iter()
                .map(|n| catalog.get(n).unwrap().clone())
                .collect::<Vec<_>>(),
        )
        .unwrap();
        let parsed = SymbolCatalog::from_json(&json).unwrap();
        assert_eq!(parsed.len(), catalog.len());
    }

    #[test]
    fn empty_catalog_rejected() {
        assert!(SymbolCatalog::from_json("[]").is_err());
    }
}
