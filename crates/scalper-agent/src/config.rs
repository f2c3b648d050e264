use std::env;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use engine_core::Timeframe;

/// Which trend detector feeds the pattern side of signal fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendMode {
    /// SMA-deviation detector, conventional direction.
    Standard,
    /// Reversed 3-candle detector (fades the move).
    Contrarian,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    // Instruments and timeframe
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub bar_window: usize,

    // Risk parameters
    pub risk_percentage: f64,
    pub max_daily_loss_percent: f64,

    // Signal parameters
    pub confidence_floor: f64,
    pub trend_mode: TrendMode,

    // Loop intervals
    pub decision_interval_seconds: u64,
    pub supervise_interval_seconds: u64,

    // Scalp lifecycle
    pub scalp_timeout_minutes: i64,

    // Notifications
    pub telegram_webhook_url: String,

    // Symbol catalog override (JSON file path, optional)
    pub symbol_catalog_path: Option<String>,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        let symbols: Vec<String> = env::var("SYMBOLS")
            .unwrap_or_else(|_| "EURUSD,GBPUSD,USDJPY,USDCAD".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let timeframe = match env::var("TIMEFRAME")
            .unwrap_or_else(|_| "M5".to_string())
            .to_uppercase()
            .as_str()
        {
            "M5" => Timeframe::M5,
            "M30" => Timeframe::M30,
            "H1" => Timeframe::H1,
            "H4" => Timeframe::H4,
            other => bail!("unsupported TIMEFRAME: {other}"),
        };

        let trend_mode = match env::var("TREND_MODE")
            .unwrap_or_else(|_| "standard".to_string())
            .to_lowercase()
            .as_str()
        {
            "standard" => TrendMode::Standard,
            "contrarian" => TrendMode::Contrarian,
            other => bail!("unsupported TREND_MODE: {other} (standard|contrarian)"),
        };

        let config = Self {
            symbols,
            timeframe,
            bar_window: env::var("BAR_WINDOW")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            risk_percentage: env::var("RISK_PERCENTAGE")
                .unwrap_or_else(|_| "1.0".to_string())
                .parse()?,
            max_daily_loss_percent: env::var("MAX_DAILY_LOSS_PERCENT")
                .unwrap_or_else(|_| "5.0".to_string())
                .parse()?,
            confidence_floor: env::var("CONFIDENCE_FLOOR")
                .unwrap_or_else(|_| "30.0".to_string())
                .parse()?,
            trend_mode,
            decision_interval_seconds: env::var("DECISION_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            supervise_interval_seconds: env::var("SUPERVISE_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,
            scalp_timeout_minutes: env::var("SCALP_TIMEOUT_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            telegram_webhook_url: env::var("TELEGRAM_WEBHOOK_URL").unwrap_or_default(),
            symbol_catalog_path: env::var("SYMBOL_CATALOG_PATH").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            bail!("SYMBOLS must name at least one instrument");
        }
        if !(0.0..=100.0).contains(&self.risk_percentage) || self.risk_percentage <= 0.0 {
            bail!(
                "RISK_PERCENTAGE must be in (0, 100], got {}",
                self.risk_percentage
            );
        }
        if self.max_daily_loss_percent <= 0.0 || self.max_daily_loss_percent > 100.0 {
            bail!(
                "MAX_DAILY_LOSS_PERCENT must be in (0, 100], got {}",
                self.max_daily_loss_percent
            );
        }
        if !(0.0..=100.0).contains(&self.confidence_floor) {
            bail!(
                "CONFIDENCE_FLOOR must be in [0, 100], got {}",
                self.confidence_floor
            );
        }
        if self.bar_window < 30 {
            bail!("BAR_WINDOW must be at least 30, got {}", self.bar_window);
        }
        if self.decision_interval_seconds == 0 || self.supervise_interval_seconds == 0 {
            bail!("loop intervals must be nonzero");
        }
        if self.scalp_timeout_minutes <= 0 {
            bail!(
                "SCALP_TIMEOUT_MINUTES must be positive, got {}",
                self.scalp_timeout_minutes
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AgentConfig {
        AgentConfig {
            symbols: vec!["EURUSD".into()],
            timeframe: Timeframe::M5,
            bar_window: 100,
            risk_percentage: 1.0,
            max_daily_loss_percent: 5.0,
            confidence_floor: 30.0,
            trend_mode: TrendMode::Standard,
            decision_interval_seconds: 5,
            supervise_interval_seconds: 2,
            scalp_timeout_minutes: 30,
            telegram_webhook_url: String::new(),
            symbol_catalog_path: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn zero_risk_is_rejected() {
        let mut config = base();
        config.risk_percentage = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn short_bar_window_is_rejected() {
        let mut config = base();
        config.bar_window = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_symbol_list_is_rejected() {
        let mut config = base();
        config.symbols.clear();
        assert!(config.validate().is_err());
    }
}
