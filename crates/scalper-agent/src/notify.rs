use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use engine_core::{Notifier, TradeEvent};

/// Log-only notifier, used in tests and when no webhook is configured.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: &TradeEvent) -> Result<()> {
        match event {
            TradeEvent::Opened {
                symbol,
                direction,
                volume,
                price,
                confidence,
                ..
            } => {
                tracing::info!(
                    %symbol,
                    direction = direction.as_str(),
                    volume,
                    price,
                    confidence,
                    "trade opened"
                );
            }
            TradeEvent::Closed {
                symbol,
                ticket,
                profit,
                balance,
                ..
            } => {
                tracing::info!(%symbol, ticket, profit, balance, "trade closed");
            }
            TradeEvent::Error { context, detail } => {
                tracing::warn!(%context, %detail, "trade error");
            }
        }
        Ok(())
    }
}

/// Pushes trade events to a Telegram-compatible webhook. With no URL
/// configured every call is a logged no-op, so a missing webhook can never
/// fail a trading cycle.
pub struct TelegramNotifier {
    client: Client,
    webhook_url: String,
}

impl TelegramNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }

    fn render(event: &TradeEvent) -> String {
        match event {
            TradeEvent::Opened {
                symbol,
                direction,
                volume,
                price,
                stop_loss,
                take_profit,
                confidence,
                tag,
            } => format!(
                "{} {} {:.2} lots @ {:.5} [{:?}]\nSL {:.5} | TP {:.5} | confidence {:.0}%",
                direction.as_str(),
                symbol,
                volume,
                price,
                tag,
                stop_loss,
                take_profit,
                confidence
            ),
            TradeEvent::Closed {
                symbol,
                ticket,
                profit,
                balance,
                equity,
            } => format!(
                "CLOSED {symbol} #{ticket}\nP/L {profit:+.2} | balance {balance:.2} | equity {equity:.2}"
            ),
            TradeEvent::Error { context, detail } => {
                format!("ERROR in {context}: {detail}")
            }
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: &TradeEvent) -> Result<()> {
        if self.webhook_url.is_empty() {
            tracing::debug!("telegram webhook not configured, skipping notification");
            return Ok(());
        }

        let payload = json!({ "text": Self::render(event) });
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!("telegram notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{Direction, PositionTag};

    #[test]
    fn opened_message_carries_levels() {
        let message = TelegramNotifier::render(&TradeEvent::Opened {
            symbol: "EURUSD".into(),
            direction: Direction::Buy,
            volume: 0.05,
            price: 1.10010,
            stop_loss: 1.09890,
            take_profit: 1.10090,
            confidence: 72.0,
            tag: PositionTag::Scalp,
        });
        assert!(message.contains("BUY EURUSD"));
        assert!(message.contains("1.09890"));
        assert!(message.contains("72%"));
    }

    #[tokio::test]
    async fn missing_webhook_is_a_noop() {
        let notifier = TelegramNotifier::new(String::new());
        let event = TradeEvent::Error {
            context: "test".into(),
            detail: "noop".into(),
        };
        assert!(notifier.notify(&event).await.is_ok());
    }
}
