use swap_models::{
    constants::tokens::Token,
    models::zero_x::{PriceResponse, QuoteResponse},
    uint::U256,
};

use crate::utils::number_conversion::parse_units;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPhase {
    Idle,
    Pricing,
    Priced,
    Approving,
    Quoting,
    Reviewed,
    Submitting,
    Confirming,
    Confirmed,
    Error,
}

impl SwapPhase {
    /// Phases the flow can rest in. A failed async step falls back to
    /// the last one of these.
    pub fn is_stable(&self) -> bool {
        matches!(
            self,
            SwapPhase::Idle
                | SwapPhase::Priced
                | SwapPhase::Reviewed
                | SwapPhase::Confirmed
                | SwapPhase::Error
        )
    }
}

/// Which amount field the user typed into last. That one is
/// authoritative, the other is derived from prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradeDirection {
    #[default]
    Sell,
    Buy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Transient user-facing message. Never changes the phase by itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwapSession {
    pub sell_token: Token,
    pub buy_token: Token,
    pub sell_amount: String,
    pub buy_amount: String,
    pub direction: TradeDirection,
    pub price: Option<PriceResponse>,
    pub quote: Option<QuoteResponse>,
    pub finalize: bool,
    pub validation_errors: Vec<String>,
    /// Allowance granted to the exchange proxy; `None` until read
    pub allowance: Option<U256>,
    pub balance: Option<U256>,
    pub tx_hash: Option<String>,
}

impl SwapSession {
    pub fn new(sell_token: Token, buy_token: Token) -> Self {
        Self {
            sell_token,
            buy_token,
            sell_amount: String::new(),
            buy_amount: String::new(),
            direction: TradeDirection::Sell,
            price: None,
            quote: None,
            finalize: false,
            validation_errors: Vec::new(),
            allowance: None,
            balance: None,
            tx_hash: None,
        }
    }

    pub fn authoritative_amount(&self) -> &str {
        match self.direction {
            TradeDirection::Sell => &self.sell_amount,
            TradeDirection::Buy => &self.buy_amount,
        }
    }

    pub fn derived_amount_mut(&mut self) -> &mut String {
        match self.direction {
            TradeDirection::Sell => &mut self.buy_amount,
            TradeDirection::Buy => &mut self.sell_amount,
        }
    }

    /// Sell amount in base units the swap will spend. On the buy side it
    /// is whatever the last price asked for.
    pub fn required_sell_amount(&self) -> Option<U256> {
        match self.direction {
            TradeDirection::Sell => {
                if self.sell_amount.trim().is_empty() {
                    return None;
                }
                parse_units(&self.sell_amount, self.sell_token.decimals).ok()
            }
            TradeDirection::Buy => self.price.as_ref().and_then(|price| price.sell_amount),
        }
    }

    pub fn clear_pricing(&mut self) {
        self.price = None;
        self.quote = None;
        self.finalize = false;
        self.validation_errors.clear();
    }
}
