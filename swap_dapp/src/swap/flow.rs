//! Swap dialog controller.
//!
//! One [`SwapFlow`] per open dialog. Every operation takes `&mut self`, so
//! two steps of the same flow never overlap; results of async steps are
//! applied in one go when they resolve. Price requests carry a generation
//! number and answers to anything but the latest request are dropped.

use error_stack::{Report, ResultExt as _, report};
use swap_models::{
    constants::tokens::Token,
    models::zero_x::{PriceResponse, SwapQuery, ZeroXResponse},
    uint::MAX_ALLOWANCE,
};
use tracing::{debug, info, warn};

use crate::{
    error::{DappResult, Error, ReportDisplayExt},
    swap::{
        allowance::SwapAction,
        context::SwapContext,
        state::{Notice, SwapPhase, SwapSession, TradeDirection},
        token_selector::TokenSelector,
        wallet::TransactionRequest,
    },
    utils::{
        abi::approve_calldata,
        number_conversion::{format_units, parse_units},
    },
};

pub const DEFAULT_SELL_SYMBOL: &str = "wmatic";
pub const DEFAULT_BUY_SYMBOL: &str = "usdc";

/// Price request issued by the flow, to be answered through
/// [`SwapFlow::apply_price`].
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRequest {
    pub generation: u64,
    pub query: SwapQuery,
}

pub struct SwapFlow {
    ctx: SwapContext,
    session: SwapSession,
    phase: SwapPhase,
    stable_phase: SwapPhase,
    generation: u64,
    notices: Vec<Notice>,
    sell_selector: TokenSelector,
    buy_selector: TokenSelector,
}

impl SwapFlow {
    pub fn new(ctx: SwapContext, sell_symbol: &str, buy_symbol: &str) -> DappResult<Self> {
        let sell_token = lookup_token(&ctx, sell_symbol)?;
        let buy_token = lookup_token(&ctx, buy_symbol)?;
        let sell_selector = TokenSelector::new(ctx.registry.clone());
        let buy_selector = TokenSelector::new(ctx.registry.clone());

        Ok(Self {
            ctx,
            session: SwapSession::new(sell_token, buy_token),
            phase: SwapPhase::Idle,
            stable_phase: SwapPhase::Idle,
            generation: 0,
            notices: Vec::new(),
            sell_selector,
            buy_selector,
        })
    }

    pub fn with_defaults(ctx: SwapContext) -> DappResult<Self> {
        Self::new(ctx, DEFAULT_SELL_SYMBOL, DEFAULT_BUY_SYMBOL)
    }

    pub fn phase(&self) -> SwapPhase {
        self.phase
    }

    pub fn session(&self) -> &SwapSession {
        &self.session
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn sell_selector(&self) -> &TokenSelector {
        &self.sell_selector
    }

    pub fn buy_selector(&self) -> &TokenSelector {
        &self.buy_selector
    }

    fn set_phase(&mut self, phase: SwapPhase) {
        debug!("Swap phase {:?} -> {phase:?}", self.phase);
        self.phase = phase;
        if phase.is_stable() {
            self.stable_phase = phase;
        }
    }

    /// Reports a failed step to the user and falls back to the last
    /// phase the flow could rest in.
    fn fail<T>(&mut self, report: Report<Error>) -> DappResult<T> {
        warn!("Swap step failed in {:?}: {report:?}", self.phase);
        self.notices.push(Notice::error(report.format()));
        self.set_phase(self.stable_phase);
        Err(report)
    }

    fn refuse<T>(&mut self, warning: &str, error: Error) -> DappResult<T> {
        self.notices.push(Notice::warning(warning));
        Err(report!(error))
    }

    fn require_wallet(&mut self, action: &str) -> DappResult<String> {
        match self.ctx.wallet_address() {
            Some(address) => Ok(address),
            None => self.refuse(
                &format!("Connect a wallet to {action}"),
                Error::WalletNotConnected,
            ),
        }
    }

    pub fn select_sell_token(&mut self, value: &str) -> DappResult<Option<PriceRequest>> {
        let mut chosen = None;
        self.sell_selector
            .select(value, |symbol| chosen = Some(symbol.to_string()))?;
        let Some(symbol) = chosen else {
            return Ok(None);
        };
        if symbol == self.session.sell_token.key() {
            return Ok(None);
        }

        self.session.sell_token = lookup_token(&self.ctx, &symbol)?;
        self.session.allowance = None;
        self.session.balance = None;
        Ok(self.reprice_after_token_change())
    }

    pub fn select_buy_token(&mut self, value: &str) -> DappResult<Option<PriceRequest>> {
        let mut chosen = None;
        self.buy_selector
            .select(value, |symbol| chosen = Some(symbol.to_string()))?;
        let Some(symbol) = chosen else {
            return Ok(None);
        };
        if symbol == self.session.buy_token.key() {
            return Ok(None);
        }

        self.session.buy_token = lookup_token(&self.ctx, &symbol)?;
        Ok(self.reprice_after_token_change())
    }

    fn reprice_after_token_change(&mut self) -> Option<PriceRequest> {
        self.session.clear_pricing();
        self.session.derived_amount_mut().clear();
        if self.session.authoritative_amount().trim().is_empty() {
            self.generation += 1;
            self.set_phase(SwapPhase::Idle);
            return None;
        }
        self.issue_price_request()
    }

    pub fn set_sell_amount(&mut self, text: &str) -> Option<PriceRequest> {
        self.session.sell_amount = text.to_string();
        self.session.direction = TradeDirection::Sell;
        self.amount_edited()
    }

    pub fn set_buy_amount(&mut self, text: &str) -> Option<PriceRequest> {
        if !self.ctx.features.allow_buy_amount_entry {
            self.notices
                .push(Notice::warning("Buy amount is derived from the sell amount"));
            return None;
        }
        self.session.buy_amount = text.to_string();
        self.session.direction = TradeDirection::Buy;
        self.amount_edited()
    }

    fn amount_edited(&mut self) -> Option<PriceRequest> {
        self.session.quote = None;
        self.session.finalize = false;

        if self.session.authoritative_amount().trim().is_empty() {
            self.generation += 1;
            self.session.derived_amount_mut().clear();
            self.session.clear_pricing();
            self.set_phase(SwapPhase::Idle);
            return None;
        }
        self.issue_price_request()
    }

    /// Builds the next price request from the authoritative amount. An
    /// amount that does not parse is a validation failure.
    fn issue_price_request(&mut self) -> Option<PriceRequest> {
        self.generation += 1;

        let (decimals, field) = match self.session.direction {
            TradeDirection::Sell => (self.session.sell_token.decimals, "sellAmount"),
            TradeDirection::Buy => (self.session.buy_token.decimals, "buyAmount"),
        };
        let amount = match parse_units(self.session.authoritative_amount(), decimals) {
            Ok(amount) => amount,
            Err(e) => {
                self.session.validation_errors = vec![format!("{field}: {}", e.format())];
                self.set_phase(SwapPhase::Error);
                return None;
            }
        };

        let (sell_amount, buy_amount) = match self.session.direction {
            TradeDirection::Sell => (Some(amount), None),
            TradeDirection::Buy => (None, Some(amount)),
        };
        let query = SwapQuery {
            sell_token: self.session.sell_token.address.clone(),
            buy_token: self.session.buy_token.address.clone(),
            sell_amount,
            buy_amount,
            taker_address: self.ctx.wallet_address(),
            slippage_percentage: self.ctx.features.slippage_percentage,
        };

        self.set_phase(SwapPhase::Pricing);
        Some(PriceRequest {
            generation: self.generation,
            query,
        })
    }

    /// Applies the answer to a price request. Returns whether the session
    /// changed.
    pub fn apply_price(&mut self, generation: u64, response: Option<ZeroXResponse>) -> bool {
        if generation != self.generation {
            debug!(
                "Dropping price response {generation}, latest is {}",
                self.generation
            );
            return false;
        }
        if self.phase != SwapPhase::Pricing {
            return false;
        }

        let price = match response {
            None => return false,
            Some(ZeroXResponse::Failure(failure)) => {
                self.session.validation_errors = if failure.validation_errors.is_empty() {
                    vec![failure.reason]
                } else {
                    failure
                        .validation_errors
                        .iter()
                        .map(ToString::to_string)
                        .collect()
                };
                self.set_phase(SwapPhase::Error);
                return true;
            }
            Some(ZeroXResponse::Price(price)) => price,
            Some(ZeroXResponse::Quote(quote)) => quote.price,
        };
        if !price.has_amounts() {
            return false;
        }

        self.apply_derived_amount(&price);
        self.session.price = Some(price);
        self.session.validation_errors.clear();
        self.set_phase(SwapPhase::Priced);
        true
    }

    fn apply_derived_amount(&mut self, price: &PriceResponse) {
        match self.session.direction {
            TradeDirection::Sell => {
                if let Some(buy_amount) = price.buy_amount {
                    self.session.buy_amount =
                        format_units(buy_amount, self.session.buy_token.decimals);
                }
            }
            TradeDirection::Buy => {
                if let Some(sell_amount) = price.sell_amount {
                    self.session.sell_amount =
                        format_units(sell_amount, self.session.sell_token.decimals);
                }
            }
        }
    }

    /// Sends `request` to the quote source and applies whatever comes back.
    pub async fn run_price_request(&mut self, request: PriceRequest) -> bool {
        let response = self.ctx.quotes.price(&request.query).await;
        self.apply_price(request.generation, response)
    }

    pub async fn refresh_price(&mut self) -> bool {
        if self.session.authoritative_amount().trim().is_empty() {
            return false;
        }
        match self.issue_price_request() {
            Some(request) => self.run_price_request(request).await,
            None => false,
        }
    }

    /// Reads allowance and balance of the sell token for the connected
    /// wallet. Native tokens need no allowance. A failed read is reported
    /// as a notice and leaves the phase alone, so an in-flight price
    /// request still lands.
    pub async fn refresh_allowance(&mut self) -> DappResult<()> {
        let Some(owner) = self.ctx.wallet_address() else {
            self.session.allowance = None;
            self.session.balance = None;
            return Ok(());
        };
        let token = self.session.sell_token.clone();
        let reader = self.ctx.chain_reader.clone();

        let reads = if token.is_native() {
            reader
                .native_balance(&owner)
                .await
                .map(|balance| (MAX_ALLOWANCE, balance))
        } else {
            let spender = self.ctx.chain.exchange_proxy();
            match reader.erc20_allowance(&token.address, &owner, spender).await {
                Ok(allowance) => reader
                    .erc20_balance(&token.address, &owner)
                    .await
                    .map(|balance| (allowance, balance)),
                Err(e) => Err(e),
            }
        };

        match reads {
            Ok((allowance, balance)) => {
                debug!("{} allowance {allowance}, balance {balance}", token.symbol);
                self.session.allowance = Some(allowance);
                self.session.balance = Some(balance);
                Ok(())
            }
            Err(e) => {
                warn!("Could not read {} allowance: {e:?}", token.symbol);
                self.notices.push(Notice::error(e.format()));
                Err(e)
            }
        }
    }

    pub fn action(&self) -> SwapAction {
        SwapAction::decide(
            self.session.required_sell_amount(),
            self.session.allowance,
            self.session.balance,
            self.phase == SwapPhase::Approving,
        )
    }

    /// Approves the exchange proxy for the required sell amount, waits for
    /// the approval to be mined and reads the allowance again.
    pub async fn approve(&mut self) -> DappResult<()> {
        let owner = self.require_wallet("approve")?;
        if self.phase != SwapPhase::Priced {
            return Err(report!(Error::InvalidState(format!(
                "Cannot approve while {:?}",
                self.phase
            ))));
        }
        if self.session.sell_token.is_native() {
            return Ok(());
        }
        let action = self.action();
        if !matches!(action, SwapAction::Approve { .. }) {
            return Err(report!(Error::InvalidState(format!(
                "Nothing to approve, action is \"{}\"",
                action.label()
            ))));
        }
        let Some(required) = self.session.required_sell_amount() else {
            return self.refuse(
                "Enter an amount to approve",
                Error::InvalidState("No sell amount".to_string()),
            );
        };

        let spender = self.ctx.chain.exchange_proxy();
        let tx = TransactionRequest {
            from: owner,
            to: self.session.sell_token.address.clone(),
            data: approve_calldata(spender, required)?,
            value: None,
            gas: None,
            gas_price: None,
        };

        self.set_phase(SwapPhase::Approving);
        info!(
            "Approving {required} {} for {spender}",
            self.session.sell_token.symbol
        );
        if let Err(e) = self.send_and_wait(tx).await {
            return self.fail(e);
        }

        let refreshed = self.refresh_allowance().await;
        self.set_phase(SwapPhase::Priced);
        refreshed
    }

    async fn send_and_wait(&self, tx: TransactionRequest) -> DappResult<String> {
        let wallet = self
            .ctx
            .wallet
            .clone()
            .ok_or_else(|| report!(Error::WalletNotConnected))?;
        let tx_hash = wallet.send_transaction(tx).await?;
        let receipt = self.ctx.chain_reader.wait_for_receipt(&tx_hash).await?;
        if !receipt.success {
            return Err(report!(Error::TransactionReverted(tx_hash)));
        }
        Ok(tx_hash)
    }

    /// Fetches the firm quote for the last price: same pair, exact sell
    /// amount, connected wallet as taker.
    pub async fn review(&mut self) -> DappResult<()> {
        let taker = self.require_wallet("review the swap")?;
        if self.phase != SwapPhase::Priced {
            return Err(report!(Error::InvalidState(format!(
                "Cannot review while {:?}",
                self.phase
            ))));
        }
        let action = self.action();
        if action != SwapAction::ReviewSwap {
            return Err(report!(Error::InvalidState(format!(
                "Swap needs \"{}\" first",
                action.label()
            ))));
        }
        let Some(price) = self.session.price.clone() else {
            return Err(report!(Error::InvalidState("No price yet".to_string())));
        };

        let query = SwapQuery {
            sell_token: price
                .sell_token_address
                .clone()
                .unwrap_or_else(|| self.session.sell_token.address.clone()),
            buy_token: price
                .buy_token_address
                .clone()
                .unwrap_or_else(|| self.session.buy_token.address.clone()),
            sell_amount: price.sell_amount.or(self.session.required_sell_amount()),
            buy_amount: None,
            taker_address: Some(taker),
            slippage_percentage: self.ctx.features.slippage_percentage,
        };

        self.set_phase(SwapPhase::Quoting);
        let quotes = self.ctx.quotes.clone();
        match quotes.quote(&query).await {
            Ok(quote) => {
                self.session.quote = Some(quote);
                self.session.finalize = true;
                self.set_phase(SwapPhase::Reviewed);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// "Modify swap": back to the editable form, keeping the last price.
    pub fn modify(&mut self) -> DappResult<()> {
        if self.phase != SwapPhase::Reviewed {
            return Err(report!(Error::InvalidState(format!(
                "Nothing to modify while {:?}",
                self.phase
            ))));
        }
        self.session.quote = None;
        self.session.finalize = false;
        self.set_phase(SwapPhase::Priced);
        Ok(())
    }

    /// Submits the firm quote's transaction as-is and waits for it to be
    /// mined. The quote is consumed once the wallet accepts it.
    pub async fn confirm(&mut self) -> DappResult<()> {
        let from = self.require_wallet("place the order")?;
        let Some(quote) = self.session.quote.clone().filter(|_| self.phase == SwapPhase::Reviewed)
        else {
            return Err(report!(Error::InvalidState(format!(
                "No reviewed quote to confirm while {:?}",
                self.phase
            ))));
        };
        let wallet = self
            .ctx
            .wallet
            .clone()
            .ok_or_else(|| report!(Error::WalletNotConnected))?;

        let tx = TransactionRequest {
            from,
            to: quote.to.clone(),
            data: quote.data.clone(),
            value: quote.price.value,
            gas: quote.price.gas,
            gas_price: quote.price.gas_price,
        };

        self.set_phase(SwapPhase::Submitting);
        let tx_hash = match wallet.send_transaction(tx).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => return self.fail(e),
        };
        info!("Swap submitted: {tx_hash}");
        self.session.quote = None;
        self.session.finalize = false;
        self.session.tx_hash = Some(tx_hash.clone());
        self.stable_phase = SwapPhase::Priced;
        self.set_phase(SwapPhase::Confirming);

        let receipt = match self.ctx.chain_reader.wait_for_receipt(&tx_hash).await {
            Ok(receipt) => receipt,
            Err(e) => return self.fail(e),
        };
        if !receipt.success {
            return self.fail(report!(Error::TransactionReverted(tx_hash)));
        }
        self.set_phase(SwapPhase::Confirmed);
        Ok(())
    }

    pub fn explorer_url(&self) -> Option<String> {
        self.session
            .tx_hash
            .as_deref()
            .map(|tx_hash| self.ctx.chain.explorer_tx_url(tx_hash))
    }

    pub fn confirm_label(&self) -> &'static str {
        if self.phase == SwapPhase::Submitting {
            "Confirming..."
        } else {
            "Place Order"
        }
    }

    pub fn status_line(&self) -> Option<&'static str> {
        match self.phase {
            SwapPhase::Confirming => Some("Waiting for confirmation..."),
            SwapPhase::Confirmed => Some("Transaction confirmed."),
            SwapPhase::Quoting => Some("Getting best quote..."),
            _ => None,
        }
    }
}

fn lookup_token(ctx: &SwapContext, symbol: &str) -> DappResult<Token> {
    ctx.registry
        .require(symbol)
        .cloned()
        .change_context(Error::TokenNotFound(symbol.to_string()))
}
