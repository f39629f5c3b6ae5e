//! Bidder capability
//!
//! A bidder is untrusted code the fund calls back into mid-settlement. It
//! does not get the ledger: it gets a [`BidderContext`] bound to its own
//! address, which can read balances, move the bidder's own tokens, and
//! attempt nested `settle`/`open_trade` calls as the bidder. Minting,
//! role changes and proxy admin operations are not reachable from a
//! callback. The settlement engine only trusts what it observes in the
//! fund's buy-token balance afterwards.

use basket_common::{Address, Amount, TokenId, TradeId};
use log::warn;

use crate::error::{CallbackError, SettlementError, TokenError, TradeError};
use crate::settlement::{Settlement, Trade};
use crate::vault::Vault;

pub trait Bidder {
    /// Address the bidder acts as (the settlement caller)
    fn address(&self) -> Address;

    /// Deliver `buy_amount` of `buy_token` to the fund
    ///
    /// Called after the sell tokens have been transferred to the bidder.
    /// Returning `Err` reverts the whole settlement.
    fn on_bid_fulfilled(
        &mut self,
        ctx: &mut BidderContext<'_>,
        buy_token: TokenId,
        buy_amount: Amount,
        data: &[u8],
    ) -> Result<(), CallbackError>;
}

/// What a bidder callback may do, always as the bidder
pub struct BidderContext<'a> {
    vault: &'a mut Vault,
    bidder: Address,
}

impl<'a> BidderContext<'a> {
    pub(crate) fn new(vault: &'a mut Vault, bidder: Address) -> Self {
        Self { vault, bidder }
    }

    /// Address every call is made as
    pub fn address(&self) -> Address {
        self.bidder
    }

    pub fn fund_address(&self) -> Address {
        self.vault.fund_address()
    }

    pub fn balance_of(&self, token: TokenId, holder: Address) -> Result<Amount, TokenError> {
        self.vault.balance_of(token, holder)
    }

    /// Move `amount` of the bidder's own `token` to `to`
    pub fn transfer(&mut self, token: TokenId, to: Address, amount: Amount) -> Result<bool, TokenError> {
        self.vault.transfer(self.bidder, token, to, amount)
    }

    /// Nested settlement attempt
    ///
    /// `bidder` must act as the same address as this context.
    pub fn settle(
        &mut self,
        trade_id: TradeId,
        bidder: &mut dyn Bidder,
        data: &[u8],
    ) -> Result<Settlement, SettlementError> {
        let caller = bidder.address();
        if caller != self.bidder {
            warn!("Error: callback of {} tried to settle {} as {}", self.bidder, trade_id, caller);
            return Err(SettlementError::Unauthorized { caller, trade: trade_id });
        }
        self.vault.settle(trade_id, bidder, data)
    }

    /// Nested trade recording attempt, approved by the bidder itself
    pub fn open_trade(&mut self, request: Trade) -> Result<TradeId, TradeError> {
        self.vault.open_trade(self.bidder, request)
    }
}
