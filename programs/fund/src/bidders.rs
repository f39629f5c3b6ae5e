//! Reference bidders
//!
//! Honest and adversarial counterparties. The CLI scenarios and the test
//! suites drive the settlement engine with these.

use basket_common::{Address, Amount, TokenId, TradeId};
use log::debug;

use crate::bidder::{Bidder, BidderContext};
use crate::error::{CallbackError, SettlementError};
use crate::settlement::Settlement;

/// Transfer from the bidder to the fund, treating a false return as failure
fn deliver(ctx: &mut BidderContext<'_>, token: TokenId, amount: Amount) -> Result<(), CallbackError> {
    let fund = ctx.fund_address();
    if ctx.transfer(token, fund, amount)? {
        Ok(())
    } else {
        Err(CallbackError::Rejected(format!("{} transfer returned false", token)))
    }
}

// ============================================================================
// Honest
// ============================================================================

/// Delivers exactly the requested amount
#[derive(Clone, Debug)]
pub struct HonestBidder {
    address: Address,
}

impl HonestBidder {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl Bidder for HonestBidder {
    fn address(&self) -> Address {
        self.address
    }

    fn on_bid_fulfilled(
        &mut self,
        ctx: &mut BidderContext<'_>,
        buy_token: TokenId,
        buy_amount: Amount,
        _data: &[u8],
    ) -> Result<(), CallbackError> {
        deliver(ctx, buy_token, buy_amount)
    }
}

// ============================================================================
// Dishonest
// ============================================================================

/// Delivers a fixed amount regardless of what was asked (often zero)
#[derive(Clone, Debug)]
pub struct DishonestBidder {
    address: Address,
    delivers: Amount,
}

impl DishonestBidder {
    pub fn new(address: Address, delivers: Amount) -> Self {
        Self { address, delivers }
    }
}

impl Bidder for DishonestBidder {
    fn address(&self) -> Address {
        self.address
    }

    fn on_bid_fulfilled(
        &mut self,
        ctx: &mut BidderContext<'_>,
        buy_token: TokenId,
        buy_amount: Amount,
        _data: &[u8],
    ) -> Result<(), CallbackError> {
        debug!("{} owes {} {} and delivers {}", self.address, buy_amount, buy_token, self.delivers);
        deliver(ctx, buy_token, self.delivers)
    }
}

// ============================================================================
// Donating
// ============================================================================

/// Delivers the requested amount and also sends an unrelated token
#[derive(Clone, Debug)]
pub struct DonatingBidder {
    address: Address,
    delivers: Option<Amount>,
    donation_token: TokenId,
    donation: Amount,
}

impl DonatingBidder {
    pub fn new(address: Address, donation_token: TokenId, donation: Amount) -> Self {
        Self {
            address,
            delivers: None,
            donation_token,
            donation,
        }
    }

    /// Deliver `amount` of the buy token instead of the requested amount
    pub fn delivering(mut self, amount: Amount) -> Self {
        self.delivers = Some(amount);
        self
    }
}

impl Bidder for DonatingBidder {
    fn address(&self) -> Address {
        self.address
    }

    fn on_bid_fulfilled(
        &mut self,
        ctx: &mut BidderContext<'_>,
        buy_token: TokenId,
        buy_amount: Amount,
        _data: &[u8],
    ) -> Result<(), CallbackError> {
        deliver(ctx, buy_token, self.delivers.unwrap_or(buy_amount))?;
        deliver(ctx, self.donation_token, self.donation)
    }
}

// ============================================================================
// Reentrant
// ============================================================================

/// Tries to settle a second trade from inside the callback
///
/// The nested settlement uses an honest inner bidder, so if reentrancy were
/// allowed the inner delivery would also be counted by the outer check.
/// With [`ReentrantBidder::posing_as`] the inner bidder claims another
/// holder's address instead of its own.
#[derive(Clone, Debug)]
pub struct ReentrantBidder {
    address: Address,
    target: TradeId,
    inner: Option<Address>,
    also_deliver: bool,
    /// Outcome of the nested settlement attempt
    pub nested: Option<Result<Settlement, SettlementError>>,
}

impl ReentrantBidder {
    pub fn new(address: Address, target: TradeId) -> Self {
        Self {
            address,
            target,
            inner: None,
            also_deliver: false,
            nested: None,
        }
    }

    /// Run the nested settlement as `victim`
    pub fn posing_as(mut self, victim: Address) -> Self {
        self.inner = Some(victim);
        self
    }

    /// Deliver the outer amount as well after the reentry attempt
    pub fn also_delivering(mut self) -> Self {
        self.also_deliver = true;
        self
    }
}

impl Bidder for ReentrantBidder {
    fn address(&self) -> Address {
        self.address
    }

    fn on_bid_fulfilled(
        &mut self,
        ctx: &mut BidderContext<'_>,
        buy_token: TokenId,
        buy_amount: Amount,
        data: &[u8],
    ) -> Result<(), CallbackError> {
        let mut inner = HonestBidder::new(self.inner.unwrap_or(self.address));
        let nested = ctx.settle(self.target, &mut inner, data);
        debug!("nested settlement of {} returned {:?}", self.target, nested);
        self.nested = Some(nested);

        if self.also_deliver {
            deliver(ctx, buy_token, buy_amount)?;
        }
        Ok(())
    }
}

// ============================================================================
// Failing
// ============================================================================

/// Callback that always errors
#[derive(Clone, Debug)]
pub struct FailingBidder {
    address: Address,
    reason: String,
}

impl FailingBidder {
    pub fn new(address: Address, reason: impl Into<String>) -> Self {
        Self {
            address,
            reason: reason.into(),
        }
    }
}

impl Bidder for FailingBidder {
    fn address(&self) -> Address {
        self.address
    }

    fn on_bid_fulfilled(
        &mut self,
        _ctx: &mut BidderContext<'_>,
        _buy_token: TokenId,
        _buy_amount: Amount,
        _data: &[u8],
    ) -> Result<(), CallbackError> {
        Err(CallbackError::Rejected(self.reason.clone()))
    }
}
