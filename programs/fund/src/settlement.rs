//! Bid settlement engine
//!
//! One settlement is an atomic swap against an untrusted bidder:
//! 1. Snapshot the fund's buy-token balance
//! 2. Push the sell tokens to the bidder
//! 3. Call back into the bidder, which must deliver the buy tokens
//! 4. Snapshot the buy-token balance again
//! 5. Require the increase to cover the trade's minimum
//!
//! Steps 2-5 run inside one [`Vault::transact`], so a shortfall also returns
//! the sell tokens. The trade slot moves to `Settling` and the fund-wide lock
//! is taken before the callback runs; a reentrant settlement of any trade is
//! rejected, so a single delivery can never be observed by two deltas.
//!
//! Only the buy token is measured. Donations of any other token, including
//! the sell token, do not enter the decision.

use basket_common::{balance_increase, delivers_at_least, Address, Amount, Role, TokenId, TradeId};
use log::{debug, info, warn};

use crate::bidder::{Bidder, BidderContext};
use crate::error::{SettlementError, TradeError};
use crate::vault::Vault;

pub type Result<T> = core::result::Result<T, SettlementError>;

// ============================================================================
// Trade Types
// ============================================================================

/// Agreed swap between the fund and one bidder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trade {
    pub sell_token: TokenId,
    pub buy_token: TokenId,
    /// Sent to the bidder before the callback
    pub sell_amount: Amount,
    /// Buy-token increase the bidder must produce
    pub min_buy_amount: Amount,
    /// Only address allowed to settle
    pub bidder: Address,
}

/// Lifecycle of a recorded trade
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TradeSlot {
    Open(Trade),
    /// Bidder callback in progress
    Settling,
    /// Consumed; terms are dropped
    Settled,
}

/// Public view of a trade slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeStatus {
    Open,
    Settling,
    Settled,
}

impl TradeSlot {
    pub fn status(&self) -> TradeStatus {
        match self {
            TradeSlot::Open(_) => TradeStatus::Open,
            TradeSlot::Settling => TradeStatus::Settling,
            TradeSlot::Settled => TradeStatus::Settled,
        }
    }
}

/// Receipt of a committed settlement
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub trade_id: TradeId,
    pub sell_token: TokenId,
    pub buy_token: TokenId,
    pub sold: Amount,
    /// Observed buy-token increase (may exceed the minimum)
    pub delivered: Amount,
}

// ============================================================================
// Delivery Check
// ============================================================================

/// Compare the fund's buy-token balance across the callback
///
/// # Errors
/// * SettlementShortfall - the balance grew by less than `min_buy_amount`,
///   or shrank
pub fn verify_delivery(trade_id: TradeId, trade: &Trade, before: Amount, after: Amount) -> Result<Amount> {
    let delivered = balance_increase(before, after);
    if !delivers_at_least(before, after, trade.min_buy_amount) {
        warn!(
            "Error: trade {} delivered {} {} of {} required (balance {} -> {})",
            trade_id, delivered, trade.buy_token, trade.min_buy_amount, before, after
        );
        return Err(SettlementError::SettlementShortfall {
            trade: trade_id,
            token: trade.buy_token,
            required: trade.min_buy_amount,
            delivered,
        });
    }
    Ok(delivered)
}

// ============================================================================
// Trade Recording
// ============================================================================

impl Vault {
    /// Record a trade claimed by `request.bidder`
    ///
    /// The auction that priced the trade lives elsewhere; this only checks
    /// that the caller may approve trades at the fund's current version.
    ///
    /// # Errors
    /// * Unauthorized - caller lacks [`Vault::trade_approval_role`]
    /// * InvalidTrade - same token on both sides, zero amount or zero bidder
    /// * Token - either token is unknown to the ledger
    /// * Reentrant - called from inside a bidder callback
    pub fn open_trade(&mut self, caller: Address, request: Trade) -> core::result::Result<TradeId, TradeError> {
        if let Some(active) = self.fund_state().settling {
            warn!("Error: open_trade called while trade {} is settling", active);
            return Err(TradeError::Reentrant(active));
        }

        let role: Role = self.trade_approval_role();
        if !self.has_role(role, caller) {
            warn!("Error: {} lacks {} and cannot approve trades", caller, role);
            return Err(TradeError::Unauthorized { caller, role });
        }

        if request.sell_token == request.buy_token {
            return Err(TradeError::InvalidTrade("sell and buy token must differ"));
        }
        if request.sell_amount == 0 || request.min_buy_amount == 0 {
            return Err(TradeError::InvalidTrade("amounts must be non-zero"));
        }
        if request.bidder.is_zero() || request.bidder == self.fund_address() {
            return Err(TradeError::InvalidTrade("bidder must be an external address"));
        }
        // Unknown tokens fail here rather than mid-settlement
        self.balance_of(request.sell_token, request.bidder)?;
        self.balance_of(request.buy_token, request.bidder)?;

        let fund = self.fund_state_mut();
        let id = TradeId(fund.next_trade_id);
        fund.next_trade_id += 1;
        info!(
            "Trade {} opened: {} {} for >= {} {} with bidder {}",
            id, request.sell_amount, request.sell_token, request.min_buy_amount, request.buy_token, request.bidder
        );
        fund.trades.insert(id, TradeSlot::Open(request));
        Ok(id)
    }

    pub fn trade_status(&self, id: TradeId) -> Option<TradeStatus> {
        self.fund_state().trades.get(&id).map(TradeSlot::status)
    }

    /// Terms of a trade that has not been settled yet
    pub fn trade(&self, id: TradeId) -> Option<&Trade> {
        match self.fund_state().trades.get(&id) {
            Some(TradeSlot::Open(trade)) => Some(trade),
            _ => None,
        }
    }
}

// ============================================================================
// Settlement
// ============================================================================

impl Vault {
    /// Settle `trade_id` against `bidder`
    ///
    /// The bidder object is the caller: its address must match the one that
    /// claimed the trade, and it is the object called back.
    ///
    /// # Errors
    /// * Reentrant - another settlement is in progress
    /// * UnknownTrade / AlreadySettled - trade slot is missing or consumed
    /// * Unauthorized - bidder did not claim this trade
    /// * TransferFailed - the sell transfer reverted or returned false
    /// * Callback - the bidder callback failed
    /// * SettlementShortfall - the buy-token increase is below the minimum
    pub fn settle(&mut self, trade_id: TradeId, bidder: &mut dyn Bidder, data: &[u8]) -> Result<Settlement> {
        self.transact(|vault| vault.settle_in_transaction(trade_id, bidder, data))
    }

    fn settle_in_transaction(
        &mut self,
        trade_id: TradeId,
        bidder: &mut dyn Bidder,
        data: &[u8],
    ) -> Result<Settlement> {
        let caller = bidder.address();

        if let Some(active) = self.fund_state().settling {
            warn!("Error: reentrant settlement of {} by {} while {} is settling", trade_id, caller, active);
            return Err(SettlementError::Reentrant(active));
        }

        let trade = match self.fund_state().trades.get(&trade_id) {
            None => return Err(SettlementError::UnknownTrade(trade_id)),
            Some(TradeSlot::Open(trade)) => trade.clone(),
            Some(TradeSlot::Settling) | Some(TradeSlot::Settled) => {
                warn!("Error: trade {} already settled", trade_id);
                return Err(SettlementError::AlreadySettled(trade_id));
            }
        };

        if trade.bidder != caller {
            warn!("Error: {} did not claim trade {}", caller, trade_id);
            return Err(SettlementError::Unauthorized { caller, trade: trade_id });
        }

        // Effects before the interaction: the slot and the lock are taken now
        // and only released after verification succeeds.
        let fund = self.fund_state_mut();
        fund.trades.insert(trade_id, TradeSlot::Settling);
        fund.settling = Some(trade_id);

        let before = self.fund_balance(trade.buy_token)?;
        debug!("Trade {}: fund holds {} {} before callback", trade_id, before, trade.buy_token);

        self.push_sell_tokens(&trade)?;

        // The callback only ever acts as the caller
        let mut ctx = BidderContext::new(self, caller);
        bidder.on_bid_fulfilled(&mut ctx, trade.buy_token, trade.min_buy_amount, data)?;

        let after = self.fund_balance(trade.buy_token)?;
        debug!("Trade {}: fund holds {} {} after callback", trade_id, after, trade.buy_token);

        let delivered = verify_delivery(trade_id, &trade, before, after)?;

        let fund = self.fund_state_mut();
        fund.settling = None;
        fund.trades.insert(trade_id, TradeSlot::Settled);

        info!(
            "Trade {} settled: sold {} {}, received {} {}",
            trade_id, trade.sell_amount, trade.sell_token, delivered, trade.buy_token
        );

        Ok(Settlement {
            trade_id,
            sell_token: trade.sell_token,
            buy_token: trade.buy_token,
            sold: trade.sell_amount,
            delivered,
        })
    }

    fn push_sell_tokens(&mut self, trade: &Trade) -> Result<()> {
        // A false return and a revert are the same failure
        match self.transfer_from_fund(trade.sell_token, trade.bidder, trade.sell_amount) {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!("Error: {} transfer to {} returned false", trade.sell_token, trade.bidder);
                Err(SettlementError::TransferFailed { token: trade.sell_token })
            }
            Err(e) => {
                warn!("Error: {} transfer to {} reverted: {}", trade.sell_token, trade.bidder, e);
                Err(SettlementError::TransferFailed { token: trade.sell_token })
            }
        }
    }
}


// ═══════════════════════════════════════════════════════════════════════════
// Kani proofs
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Acceptance is exactly "the balance grew by at least the minimum"
    #[kani::proof]
    fn d1_verify_delivery_accepts_iff_covered() {
        let before: u128 = kani::any();
        let after: u128 = kani::any();
        let min_buy: u128 = kani::any();
        let trade = Trade {
            sell_token: TokenId::from_symbol("S"),
            buy_token: TokenId::from_symbol("B"),
            sell_amount: 1,
            min_buy_amount: min_buy,
            bidder: Address::from_label("b"),
        };

        match verify_delivery(TradeId(0), &trade, before, after) {
            Ok(delivered) => {
                assert!(after >= before);
                assert_eq!(delivered, after - before);
                assert!(delivered >= min_buy);
            }
            Err(SettlementError::SettlementShortfall { required, delivered, .. }) => {
                assert_eq!(required, min_buy);
                assert!(after < before || after - before < min_buy);
                assert!(after < before || delivered < min_buy);
            }
            Err(_) => unreachable!(),
        }
    }
}
