//! Settlement against honest and adversarial bidders
//!
//! Every failing case also checks that the ledger is exactly as it was
//! before the call.

use basket_fund::bidders::{DishonestBidder, DonatingBidder, FailingBidder, HonestBidder, ReentrantBidder};
use basket_fund::{
    Address, Amount, Bidder, BidderContext, CallbackError, Role, Settlement, SettlementError, TokenError, TokenId,
    Trade, TradeError, TradeId, TradeStatus, TransferMode, Vault,
};
use basket_integration_tests::*;

fn vault() -> Vault {
    funded_vault("2.1.0")
}

// ============================================================================
// Honest path
// ============================================================================

#[test]
fn test_honest_settlement_swaps_balances() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 25_000);
    let mut honest = HonestBidder::new(bidder(0));

    let receipt = vault.settle(id, &mut honest, b"").unwrap();

    assert_eq!(receipt.sold, 10);
    assert_eq!(receipt.delivered, 25_000);
    assert_eq!(vault.fund_balance(WETH).unwrap(), FUND_WETH - 10);
    assert_eq!(vault.fund_balance(USDC).unwrap(), 25_000);
    assert_eq!(vault.balance_of(WETH, bidder(0)).unwrap(), 10);
    assert_eq!(vault.balance_of(USDC, bidder(0)).unwrap(), BIDDER_FLOAT - 25_000);
    assert_eq!(vault.trade_status(id), Some(TradeStatus::Settled));
    assert_eq!(vault.depth(), 0);
}

#[test]
fn test_over_delivery_is_accepted_and_reported() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 25_000);
    let mut generous = DishonestBidder::new(bidder(0), 30_000);

    let receipt = vault.settle(id, &mut generous, b"").unwrap();
    assert_eq!(receipt.delivered, 30_000);
}

#[test]
fn test_independent_trades_settle_in_sequence() {
    let mut vault = vault();
    let first = open_trade(&mut vault, bidder(0), 10, 100);
    let second = open_trade(&mut vault, bidder(1), 20, 200);

    vault.settle(second, &mut HonestBidder::new(bidder(1)), b"").unwrap();
    vault.settle(first, &mut HonestBidder::new(bidder(0)), b"").unwrap();

    assert_eq!(vault.fund_balance(WETH).unwrap(), FUND_WETH - 30);
    assert_eq!(vault.fund_balance(USDC).unwrap(), 300);
}

// ============================================================================
// Shortfall & rollback
// ============================================================================

#[test]
fn test_shortfall_reverts_everything() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 25_000);
    let before = vault.checkpoint();

    let mut cheat = DishonestBidder::new(bidder(0), 24_999);
    let result = vault.settle(id, &mut cheat, b"");

    assert_eq!(
        result,
        Err(SettlementError::SettlementShortfall {
            trade: id,
            token: USDC,
            required: 25_000,
            delivered: 24_999,
        })
    );
    // Sell tokens came back and the trade can still be settled honestly
    assert_eq!(vault.checkpoint(), before);
    assert_eq!(vault.trade_status(id), Some(TradeStatus::Open));

    vault.settle(id, &mut HonestBidder::new(bidder(0)), b"").unwrap();
}

#[test]
fn test_zero_delivery_reverts() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 1);
    let before = vault.checkpoint();

    let result = vault.settle(id, &mut DishonestBidder::new(bidder(0), 0), b"");
    assert!(matches!(result, Err(SettlementError::SettlementShortfall { delivered: 0, .. })));
    assert_eq!(vault.checkpoint(), before);
}

#[test]
fn test_failing_callback_reverts() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 100);
    let before = vault.checkpoint();

    let result = vault.settle(id, &mut FailingBidder::new(bidder(0), "out of gas"), b"");
    assert_eq!(
        result,
        Err(SettlementError::Callback(CallbackError::Rejected("out of gas".into())))
    );
    assert_eq!(vault.checkpoint(), before);
}

#[test]
fn test_bidder_without_funds_reverts() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, BIDDER_FLOAT + 1);
    let before = vault.checkpoint();

    let result = vault.settle(id, &mut HonestBidder::new(bidder(0)), b"");
    assert!(matches!(
        result,
        Err(SettlementError::Callback(CallbackError::Delivery(
            TokenError::InsufficientBalance { .. }
        )))
    ));
    assert_eq!(vault.checkpoint(), before);
}

// ============================================================================
// Donations
// ============================================================================

#[test]
fn test_donation_of_other_token_does_not_count() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 25_000);
    let before = vault.checkpoint();

    // Pays the full amount in DAI instead of USDC
    let mut donor = DonatingBidder::new(bidder(0), DAI, 25_000).delivering(0);
    let result = vault.settle(id, &mut donor, b"");

    assert!(matches!(result, Err(SettlementError::SettlementShortfall { delivered: 0, .. })));
    assert_eq!(vault.checkpoint(), before);
}

#[test]
fn test_donation_alongside_full_delivery_is_kept() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 25_000);

    let mut donor = DonatingBidder::new(bidder(0), DAI, 7);
    let receipt = vault.settle(id, &mut donor, b"").unwrap();

    assert_eq!(receipt.delivered, 25_000);
    assert_eq!(vault.fund_balance(DAI).unwrap(), 7);
}

#[test]
fn test_prior_buy_token_donation_is_not_credited() {
    let mut vault = vault();
    // Someone sends USDC to the fund before the trade settles
    vault.transfer(bidder(1), USDC, fund(), 50_000).unwrap();
    let id = open_trade(&mut vault, bidder(0), 10, 25_000);
    let before = vault.checkpoint();

    let result = vault.settle(id, &mut DishonestBidder::new(bidder(0), 0), b"");
    assert!(matches!(result, Err(SettlementError::SettlementShortfall { delivered: 0, .. })));
    assert_eq!(vault.checkpoint(), before);
}

// ============================================================================
// Replay & reentrancy
// ============================================================================

#[test]
fn test_double_settlement_rejected() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 100);
    vault.settle(id, &mut HonestBidder::new(bidder(0)), b"").unwrap();
    let before = vault.checkpoint();

    let result = vault.settle(id, &mut HonestBidder::new(bidder(0)), b"");
    assert_eq!(result, Err(SettlementError::AlreadySettled(id)));
    assert_eq!(vault.checkpoint(), before);
}

#[test]
fn test_wrong_bidder_rejected() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 100);
    let before = vault.checkpoint();

    let result = vault.settle(id, &mut HonestBidder::new(bidder(1)), b"");
    assert_eq!(
        result,
        Err(SettlementError::Unauthorized {
            caller: bidder(1),
            trade: id,
        })
    );
    assert_eq!(vault.checkpoint(), before);
}

#[test]
fn test_unknown_trade_rejected() {
    let mut vault = vault();
    let result = vault.settle(TradeId(42), &mut HonestBidder::new(bidder(0)), b"");
    assert_eq!(result, Err(SettlementError::UnknownTrade(TradeId(42))));
}

#[test]
fn test_reentrant_settlement_cannot_double_count() {
    let mut vault = vault();
    let outer = open_trade(&mut vault, bidder(0), 10, 500);
    let inner = open_trade(&mut vault, bidder(0), 10, 500);
    let before = vault.checkpoint();

    // The nested honest settlement would deliver 500 USDC that the outer
    // check would also see
    let mut reentrant = ReentrantBidder::new(bidder(0), inner);
    let result = vault.settle(outer, &mut reentrant, b"");

    assert_eq!(reentrant.nested, Some(Err(SettlementError::Reentrant(outer))));
    assert!(matches!(result, Err(SettlementError::SettlementShortfall { delivered: 0, .. })));
    assert_eq!(vault.checkpoint(), before);
    assert_eq!(vault.trade_status(inner), Some(TradeStatus::Open));
}

#[test]
fn test_reentrant_settlement_of_same_trade_rejected() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 500);

    let mut reentrant = ReentrantBidder::new(bidder(0), id).also_delivering();
    let receipt = vault.settle(id, &mut reentrant, b"").unwrap();

    assert_eq!(reentrant.nested, Some(Err(SettlementError::Reentrant(id))));
    assert_eq!(receipt.delivered, 500);
    assert_eq!(vault.fund_balance(USDC).unwrap(), 500);
}

#[test]
fn test_open_trade_from_callback_rejected() {
    struct Opener {
        address: Address,
        outcome: Option<Result<TradeId, TradeError>>,
    }

    impl Bidder for Opener {
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
            let request = Trade {
                sell_token: WETH,
                buy_token: USDC,
                sell_amount: 1,
                min_buy_amount: 1,
                bidder: self.address,
            };
            self.outcome = Some(ctx.open_trade(request));
            let fund = ctx.fund_address();
            ctx.transfer(buy_token, fund, buy_amount)?;
            Ok(())
        }
    }

    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), 10, 100);
    let mut opener = Opener {
        address: bidder(0),
        outcome: None,
    };

    vault.settle(id, &mut opener, b"").unwrap();
    assert_eq!(opener.outcome, Some(Err(TradeError::Reentrant(id))));
}

// ============================================================================
// Callback capabilities
// ============================================================================

/// Tries everything a callback can reach before paying
struct Hostile {
    address: Address,
    victim: Address,
    victim_trade: TradeId,
    paid: Option<Result<bool, TokenError>>,
    nested: Option<Result<Settlement, SettlementError>>,
    opened: Option<Result<TradeId, TradeError>>,
    victim_balance_seen: Option<Amount>,
}

impl Hostile {
    fn new(address: Address, victim: Address, victim_trade: TradeId) -> Self {
        Self {
            address,
            victim,
            victim_trade,
            paid: None,
            nested: None,
            opened: None,
            victim_balance_seen: None,
        }
    }
}

impl Bidder for Hostile {
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
        assert_eq!(ctx.address(), self.address);
        self.victim_balance_seen = ctx.balance_of(buy_token, self.victim).ok();

        // Settle the victim's trade with an inner bidder wearing their address
        let mut disguise = HonestBidder::new(self.victim);
        self.nested = Some(ctx.settle(self.victim_trade, &mut disguise, data));

        self.opened = Some(ctx.open_trade(Trade {
            sell_token: WETH,
            buy_token: USDC,
            sell_amount: FUND_WETH,
            min_buy_amount: 1,
            bidder: self.address,
        }));

        // Hand the sold WETH straight back; it is not the buy token
        let fund = ctx.fund_address();
        let received = ctx.balance_of(WETH, self.address)?;
        ctx.transfer(WETH, fund, received)?;

        // Can only ever pay from its own balance
        self.paid = Some(ctx.transfer(buy_token, fund, buy_amount));
        Ok(())
    }
}

fn assert_governance_untouched(vault: &Vault) {
    assert_eq!(vault.role_members(Role::ADMIN), vec![timelock()]);
    assert_eq!(vault.proxy_owner(), timelock());
    assert_eq!(vault.version(), "2.1.0");
}

#[test]
fn test_callback_without_funds_cannot_pay_from_elsewhere() {
    let mut vault = vault();
    let eve = Address::from_label("eve");
    let victim_trade = open_trade(&mut vault, bidder(0), 10, 500);
    let id = open_trade(&mut vault, eve, 10, 500);
    let before = vault.checkpoint();

    let mut hostile = Hostile::new(eve, bidder(0), victim_trade);
    let result = vault.settle(id, &mut hostile, b"");

    assert!(matches!(result, Err(SettlementError::SettlementShortfall { delivered: 0, .. })));
    assert!(matches!(hostile.paid, Some(Err(TokenError::InsufficientBalance { .. }))));
    assert_eq!(
        hostile.nested,
        Some(Err(SettlementError::Unauthorized {
            caller: bidder(0),
            trade: victim_trade,
        }))
    );
    assert_eq!(hostile.opened, Some(Err(TradeError::Reentrant(id))));
    assert_eq!(hostile.victim_balance_seen, Some(BIDDER_FLOAT));

    assert_eq!(vault.checkpoint(), before);
    assert_eq!(vault.balance_of(USDC, bidder(0)).unwrap(), BIDDER_FLOAT);
    assert_eq!(vault.trade_status(victim_trade), Some(TradeStatus::Open));
    assert_governance_untouched(&vault);
}

#[test]
fn test_committed_callback_leaves_others_untouched() {
    let mut vault = vault();
    let victim_trade = open_trade(&mut vault, bidder(0), 10, 500);
    let id = open_trade(&mut vault, bidder(1), 10, 500);

    let mut hostile = Hostile::new(bidder(1), bidder(0), victim_trade);
    let receipt = vault.settle(id, &mut hostile, b"").unwrap();

    assert_eq!(receipt.delivered, 500);
    assert_eq!(hostile.paid, Some(Ok(true)));
    assert!(matches!(hostile.nested, Some(Err(SettlementError::Unauthorized { .. }))));

    // Only the settling bidder's balances moved
    assert_eq!(vault.balance_of(USDC, bidder(0)).unwrap(), BIDDER_FLOAT);
    assert_eq!(vault.balance_of(WETH, bidder(0)).unwrap(), 0);
    assert_eq!(vault.balance_of(USDC, bidder(1)).unwrap(), BIDDER_FLOAT - 500);
    assert_eq!(vault.fund_balance(WETH).unwrap(), FUND_WETH);
    assert_eq!(vault.fund_balance(USDC).unwrap(), 500);
    assert_eq!(vault.trade_status(victim_trade), Some(TradeStatus::Open));
    assert_governance_untouched(&vault);

    // The victim can still settle their own trade
    vault.settle(victim_trade, &mut HonestBidder::new(bidder(0)), b"").unwrap();
}

#[test]
fn test_posing_reentry_rejected_before_reentrancy_check() {
    let mut vault = vault();
    let victim_trade = open_trade(&mut vault, bidder(0), 10, 500);
    let id = open_trade(&mut vault, bidder(1), 10, 500);

    let mut poser = ReentrantBidder::new(bidder(1), victim_trade)
        .posing_as(bidder(0))
        .also_delivering();
    vault.settle(id, &mut poser, b"").unwrap();

    assert_eq!(
        poser.nested,
        Some(Err(SettlementError::Unauthorized {
            caller: bidder(0),
            trade: victim_trade,
        }))
    );
    assert_eq!(vault.balance_of(USDC, bidder(0)).unwrap(), BIDDER_FLOAT);
}

// ============================================================================
// Non-standard tokens
// ============================================================================

fn vault_with_sell_token(mode: TransferMode) -> (Vault, TokenId) {
    let odd = TokenId::from_symbol("ODD");
    let mut vault = vault();
    vault.add_token(odd, mode).unwrap();
    vault.mint(odd, fund(), 100).unwrap();
    (vault, odd)
}

#[test]
fn test_sell_token_returning_false_is_a_failure() {
    for mode in [TransferMode::Frozen, TransferMode::ReturnsFalse] {
        let (mut vault, odd) = vault_with_sell_token(mode);
        let sell_amount = if mode == TransferMode::ReturnsFalse { 101 } else { 10 };
        let id = vault
            .open_trade(
                approver(0),
                Trade {
                    sell_token: odd,
                    buy_token: USDC,
                    sell_amount,
                    min_buy_amount: 100,
                    bidder: bidder(0),
                },
            )
            .unwrap();
        let before = vault.checkpoint();

        let result = vault.settle(id, &mut HonestBidder::new(bidder(0)), b"");
        assert_eq!(result, Err(SettlementError::TransferFailed { token: odd }));
        assert_eq!(vault.checkpoint(), before);
    }
}

#[test]
fn test_sell_token_revert_is_a_failure() {
    let mut vault = vault();
    let id = open_trade(&mut vault, bidder(0), FUND_WETH + 1, 100);
    let before = vault.checkpoint();

    let result = vault.settle(id, &mut HonestBidder::new(bidder(0)), b"");
    assert_eq!(result, Err(SettlementError::TransferFailed { token: WETH }));
    assert_eq!(vault.checkpoint(), before);
}

#[test]
fn test_frozen_buy_token_cannot_be_delivered() {
    let frozen = TokenId::from_symbol("FRZ");
    let mut vault = vault();
    vault.add_token(frozen, TransferMode::Frozen).unwrap();
    vault.mint(frozen, bidder(0), 1_000).unwrap();
    let id = vault
        .open_trade(
            approver(0),
            Trade {
                sell_token: WETH,
                buy_token: frozen,
                sell_amount: 10,
                min_buy_amount: 100,
                bidder: bidder(0),
            },
        )
        .unwrap();
    let before = vault.checkpoint();

    let result = vault.settle(id, &mut HonestBidder::new(bidder(0)), b"");
    assert!(matches!(
        result,
        Err(SettlementError::Callback(CallbackError::Rejected(_)))
    ));
    assert_eq!(vault.checkpoint(), before);
}

// ============================================================================
// Trade approval
// ============================================================================

#[test]
fn test_only_approvers_open_trades() {
    let mut vault = vault();
    let request = Trade {
        sell_token: WETH,
        buy_token: USDC,
        sell_amount: 1,
        min_buy_amount: 1,
        bidder: bidder(0),
    };

    let result = vault.open_trade(bidder(0), request.clone());
    assert!(matches!(result, Err(TradeError::Unauthorized { .. })));

    let bad = Trade {
        buy_token: WETH,
        ..request.clone()
    };
    assert!(matches!(vault.open_trade(approver(0), bad), Err(TradeError::InvalidTrade(_))));

    let unknown = Trade {
        buy_token: TokenId::from_symbol("NOPE"),
        ..request
    };
    assert!(matches!(
        vault.open_trade(approver(0), unknown),
        Err(TradeError::Token(TokenError::UnknownToken(_)))
    ));
}
