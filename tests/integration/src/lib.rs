//! Shared fixtures for the integration suites

use basket_fund::{Address, Amount, Role, TokenId, Trade, TradeId, TransferMode, Vault};
use basket_spell::{MigrationPlan, MigrationSpell};

pub const WETH: TokenId = TokenId::from_symbol("WETH");
pub const USDC: TokenId = TokenId::from_symbol("USDC");
pub const DAI: TokenId = TokenId::from_symbol("DAI");

/// Fund's starting WETH inventory
pub const FUND_WETH: Amount = 1_000;
/// Each bidder's starting USDC and DAI
pub const BIDDER_FLOAT: Amount = 10_000_000;
pub const BIDDERS: usize = 4;

pub fn fund() -> Address {
    Address::from_label("fund")
}

pub fn timelock() -> Address {
    Address::from_label("timelock")
}

pub fn spell_address() -> Address {
    Address::from_label("spell-3.0.0")
}

pub fn approver(i: usize) -> Address {
    Address::from_label(&format!("approver-{}", i))
}

pub fn bidder(i: usize) -> Address {
    Address::from_label(&format!("bidder-{}", i))
}

/// Fund at `version` with WETH inventory, funded bidders and one trade approver
pub fn funded_vault(version: &str) -> Vault {
    let mut vault = Vault::new(fund(), timelock(), version).expect("valid fund setup");
    for token in [WETH, USDC, DAI] {
        vault.add_token(token, TransferMode::Reverting).expect("fresh token");
    }
    vault.mint(WETH, fund(), FUND_WETH).expect("mint fund inventory");
    for i in 0..BIDDERS {
        vault.mint(USDC, bidder(i), BIDDER_FLOAT).expect("mint bidder USDC");
        vault.mint(DAI, bidder(i), BIDDER_FLOAT).expect("mint bidder DAI");
    }
    let role = vault.trade_approval_role();
    vault.grant_role(timelock(), role, approver(0)).expect("grant approver");
    vault
}

/// Open a WETH -> USDC trade claimed by `bidder`
pub fn open_trade(vault: &mut Vault, bidder: Address, sell_amount: Amount, min_buy_amount: Amount) -> TradeId {
    vault
        .open_trade(
            approver(0),
            Trade {
                sell_token: WETH,
                buy_token: USDC,
                sell_amount,
                min_buy_amount,
                bidder,
            },
        )
        .expect("trade opens")
}

/// Fund at version 2 whose AUCTION_APPROVER role has `approvers` members
pub fn legacy_vault(approvers: usize) -> Vault {
    let mut vault = Vault::new(fund(), timelock(), "2.1.0").expect("valid fund setup");
    for i in 0..approvers {
        vault
            .grant_role(timelock(), Role::AUCTION_APPROVER, approver(i))
            .expect("grant approver");
    }
    vault
}

pub fn default_spell() -> MigrationSpell {
    MigrationSpell::new(spell_address(), MigrationPlan::default()).expect("valid plan")
}

/// Governance action that precedes a cast: admin role + proxy ownership
pub fn authorize_spell(vault: &mut Vault, spell: &MigrationSpell) {
    vault
        .grant_role(timelock(), Role::ADMIN, spell.address())
        .expect("grant spell admin");
    vault
        .transfer_proxy_ownership(timelock(), spell.address())
        .expect("hand proxy to spell");
}
