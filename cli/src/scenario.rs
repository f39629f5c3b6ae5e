//! Scenario execution
//!
//! # Process
//! 1. Build the fund: tokens, balances and role grants from the config
//! 2. Optionally cast the migration spell (`before_trades`)
//! 3. Open every trade, then settle them in order with the configured bidder
//! 4. Cast the migration spell if it was not cast in step 2
//! 5. Summarize the fund's final state
//!
//! Setup failures abort the run. Failed trades and a failed cast are part
//! of the report.

use anyhow::{Context, Result};
use basket_common::{Address, Amount, Role, TradeId};
use basket_fund::bidders::{
    DishonestBidder, DonatingBidder, FailingBidder, HonestBidder, ReentrantBidder,
};
use basket_fund::{Bidder, Trade, Vault};
use basket_spell::{MigrationPlan, MigrationSpell};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{self, BidderBehavior, MigrationConfig, ScenarioConfig, TradeConfig};

// ============================================================================
// Report Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub initial_version: String,
    pub trades: Vec<TradeOutcome>,
    pub migration: Option<MigrationOutcome>,
    pub fund: FundSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    /// Never recorded (open_trade rejected it)
    Rejected,
    /// Settlement reverted; the ledger is unchanged
    Reverted,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeOutcome {
    pub index: usize,
    pub trade_id: Option<u64>,
    pub bidder: String,
    pub behavior: &'static str,
    pub sell: String,
    pub buy: String,
    pub sell_amount: Amount,
    pub min_buy: Amount,
    pub result: TradeResult,
    pub delivered: Option<Amount>,
    pub error: Option<String>,
    /// What the bidder observed from inside its callback
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub spell: String,
    pub caller: String,
    pub cast: bool,
    pub from_version: String,
    pub to_version: String,
    pub migrated_members: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundSummary {
    pub address: String,
    pub version: String,
    pub trade_approval_role: String,
    pub proxy_owner: String,
    pub holdings: BTreeMap<String, Amount>,
    pub roles: BTreeMap<String, Vec<String>>,
}

// ============================================================================
// Runner
// ============================================================================

pub fn run(config: &ScenarioConfig) -> Result<ScenarioReport> {
    let mut vault = build_vault(config)?;
    let admin = config::address(&config.fund.admin)?;
    let mut migration = None;

    if let Some(plan) = config.migration.as_ref().filter(|m| m.before_trades) {
        migration = Some(cast_spell(&mut vault, admin, plan)?);
    }

    let trades = run_trades(&mut vault, &config.trades)?;

    if let Some(plan) = config.migration.as_ref().filter(|m| !m.before_trades) {
        migration = Some(cast_spell(&mut vault, admin, plan)?);
    }

    Ok(ScenarioReport {
        initial_version: config.fund.version.clone(),
        trades,
        migration,
        fund: summarize(&vault),
    })
}

fn build_vault(config: &ScenarioConfig) -> Result<Vault> {
    let fund = config::address(&config.fund.address)?;
    let admin = config::address(&config.fund.admin)?;
    let mut vault = Vault::new(fund, admin, config.fund.version.clone()).context("Failed to create fund")?;

    for token in &config.tokens {
        let id = config::token_id(&token.symbol)?;
        vault
            .add_token(id, token.mode.into())
            .with_context(|| format!("Failed to add token {}", token.symbol))?;
    }

    for balance in &config.balances {
        let holder = config::address(&balance.holder)?;
        let token = config::token_id(&balance.token)?;
        vault
            .mint(token, holder, Amount::from(balance.amount))
            .with_context(|| format!("Failed to mint {} {} for {}", balance.amount, balance.token, balance.holder))?;
    }

    for grant in &config.roles {
        let role = config::role(&grant.role)?;
        let member = config::address(&grant.member)?;
        vault
            .grant_role(admin, role, member)
            .with_context(|| format!("Failed to grant {} to {}", grant.role, grant.member))?;
    }

    debug!(
        "Fund {} built at version {} with {} token(s)",
        fund,
        vault.version(),
        vault.tokens().count()
    );
    Ok(vault)
}

fn run_trades(vault: &mut Vault, trades: &[TradeConfig]) -> Result<Vec<TradeOutcome>> {
    let mut outcomes = Vec::with_capacity(trades.len());
    let mut ids = Vec::with_capacity(trades.len());

    for (index, trade) in trades.iter().enumerate() {
        let request = Trade {
            sell_token: config::token_id(&trade.sell)?,
            buy_token: config::token_id(&trade.buy)?,
            sell_amount: Amount::from(trade.sell_amount),
            min_buy_amount: Amount::from(trade.min_buy),
            bidder: config::address(&trade.bidder)?,
        };
        let approver = config::address(&trade.approver)?;

        let mut outcome = TradeOutcome {
            index,
            trade_id: None,
            bidder: trade.bidder.clone(),
            behavior: trade.behavior.name(),
            sell: trade.sell.clone(),
            buy: trade.buy.clone(),
            sell_amount: request.sell_amount,
            min_buy: request.min_buy_amount,
            result: TradeResult::Rejected,
            delivered: None,
            error: None,
            note: None,
        };
        match vault.open_trade(approver, request) {
            Ok(id) => {
                outcome.trade_id = Some(id.0);
                ids.push(Some(id));
            }
            Err(e) => {
                outcome.error = Some(e.to_string());
                ids.push(None);
            }
        }
        outcomes.push(outcome);
    }

    for (outcome, trade) in outcomes.iter_mut().zip(trades) {
        let Some(id) = outcome.trade_id.map(TradeId) else {
            continue;
        };
        let address = config::address(&trade.bidder)?;
        let mut bidder = ScenarioBidder::new(&trade.behavior, address, &ids)?;

        match vault.settle(id, bidder.as_bidder(), &[]) {
            Ok(receipt) => {
                outcome.result = TradeResult::Settled;
                outcome.delivered = Some(receipt.delivered);
            }
            Err(e) => {
                outcome.result = TradeResult::Reverted;
                outcome.error = Some(e.to_string());
            }
        }
        outcome.note = bidder.note();
    }

    Ok(outcomes)
}

fn cast_spell(vault: &mut Vault, admin: Address, plan: &MigrationConfig) -> Result<MigrationOutcome> {
    let spell_address = config::address(&plan.spell)?;
    let migration_plan = MigrationPlan {
        target_version: plan.target_version.clone(),
        source_role: config::role(&plan.source_role)?,
        destination_role: config::role(&plan.destination_role)?,
    };
    let mut spell = MigrationSpell::new(spell_address, migration_plan).context("Invalid migration plan")?;

    if plan.authorize {
        vault
            .grant_role(admin, Role::ADMIN, spell_address)
            .context("Failed to grant the spell the admin role")?;
        vault
            .transfer_proxy_ownership(admin, spell_address)
            .context("Failed to hand proxy ownership to the spell")?;
        info!("Spell {} authorized by {}", spell_address, admin);
    }

    let caller = match &plan.caller {
        Some(label) => config::address(label)?,
        None => admin,
    };
    let from_version = vault.version().to_string();

    let outcome = match spell.cast(vault, caller) {
        Ok(receipt) => MigrationOutcome {
            spell: plan.spell.clone(),
            caller: caller.to_string(),
            cast: true,
            from_version: receipt.from_version,
            to_version: receipt.to_version,
            migrated_members: receipt.migrated_members.iter().map(Address::to_string).collect(),
            error: None,
        },
        Err(e) => MigrationOutcome {
            spell: plan.spell.clone(),
            caller: caller.to_string(),
            cast: false,
            to_version: from_version.clone(),
            from_version,
            migrated_members: Vec::new(),
            error: Some(e.to_string()),
        },
    };
    Ok(outcome)
}

fn summarize(vault: &Vault) -> FundSummary {
    let holdings = vault
        .tokens()
        .map(|token| (token.to_string(), vault.fund_balance(token).unwrap_or(0)))
        .collect();
    let roles = vault
        .roles()
        .roles()
        .map(|role| {
            let members = vault.role_members(role).iter().map(Address::to_string).collect();
            (role.to_string(), members)
        })
        .collect();

    FundSummary {
        address: vault.fund_address().to_string(),
        version: vault.version().to_string(),
        trade_approval_role: vault.trade_approval_role().to_string(),
        proxy_owner: vault.proxy_owner().to_string(),
        holdings,
        roles,
    }
}

// ============================================================================
// Bidders
// ============================================================================

/// Reference bidder chosen by a scenario, kept concrete so its
/// observations can be reported after settlement
enum ScenarioBidder {
    Honest(HonestBidder),
    Dishonest(DishonestBidder),
    Donating(DonatingBidder),
    Reentrant(ReentrantBidder),
    Failing(FailingBidder),
}

impl ScenarioBidder {
    fn new(behavior: &BidderBehavior, address: Address, ids: &[Option<TradeId>]) -> Result<Self> {
        let bidder = match behavior {
            BidderBehavior::Honest => Self::Honest(HonestBidder::new(address)),
            BidderBehavior::Dishonest { delivers } => {
                Self::Dishonest(DishonestBidder::new(address, Amount::from(*delivers)))
            }
            BidderBehavior::Donating { token, amount, delivers } => {
                let mut bidder = DonatingBidder::new(address, config::token_id(token)?, Amount::from(*amount));
                if let Some(delivers) = delivers {
                    bidder = bidder.delivering(Amount::from(*delivers));
                }
                Self::Donating(bidder)
            }
            BidderBehavior::Reentrant { target, also_deliver, posing_as } => {
                // A target that was never opened still exercises the guard
                let id = usize::try_from(*target)
                    .ok()
                    .and_then(|i| ids.get(i).copied().flatten())
                    .unwrap_or(TradeId(*target));
                let mut bidder = ReentrantBidder::new(address, id);
                if *also_deliver {
                    bidder = bidder.also_delivering();
                }
                if let Some(label) = posing_as {
                    bidder = bidder.posing_as(config::address(label)?);
                }
                Self::Reentrant(bidder)
            }
            BidderBehavior::Failing { reason } => Self::Failing(FailingBidder::new(address, reason.clone())),
        };
        Ok(bidder)
    }

    fn as_bidder(&mut self) -> &mut dyn Bidder {
        match self {
            Self::Honest(b) => b,
            Self::Dishonest(b) => b,
            Self::Donating(b) => b,
            Self::Reentrant(b) => b,
            Self::Failing(b) => b,
        }
    }

    fn note(&self) -> Option<String> {
        match self {
            Self::Reentrant(b) => b.nested.as_ref().map(|nested| match nested {
                Ok(receipt) => format!("nested settlement of {} succeeded", receipt.trade_id),
                Err(e) => format!("nested settlement rejected: {}", e),
            }),
            _ => None,
        }
    }
}
