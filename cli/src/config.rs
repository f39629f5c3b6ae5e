//! Scenario files
//!
//! A scenario describes a fund (version, governance, tokens, balances,
//! roles), a list of trades to open and settle, and an optional migration.
//! Participants are named by labels; each label maps to a fixed address.

use anyhow::{Context, Result};
use basket_common::{Address, Role, TokenId};
use basket_fund::TransferMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Scenario printed by `basket template`
pub const TEMPLATE: &str = r#"# Basket fund scenario

[fund]
address = "fund"
admin = "timelock"
version = "2.1.0"

[[tokens]]
symbol = "WETH"

[[tokens]]
symbol = "USDC"

[[tokens]]
symbol = "DAI"
mode = "returns-false"

[[balances]]
holder = "fund"
token = "WETH"
amount = 1000

[[balances]]
holder = "alice"
token = "USDC"
amount = 1000000

[[balances]]
holder = "mallory"
token = "USDC"
amount = 1000000

[[balances]]
holder = "mallory"
token = "DAI"
amount = 1000000

[[roles]]
role = "AUCTION_APPROVER"
member = "approver-1"

[[roles]]
role = "AUCTION_APPROVER"
member = "approver-2"

# Honest settlement
[[trades]]
approver = "approver-1"
sell = "WETH"
buy = "USDC"
sell_amount = 10
min_buy = 25000
bidder = "alice"

# Pays in the wrong token; reverts
[[trades]]
approver = "approver-1"
sell = "WETH"
buy = "USDC"
sell_amount = 10
min_buy = 25000
bidder = "mallory"
behavior = { kind = "donating", token = "DAI", amount = 25000, delivers = 0 }

# Tries to settle trade 0 from inside its callback; reverts
[[trades]]
approver = "approver-2"
sell = "WETH"
buy = "USDC"
sell_amount = 5
min_buy = 12000
bidder = "mallory"
behavior = { kind = "reentrant", target = 0 }

[migration]
spell = "spell-3.0.0"
target_version = "3.0.0"
source_role = "AUCTION_APPROVER"
destination_role = "REBALANCE_MANAGER"
authorize = true
"#;

// ============================================================================
// Scenario Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub fund: FundConfig,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    #[serde(default)]
    pub balances: Vec<BalanceConfig>,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
    #[serde(default)]
    pub trades: Vec<TradeConfig>,
    #[serde(default)]
    pub migration: Option<MigrationConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FundConfig {
    #[serde(default = "default_fund")]
    pub address: String,
    /// Initial single admin and proxy admin owner
    #[serde(default = "default_admin")]
    pub admin: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub symbol: String,
    #[serde(default)]
    pub mode: TokenMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenMode {
    #[default]
    Reverting,
    ReturnsFalse,
    Frozen,
}

impl From<TokenMode> for TransferMode {
    fn from(mode: TokenMode) -> Self {
        match mode {
            TokenMode::Reverting => TransferMode::Reverting,
            TokenMode::ReturnsFalse => TransferMode::ReturnsFalse,
            TokenMode::Frozen => TransferMode::Frozen,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BalanceConfig {
    pub holder: String,
    pub token: String,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleGrant {
    pub role: String,
    pub member: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradeConfig {
    /// Holder of the trade approval role that opens the trade
    pub approver: String,
    pub sell: String,
    pub buy: String,
    pub sell_amount: u64,
    pub min_buy: u64,
    pub bidder: String,
    #[serde(default)]
    pub behavior: BidderBehavior,
}

/// How the bidder answers the settlement callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BidderBehavior {
    #[default]
    Honest,
    Dishonest {
        delivers: u64,
    },
    Donating {
        token: String,
        amount: u64,
        delivers: Option<u64>,
    },
    /// Settles trade `target` (scenario index) from inside the callback,
    /// optionally with an inner bidder acting as `posing_as`
    Reentrant {
        target: u64,
        #[serde(default)]
        also_deliver: bool,
        #[serde(default)]
        posing_as: Option<String>,
    },
    Failing {
        reason: String,
    },
}

impl BidderBehavior {
    pub fn name(&self) -> &'static str {
        match self {
            BidderBehavior::Honest => "honest",
            BidderBehavior::Dishonest { .. } => "dishonest",
            BidderBehavior::Donating { .. } => "donating",
            BidderBehavior::Reentrant { .. } => "reentrant",
            BidderBehavior::Failing { .. } => "failing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    #[serde(default = "default_spell")]
    pub spell: String,
    #[serde(default = "default_target_version")]
    pub target_version: String,
    #[serde(default = "default_source_role")]
    pub source_role: String,
    #[serde(default = "default_destination_role")]
    pub destination_role: String,
    /// Grant the spell admin + proxy ownership before casting
    #[serde(default = "default_true")]
    pub authorize: bool,
    /// Defaults to the fund admin
    #[serde(default)]
    pub caller: Option<String>,
    /// Cast before the trades are opened instead of after
    #[serde(default)]
    pub before_trades: bool,
}

fn default_fund() -> String {
    "fund".to_string()
}

fn default_admin() -> String {
    "timelock".to_string()
}

fn default_spell() -> String {
    "spell".to_string()
}

fn default_target_version() -> String {
    basket_spell::spell::TARGET_VERSION.to_string()
}

fn default_source_role() -> String {
    Role::AUCTION_APPROVER.name().to_string()
}

fn default_destination_role() -> String {
    Role::REBALANCE_MANAGER.name().to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Loading & Resolution
// ============================================================================

/// Name that does not resolve to a ledger identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("label {0:?} must be 1-32 printable ASCII characters")]
    BadLabel(String),

    #[error("token symbol {0:?} must be 1-8 printable ASCII characters")]
    BadSymbol(String),

    #[error("unknown role {0:?} (known: ADMIN, REBALANCE_MANAGER, AUCTION_APPROVER, AUCTION_LAUNCHER, BRAND_MANAGER)")]
    UnknownRole(String),
}

pub fn load(path: &Path) -> Result<ScenarioConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
    parse(&data).with_context(|| format!("Invalid scenario: {}", path.display()))
}

pub fn parse(data: &str) -> Result<ScenarioConfig> {
    let config: ScenarioConfig = toml::from_str(data).context("Failed to parse scenario TOML")?;
    config.validate()?;
    Ok(config)
}

impl ScenarioConfig {
    /// Check every label, symbol and role name before anything runs
    pub fn validate(&self) -> Result<(), ResolveError> {
        address(&self.fund.address)?;
        address(&self.fund.admin)?;
        for token in &self.tokens {
            token_id(&token.symbol)?;
        }
        for balance in &self.balances {
            address(&balance.holder)?;
            token_id(&balance.token)?;
        }
        for grant in &self.roles {
            role(&grant.role)?;
            address(&grant.member)?;
        }
        for trade in &self.trades {
            address(&trade.approver)?;
            address(&trade.bidder)?;
            token_id(&trade.sell)?;
            token_id(&trade.buy)?;
            if let BidderBehavior::Donating { token, .. } = &trade.behavior {
                token_id(token)?;
            }
        }
        if let Some(migration) = &self.migration {
            address(&migration.spell)?;
            role(&migration.source_role)?;
            role(&migration.destination_role)?;
            if let Some(caller) = &migration.caller {
                address(caller)?;
            }
        }
        Ok(())
    }
}

pub fn address(label: &str) -> Result<Address, ResolveError> {
    if label.is_empty() || label.len() > 32 || !label.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(ResolveError::BadLabel(label.to_string()));
    }
    Ok(Address::from_label(label))
}

pub fn token_id(symbol: &str) -> Result<TokenId, ResolveError> {
    if symbol.is_empty() || symbol.len() > 8 || !symbol.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(ResolveError::BadSymbol(symbol.to_string()));
    }
    Ok(TokenId::from_symbol(symbol))
}

pub fn role(name: &str) -> Result<Role, ResolveError> {
    Role::from_name(name).ok_or_else(|| ResolveError::UnknownRole(name.to_string()))
}
