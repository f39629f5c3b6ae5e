//! Transactional ledger holding the fund, its tokens and its proxy admin
//!
//! A `Vault` is the whole world a settlement or migration can touch. Every
//! state-changing entry point runs inside [`Vault::transact`], which takes a
//! checkpoint of the ledger and restores it if the operation fails. Calls made
//! from inside a bidder callback nest their own checkpoints, so a failed
//! inner call rolls back only itself while a failed outer call rolls back
//! everything, inner effects included.

use basket_common::{Address, Amount, Role, TokenId, TradeId};
use log::{trace, warn};
use std::collections::BTreeMap;

use crate::error::{ProxyAdminError, RoleError, TokenError, VaultError};
use crate::proxy_admin::ProxyAdmin;
use crate::roles::RoleRegistry;
use crate::settlement::TradeSlot;
use crate::token::{TokenBook, TransferMode, ValueTransfer};

/// First major version in which `REBALANCE_MANAGER` approves trades
pub const REBALANCE_MANAGER_SINCE_MAJOR: u64 = 3;

// ============================================================================
// State
// ============================================================================

/// Fund-owned state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundState {
    pub address: Address,
    pub version: String,
    pub roles: RoleRegistry,
    pub trades: BTreeMap<TradeId, TradeSlot>,
    pub next_trade_id: u64,
    /// Trade whose bidder callback is currently running
    pub settling: Option<TradeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct LedgerState {
    tokens: TokenBook,
    fund: FundState,
    proxy_admin: ProxyAdmin,
}

/// Full copy of the ledger, comparable for "nothing changed" checks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint(LedgerState);

pub struct Vault {
    state: LedgerState,
    depth: u32,
}

// ============================================================================
// Construction & Transactions
// ============================================================================

impl Vault {
    /// New fund at `version` governed by `admin`
    ///
    /// `admin` becomes the only member of `Role::ADMIN` and the proxy admin owner.
    pub fn new(fund: Address, admin: Address, version: impl Into<String>) -> Result<Self, VaultError> {
        if fund.is_zero() {
            return Err(VaultError::InvalidSetup("fund address must be non-zero"));
        }
        if fund == admin {
            return Err(VaultError::InvalidSetup("fund cannot administer itself"));
        }
        let version = version.into();
        if version.is_empty() {
            return Err(ProxyAdminError::InvalidVersion.into());
        }

        Ok(Self {
            state: LedgerState {
                tokens: TokenBook::default(),
                fund: FundState {
                    address: fund,
                    version,
                    roles: RoleRegistry::with_admin(admin)?,
                    trades: BTreeMap::new(),
                    next_trade_id: 0,
                    settling: None,
                },
                proxy_admin: ProxyAdmin::new(admin)?,
            },
            depth: 0,
        })
    }

    /// Run `f` as one all-or-nothing transaction
    ///
    /// On `Err` every ledger write made by `f` (including writes made by
    /// nested calls that succeeded) is discarded.
    pub fn transact<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let checkpoint = self.checkpoint();
        self.depth += 1;
        trace!("checkpoint taken at depth {}", self.depth);

        let result = f(self);

        self.depth -= 1;
        if result.is_err() {
            trace!("rolling back to checkpoint at depth {}", self.depth + 1);
            self.state = checkpoint.0;
        }
        result
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.state.clone())
    }

    /// Number of transactions currently open (0 outside any call)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub(crate) fn fund_state(&self) -> &FundState {
        &self.state.fund
    }

    pub(crate) fn fund_state_mut(&mut self) -> &mut FundState {
        &mut self.state.fund
    }
}

// ============================================================================
// Fund Identity
// ============================================================================

impl Vault {
    pub fn fund_address(&self) -> Address {
        self.state.fund.address
    }

    pub fn version(&self) -> &str {
        &self.state.fund.version
    }

    /// Role whose members may open trades at the current version
    pub fn trade_approval_role(&self) -> Role {
        match major_version(self.version()) {
            Some(major) if major >= REBALANCE_MANAGER_SINCE_MAJOR => Role::REBALANCE_MANAGER,
            _ => Role::AUCTION_APPROVER,
        }
    }
}

/// Leading numeric component of a version string ("2.1.0" -> 2)
pub fn major_version(version: &str) -> Option<u64> {
    version
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
}

// ============================================================================
// Tokens
// ============================================================================

impl Vault {
    pub fn add_token(&mut self, id: TokenId, mode: TransferMode) -> Result<(), TokenError> {
        self.state.tokens.register(id, mode)
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.state.tokens.ids()
    }

    /// Ledger bootstrap: create `amount` of `token` for `to`
    pub fn mint(&mut self, token: TokenId, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.state.tokens.get_mut(token)?.mint(&to, amount)
    }

    pub fn balance_of(&self, token: TokenId, holder: Address) -> Result<Amount, TokenError> {
        Ok(self.state.tokens.get(token)?.balance_of(&holder))
    }

    pub fn fund_balance(&self, token: TokenId) -> Result<Amount, TokenError> {
        self.balance_of(token, self.state.fund.address)
    }

    /// Counterparty transfer of the caller's own balance
    ///
    /// Fund holdings only leave through fund operations; naming the fund as
    /// `caller` here is rejected.
    pub fn transfer(
        &mut self,
        caller: Address,
        token: TokenId,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        if caller == self.state.fund.address {
            warn!("Error: external transfer out of fund custody rejected");
            return Err(TokenError::Custody { caller, token });
        }
        self.state.tokens.get_mut(token)?.transfer(&caller, &to, amount)
    }

    /// Transfer out of the fund's own balance
    pub(crate) fn transfer_from_fund(
        &mut self,
        token: TokenId,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        let fund = self.state.fund.address;
        self.state.tokens.get_mut(token)?.transfer(&fund, &to, amount)
    }
}

// ============================================================================
// Roles
// ============================================================================

impl Vault {
    pub fn has_role(&self, role: Role, who: Address) -> bool {
        self.state.fund.roles.has_role(role, &who)
    }

    pub fn role_member_count(&self, role: Role) -> usize {
        self.state.fund.roles.member_count(role)
    }

    pub fn role_member(&self, role: Role, index: usize) -> Option<Address> {
        self.state.fund.roles.member(role, index)
    }

    pub fn role_members(&self, role: Role) -> Vec<Address> {
        self.state.fund.roles.members(role)
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.state.fund.roles
    }

    pub fn grant_role(&mut self, caller: Address, role: Role, who: Address) -> Result<bool, RoleError> {
        self.state.fund.roles.grant_role(&caller, role, who)
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, who: Address) -> Result<bool, RoleError> {
        self.state.fund.roles.revoke_role(&caller, role, &who)
    }

    pub fn renounce_role(&mut self, caller: Address, role: Role) -> Result<bool, RoleError> {
        self.state.fund.roles.renounce_role(&caller, role)
    }
}

// ============================================================================
// Proxy Admin
// ============================================================================

impl Vault {
    pub fn proxy_owner(&self) -> Address {
        self.state.proxy_admin.owner()
    }

    pub fn transfer_proxy_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), ProxyAdminError> {
        self.state.proxy_admin.transfer_ownership(&caller, new_owner)
    }

    /// Upgrade the fund to `version`. Proxy admin owner only.
    pub fn upgrade_fund(&mut self, caller: Address, version: &str) -> Result<(), ProxyAdminError> {
        self.state.proxy_admin.ensure_owner(&caller)?;
        if version.is_empty() {
            return Err(ProxyAdminError::InvalidVersion);
        }
        self.state.fund.version = version.to_string();
        Ok(())
    }
}
