//! Value-transfer capability
//!
//! The fund treats tokens as opaque: it can ask for a balance and it can ask
//! for a transfer. A transfer either succeeds, reverts (`Err`), or reports
//! failure by returning `Ok(false)`. Callers in this crate treat the last two
//! identically.

use basket_common::{credit, debit, Address, Amount, TokenId};
use std::collections::BTreeMap;

use crate::error::TokenError;

/// Opaque token interface consumed by the settlement engine
pub trait ValueTransfer {
    /// Balance held by `holder`
    fn balance_of(&self, holder: &Address) -> Amount;

    /// Move `amount` from `from` to `to`
    ///
    /// # Returns
    /// * `Ok(true)` if the transfer happened
    /// * `Ok(false)` if the token declined without reverting
    /// * `Err(TokenError)` if the token reverted
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<bool, TokenError>;
}

/// How a token reports a transfer it cannot perform
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Reverts on insufficient balance
    #[default]
    Reverting,
    /// Returns `false` on insufficient balance
    ReturnsFalse,
    /// Returns `false` for every transfer
    Frozen,
}

/// In-ledger token with per-holder balances
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub id: TokenId,
    pub mode: TransferMode,
    balances: BTreeMap<Address, Amount>,
    total_supply: Amount,
}

impl Token {
    pub fn new(id: TokenId, mode: TransferMode) -> Self {
        Self {
            id,
            mode,
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Create `amount` new units for `to`
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let supply = credit(self.total_supply, amount).ok_or(TokenError::Overflow(self.id))?;
        let balance = credit(self.balance_of(to), amount).ok_or(TokenError::Overflow(self.id))?;
        self.total_supply = supply;
        self.set_balance(to, balance);
        Ok(())
    }

    fn set_balance(&mut self, holder: &Address, amount: Amount) {
        if amount == 0 {
            self.balances.remove(holder);
        } else {
            self.balances.insert(*holder, amount);
        }
    }
}

impl ValueTransfer for Token {
    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<bool, TokenError> {
        if self.mode == TransferMode::Frozen {
            return Ok(false);
        }

        let from_balance = self.balance_of(from);
        let Some(new_from) = debit(from_balance, amount) else {
            return match self.mode {
                TransferMode::ReturnsFalse => Ok(false),
                _ => Err(TokenError::InsufficientBalance {
                    token: self.id,
                    holder: *from,
                    balance: from_balance,
                    needed: amount,
                }),
            };
        };

        if amount == 0 || from == to {
            return Ok(true);
        }

        // Both sides are computed before either is written
        let new_to = credit(self.balance_of(to), amount).ok_or(TokenError::Overflow(self.id))?;
        self.set_balance(from, new_from);
        self.set_balance(to, new_to);
        Ok(true)
    }
}

/// Every token known to the ledger
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenBook {
    tokens: BTreeMap<TokenId, Token>,
}

impl TokenBook {
    pub fn register(&mut self, id: TokenId, mode: TransferMode) -> Result<(), TokenError> {
        if self.tokens.contains_key(&id) {
            return Err(TokenError::DuplicateToken(id));
        }
        self.tokens.insert(id, Token::new(id, mode));
        Ok(())
    }

    pub fn get(&self, id: TokenId) -> Result<&Token, TokenError> {
        self.tokens.get(&id).ok_or(TokenError::UnknownToken(id))
    }

    pub fn get_mut(&mut self, id: TokenId) -> Result<&mut Token, TokenError> {
        self.tokens.get_mut(&id).ok_or(TokenError::UnknownToken(id))
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.tokens.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.tokens.keys().copied()
    }
}
