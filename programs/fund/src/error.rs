//! Error types for the fund program
//!
//! Every variant aborts the enclosing transaction. None of them are retried
//! internally; the caller decides whether to resubmit.

use basket_common::{Address, Amount, Role, TokenId, TradeId};
use thiserror::Error;

/// Value-transfer failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("unknown token {0}")]
    UnknownToken(TokenId),

    #[error("token {0} is already registered")]
    DuplicateToken(TokenId),

    #[error("{holder} holds {balance} {token}, needs {needed}")]
    InsufficientBalance {
        token: TokenId,
        holder: Address,
        balance: Amount,
        needed: Amount,
    },

    #[error("balance overflow on {0}")]
    Overflow(TokenId),

    #[error("{caller} may not move {token} held in fund custody")]
    Custody { caller: Address, token: TokenId },
}

/// Role registry failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    #[error("{caller} lacks {role}")]
    Unauthorized { caller: Address, role: Role },

    #[error("the zero address cannot hold a role")]
    InvalidMember,

    #[error("refusing to remove the last admin")]
    LastAdmin,
}

/// Proxy admin failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyAdminError {
    #[error("{caller} is not the proxy admin owner")]
    Unauthorized { caller: Address },

    #[error("proxy admin owner must be a non-zero address")]
    InvalidOwner,

    #[error("fund version must not be empty")]
    InvalidVersion,
}

/// Trade recording failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error("{caller} lacks {role}, required to approve trades")]
    Unauthorized { caller: Address, role: Role },

    #[error("invalid trade: {0}")]
    InvalidTrade(&'static str),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("trades cannot be opened while trade {0} is settling")]
    Reentrant(TradeId),
}

/// Failure reported by a bidder callback
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("bidder rejected the callback: {0}")]
    Rejected(String),

    #[error("bidder delivery failed: {0}")]
    Delivery(#[from] TokenError),
}

/// Settlement failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("{caller} is not the bidder that claimed trade {trade}")]
    Unauthorized { caller: Address, trade: TradeId },

    #[error("trade {trade} delivered {delivered} {token}, required {required}")]
    SettlementShortfall {
        trade: TradeId,
        token: TokenId,
        required: Amount,
        delivered: Amount,
    },

    #[error("trade {0} already settled")]
    AlreadySettled(TradeId),

    #[error("unknown trade {0}")]
    UnknownTrade(TradeId),

    #[error("reentrant settlement rejected while trade {0} is settling")]
    Reentrant(TradeId),

    #[error("transfer of {token} failed")]
    TransferFailed { token: TokenId },

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Callback(#[from] CallbackError),
}

/// Ledger setup failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("invalid fund setup: {0}")]
    InvalidSetup(&'static str),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    ProxyAdmin(#[from] ProxyAdminError),
}
