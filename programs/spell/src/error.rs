//! Migration errors

use basket_common::Address;
use basket_fund::{ProxyAdminError, RoleError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("{caller} may not cast: {reason}")]
    Unauthorized { caller: Address, reason: &'static str },

    #[error("spell already cast")]
    AlreadyCast,

    #[error("fund is already at version {0}")]
    AlreadyMigrated(String),

    #[error("migration invariant violated: {0}")]
    InvariantViolation(&'static str),

    #[error("invalid migration plan: {0}")]
    InvalidPlan(&'static str),

    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    ProxyAdmin(#[from] ProxyAdminError),
}
