//! Basket fund: holdings, governance roles and bid settlement
//!
//! This crate models the fund's trust boundary:
//! 1. Untrusted bidders settle rebalancing trades through an atomic
//!    callback handshake (`settlement`)
//! 2. A role registry and a proxy admin hold administrative control
//!    (`roles`, `proxy_admin`)
//!
//! All state lives in a [`Vault`], whose `transact` gives every entry point
//! all-or-nothing semantics.

#![forbid(unsafe_code)]

pub mod bidder;
pub mod bidders;
pub mod error;
pub mod proxy_admin;
pub mod roles;
pub mod settlement;
pub mod token;
pub mod vault;

pub use bidder::{Bidder, BidderContext};
pub use error::*;
pub use settlement::{verify_delivery, Settlement, Trade, TradeStatus};
pub use token::{TransferMode, ValueTransfer};
pub use vault::{major_version, Checkpoint, Vault};

pub use basket_common::{Address, Amount, Role, TokenId, TradeId};
