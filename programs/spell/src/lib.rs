//! Migration spell: one-shot transfer of fund governance through an upgrade
//!
//! Governance first hands the spell the fund's admin role and the proxy admin
//! ownership. Casting then bumps the fund version, copies one role's members
//! into another, and hands every privilege back to the caller, all inside a
//! single transaction. A spell can be cast once.

#![forbid(unsafe_code)]

pub mod error;
pub mod spell;

pub use error::MigrationError;
pub use spell::{MigrationPlan, MigrationReceipt, MigrationSpell, SpellState, SpellStatus};
