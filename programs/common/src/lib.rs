//! Shared identifiers and amount math for the basket fund programs
//!
//! Everything in here is plain data: no ledger access, no logging. The fund and
//! spell programs build on these types so that addresses, token ids and role
//! tags mean the same thing on both sides of a migration.

#![forbid(unsafe_code)]

pub mod ids;
pub mod math;

pub use ids::*;
pub use math::*;
