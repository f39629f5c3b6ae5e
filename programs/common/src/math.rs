//! Amount math
//!
//! Balances are `u128` token base units. Everything here is checked: an
//! overflow or underflow is reported to the caller, never wrapped.

/// Token amount in base units
pub type Amount = u128;

/// Add `amount` to `balance`, `None` on overflow
#[inline]
pub fn credit(balance: Amount, amount: Amount) -> Option<Amount> {
    balance.checked_add(amount)
}

/// Subtract `amount` from `balance`, `None` if the balance is too small
#[inline]
pub fn debit(balance: Amount, amount: Amount) -> Option<Amount> {
    balance.checked_sub(amount)
}

/// Increase from `before` to `after`
///
/// Returns 0 when the balance went down: a decrease never counts as delivery.
#[inline]
pub fn balance_increase(before: Amount, after: Amount) -> Amount {
    after.saturating_sub(before)
}

/// Whether the observed balance change delivers at least `required`
#[inline]
pub fn delivers_at_least(before: Amount, after: Amount, required: Amount) -> bool {
    after >= before && balance_increase(before, after) >= required
}


// ═══════════════════════════════════════════════════════════════
// KANI FORMAL VERIFICATION PROOFS
// ═══════════════════════════════════════════════════════════════

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// A1: Delivery check accepts exactly the balances that grew by `required`
    #[kani::proof]
    fn a1_delivery_check_exact() {
        let before: u128 = kani::any();
        let after: u128 = kani::any();
        let required: u128 = kani::any();

        let ok = delivers_at_least(before, after, required);

        if ok {
            assert!(after >= before, "A1: Accepted delivery never shrinks the balance");
            assert!(after - before >= required, "A1: Accepted delivery covers the requirement");
        } else {
            assert!(after < before || after - before < required, "A1: Rejection implies shortfall");
        }
    }

    /// A2: credit then debit of the same amount restores the balance
    #[kani::proof]
    fn a2_credit_debit_inverse() {
        let balance: u128 = kani::any();
        let amount: u128 = kani::any();

        if let Some(up) = credit(balance, amount) {
            assert!(debit(up, amount) == Some(balance), "A2: Debit undoes credit");
        }
    }
}
