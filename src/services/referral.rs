//! Referral earnings formula
//!
//! One rounding rule for the whole codebase: half-up to cents.

use crate::models::ReferralType;

const SIGNUP_BONUS: f64 = 5.0;
const SUBSCRIPTION_COMMISSION_RATE: f64 = 0.20;
const DEPOSIT_BONUS_RATE: f64 = 0.05;

/// Round a money amount half-up to cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Earnings credited to a referrer for one referral event. The signup bonus is
/// flat; commissions scale with the triggering amount.
pub fn earnings(earnings_type: ReferralType, amount: f64) -> f64 {
    match earnings_type {
        ReferralType::SignupBonus => SIGNUP_BONUS,
        ReferralType::SubscriptionCommission => round_cents(amount * SUBSCRIPTION_COMMISSION_RATE),
        ReferralType::DepositBonus => round_cents(amount * DEPOSIT_BONUS_RATE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_bonus_is_flat_regardless_of_amount() {
        assert_eq!(earnings(ReferralType::SignupBonus, 0.0), 5.0);
        assert_eq!(earnings(ReferralType::SignupBonus, 1000.0), 5.0);
    }

    #[test]
    fn subscription_commission_is_twenty_percent() {
        assert_eq!(earnings(ReferralType::SubscriptionCommission, 100.0), 20.0);
        assert_eq!(earnings(ReferralType::SubscriptionCommission, 50.0), 10.0);
    }

    #[test]
    fn deposit_bonus_is_five_percent() {
        assert_eq!(earnings(ReferralType::DepositBonus, 200.0), 10.0);
    }

    #[test]
    fn earnings_round_half_up_to_cents() {
        // 19.99 * 0.20 = 3.998 -> 4.00
        assert_eq!(earnings(ReferralType::SubscriptionCommission, 19.99), 4.0);
        // 0.99 * 0.05 = 0.0495 -> 0.05
        assert_eq!(earnings(ReferralType::DepositBonus, 0.99), 0.05);
    }

    #[test]
    fn round_cents_half_up() {
        // 0.125 is exactly representable, so the half-cent rounds up
        assert_eq!(round_cents(0.125), 0.13);
        assert_eq!(round_cents(1.004), 1.0);
        assert_eq!(round_cents(10.0), 10.0);
    }
}
