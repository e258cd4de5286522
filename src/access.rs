//! Access-tier policy
//!
//! Single canonical ranking for content tiers. Every handler that filters or
//! checks tier-gated content goes through this module; there are no
//! per-endpoint tier tables.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{AccessLevel, PlanTier, User, UserRole};

/// A user's effective content tier. Ordered low to high; `Admin` outranks every
/// plan tier regardless of subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Silver,
    Gold,
    Admin,
}

impl Tier {
    fn from_plan(plan: PlanTier) -> Self {
        match plan {
            PlanTier::Free => Tier::Free,
            PlanTier::Silver => Tier::Silver,
            PlanTier::Gold => Tier::Gold,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Tier::Free => 0,
            Tier::Silver => 1,
            Tier::Gold => 2,
            Tier::Admin => 3,
        }
    }
}

fn level_rank(level: AccessLevel) -> u8 {
    match level {
        AccessLevel::Free => 0,
        AccessLevel::Silver => 1,
        AccessLevel::Gold => 2,
    }
}

/// Resolve the tier actually granted right now. Paid plans count only while
/// unexpired; an expired plan silently degrades to free until a new approval
/// re-elevates it.
pub fn effective_tier_at(
    role: UserRole,
    plan: PlanTier,
    plan_expiry: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Tier {
    if role == UserRole::Admin {
        return Tier::Admin;
    }
    match plan {
        PlanTier::Free => Tier::Free,
        paid => match plan_expiry {
            Some(expiry) if now < expiry => Tier::from_plan(paid),
            _ => Tier::Free,
        },
    }
}

/// Effective tier of an optional authenticated user; anonymous requests are free.
pub fn effective_tier(user: Option<&User>) -> Tier {
    match user {
        Some(u) => effective_tier_at(u.role, u.plan, u.plan_expiry, Utc::now()),
        None => Tier::Free,
    }
}

/// Whether the user's paid plan is currently active. The silent-downgrade
/// behavior of `effective_tier_at` is surfaced only through this predicate.
pub fn plan_active(user: &User, now: DateTime<Utc>) -> bool {
    user.plan != PlanTier::Free && matches!(user.plan_expiry, Some(expiry) if now < expiry)
}

/// Access levels visible at a given tier: everything at or below it.
pub fn allowed_levels(tier: Tier) -> Vec<AccessLevel> {
    [AccessLevel::Free, AccessLevel::Silver, AccessLevel::Gold]
        .into_iter()
        .filter(|level| is_accessible(*level, tier))
        .collect()
}

/// Whether an item tagged `level` is visible at `tier`.
pub fn is_accessible(level: AccessLevel, tier: Tier) -> bool {
    level_rank(level) <= tier.rank()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn at(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
        Some(now + Duration::days(days))
    }

    #[test]
    fn admin_outranks_everything_regardless_of_plan() {
        let now = Utc::now();
        let tier = effective_tier_at(UserRole::Admin, PlanTier::Free, None, now);
        assert_eq!(tier, Tier::Admin);
        assert!(is_accessible(AccessLevel::Gold, tier));
    }

    #[test]
    fn active_paid_plan_grants_its_tier() {
        let now = Utc::now();
        assert_eq!(
            effective_tier_at(UserRole::User, PlanTier::Silver, at(now, 10), now),
            Tier::Silver
        );
        assert_eq!(
            effective_tier_at(UserRole::User, PlanTier::Gold, at(now, 1), now),
            Tier::Gold
        );
    }

    #[test]
    fn expired_plan_degrades_to_free() {
        let now = Utc::now();
        assert_eq!(
            effective_tier_at(UserRole::User, PlanTier::Silver, at(now, -1), now),
            Tier::Free
        );
    }

    #[test]
    fn paid_plan_without_expiry_counts_as_free() {
        let now = Utc::now();
        assert_eq!(
            effective_tier_at(UserRole::User, PlanTier::Gold, None, now),
            Tier::Free
        );
    }

    #[test]
    fn tier_never_re_elevates_as_time_passes() {
        let now = Utc::now();
        let expiry = at(now, 5);
        let mut last_rank = u8::MAX;
        for day in 0..10 {
            let t = now + Duration::days(day);
            let tier = effective_tier_at(UserRole::User, PlanTier::Gold, expiry, t);
            assert!(tier.rank() <= last_rank);
            last_rank = tier.rank();
        }
        assert_eq!(last_rank, Tier::Free.rank());
    }

    #[test]
    fn allowed_levels_are_cumulative() {
        assert_eq!(allowed_levels(Tier::Free), vec![AccessLevel::Free]);
        assert_eq!(
            allowed_levels(Tier::Silver),
            vec![AccessLevel::Free, AccessLevel::Silver]
        );
        assert_eq!(
            allowed_levels(Tier::Gold),
            vec![AccessLevel::Free, AccessLevel::Silver, AccessLevel::Gold]
        );
        assert_eq!(allowed_levels(Tier::Admin).len(), 3);
    }

    #[test]
    fn anonymous_requests_are_free_tier() {
        assert_eq!(effective_tier(None), Tier::Free);
    }
}
