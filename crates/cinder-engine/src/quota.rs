//! Daily quota decisions.
//!
//! Pure: reads account state, never writes it. Persisting the consumed
//! unit happens in the same transaction as the swipe itself, so a failure
//! between authorize and record can't strand either side.

use chrono::NaiveDate;

use crate::config::UNLIMITED_THRESHOLD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Units left after this call consumes one (0 when denied).
    pub remaining: u32,
    /// The count as of this decision, with day rollover applied.
    /// On an allowed swipe the caller persists `effective_count + 1`.
    pub effective_count: u32,
}

/// Evaluate one prospective swipe against the account's quota state.
///
/// The day boundary is the UTC calendar date, computed server-side —
/// `today` is passed in so the decision stays testable. If the stored
/// `last_swipe_date` isn't today, the counter is logically reset to zero
/// for this decision without a separate reset pass.
pub fn evaluate(
    daily_count: u32,
    last_swipe_date: Option<NaiveDate>,
    today: NaiveDate,
    limit: u32,
) -> QuotaDecision {
    let effective_count = if last_swipe_date == Some(today) {
        daily_count
    } else {
        0
    };

    // Limits at or above the threshold bypass enforcement entirely.
    if limit >= UNLIMITED_THRESHOLD {
        return QuotaDecision {
            allowed: true,
            remaining: limit.saturating_sub(effective_count + 1),
            effective_count,
        };
    }

    if effective_count >= limit {
        QuotaDecision {
            allowed: false,
            remaining: 0,
            effective_count,
        }
    } else {
        QuotaDecision {
            allowed: true,
            remaining: limit - effective_count - 1,
            effective_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn counts_down_within_a_day() {
        let d = evaluate(0, Some(day(10)), day(10), 3);
        assert!(d.allowed);
        assert_eq!(d.remaining, 2);

        let d = evaluate(2, Some(day(10)), day(10), 3);
        assert!(d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn denies_at_limit() {
        let d = evaluate(3, Some(day(10)), day(10), 3);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn rollover_resets_logically() {
        // At the limit yesterday — today starts fresh.
        let d = evaluate(3, Some(day(9)), day(10), 3);
        assert!(d.allowed);
        assert_eq!(d.effective_count, 0);
        assert_eq!(d.remaining, 2);
    }

    #[test]
    fn never_swiped_counts_as_fresh() {
        let d = evaluate(0, None, day(10), 3);
        assert!(d.allowed);
        assert_eq!(d.effective_count, 0);
    }

    #[test]
    fn unlimited_threshold_bypasses() {
        let d = evaluate(5000, Some(day(10)), day(10), UNLIMITED_THRESHOLD);
        assert!(d.allowed);
    }
}
