//! Payment allocation engine.
//!
//! Distributes an incoming payment amount across a student's outstanding fee
//! items, oldest term first, then oldest due date, then lowest item id. The
//! ordering is strict so allocations are reproducible.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::FeeStatus;

use super::status::derive_fee_status;

/// Flattened view of an outstanding fee item, joined with its owning
/// assignment's term start date for cross-term ordering.
#[derive(Debug, Clone)]
pub struct OutstandingFeeItem {
    pub item_id: Uuid,
    pub assignment_id: Uuid,
    pub term_start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub status: FeeStatus,
}

impl OutstandingFeeItem {
    fn outstanding_balance(&self) -> Decimal {
        (self.amount - self.paid_amount).max(Decimal::ZERO)
    }
}

/// One touched fee item in an allocation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAllocation {
    pub item_id: Uuid,
    pub assignment_id: Uuid,
    pub amount_applied: Decimal,
    pub new_status: FeeStatus,
    pub remaining_balance: Decimal,
}

/// Result of allocating one payment.
///
/// Amount conservation holds for every input:
/// `total_applied + remaining_unapplied == payment amount`.
/// A non-zero `remaining_unapplied` is not an error; it means the student had
/// no further outstanding items. The remainder is reported to the caller and
/// never persisted as credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub allocations: Vec<ItemAllocation>,
    pub total_applied: Decimal,
    pub remaining_unapplied: Decimal,
}

impl AllocationOutcome {
    /// Ids of assignments touched by this allocation, deduplicated.
    pub fn touched_assignments(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.allocations.iter().map(|a| a.assignment_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Allocates `amount` across `items`.
///
/// Items are filtered to outstanding statuses with a positive balance, then
/// ordered by (term start date, due date, item id). Items belonging to terms
/// that start after `today` are skipped unless `apply_to_future_terms` is set.
/// Fails with a validation error for non-positive amounts; an empty item set
/// yields an empty allocation with the full amount unapplied.
pub fn allocate(
    amount: Decimal,
    items: &[OutstandingFeeItem],
    apply_to_future_terms: bool,
    today: NaiveDate,
) -> Result<AllocationOutcome, AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment amount must be positive, got {}",
            amount
        )));
    }

    let mut eligible: Vec<&OutstandingFeeItem> = items
        .iter()
        .filter(|i| i.status.is_outstanding())
        .filter(|i| i.outstanding_balance() > Decimal::ZERO)
        .filter(|i| apply_to_future_terms || i.term_start_date <= today)
        .collect();
    eligible.sort_by(|a, b| {
        (a.term_start_date, a.due_date, a.item_id).cmp(&(b.term_start_date, b.due_date, b.item_id))
    });

    let mut remaining = amount;
    let mut allocations = Vec::new();

    for item in eligible {
        if remaining <= Decimal::ZERO {
            break;
        }

        let balance = item.outstanding_balance();
        let applied = remaining.min(balance);
        let new_paid = item.paid_amount + applied;
        let new_status = derive_fee_status(item.amount, new_paid, item.due_date, today);

        allocations.push(ItemAllocation {
            item_id: item.item_id,
            assignment_id: item.assignment_id,
            amount_applied: applied,
            new_status,
            remaining_balance: balance - applied,
        });

        remaining -= applied;
    }

    let total_applied = amount - remaining;
    Ok(AllocationOutcome {
        allocations,
        total_applied,
        remaining_unapplied: remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn outstanding(
        item_id: u128,
        term_start: &str,
        due: &str,
        amount: Decimal,
        paid: Decimal,
    ) -> OutstandingFeeItem {
        OutstandingFeeItem {
            item_id: Uuid::from_u128(item_id),
            assignment_id: Uuid::from_u128(1000),
            term_start_date: date(term_start),
            due_date: date(due),
            amount,
            paid_amount: paid,
            status: if paid > Decimal::ZERO {
                FeeStatus::Partial
            } else {
                FeeStatus::Pending
            },
        }
    }

    #[test]
    fn partial_payment_fills_oldest_due_date_first() {
        // Scenario: ItemA due 2025-01-01 for 500, ItemB due 2025-02-01 for
        // 700, payment of 600 fully pays A and leaves 600 outstanding on B.
        let items = vec![
            outstanding(2, "2025-01-01", "2025-02-01", dec!(700), Decimal::ZERO),
            outstanding(1, "2025-01-01", "2025-01-01", dec!(500), Decimal::ZERO),
        ];

        let outcome = allocate(dec!(600), &items, false, date("2025-01-15")).unwrap();

        assert_eq!(outcome.allocations.len(), 2);
        assert_eq!(outcome.allocations[0].item_id, Uuid::from_u128(1));
        assert_eq!(outcome.allocations[0].amount_applied, dec!(500));
        assert_eq!(outcome.allocations[0].new_status, FeeStatus::Paid);
        assert_eq!(outcome.allocations[1].item_id, Uuid::from_u128(2));
        assert_eq!(outcome.allocations[1].amount_applied, dec!(100));
        assert_eq!(outcome.allocations[1].remaining_balance, dec!(600));
        assert_eq!(outcome.allocations[1].new_status, FeeStatus::Partial);
        assert_eq!(outcome.total_applied, dec!(600));
        assert_eq!(outcome.remaining_unapplied, Decimal::ZERO);
    }

    #[test]
    fn exact_payment_pays_everything() {
        let items = vec![
            outstanding(1, "2025-01-01", "2025-01-01", dec!(500), Decimal::ZERO),
            outstanding(2, "2025-01-01", "2025-02-01", dec!(700), Decimal::ZERO),
        ];

        let outcome = allocate(dec!(1200), &items, false, date("2025-01-15")).unwrap();

        assert!(outcome
            .allocations
            .iter()
            .all(|a| a.new_status == FeeStatus::Paid));
        assert_eq!(outcome.total_applied, dec!(1200));
        assert_eq!(outcome.remaining_unapplied, Decimal::ZERO);
    }

    #[test]
    fn no_outstanding_items_returns_full_remainder_without_error() {
        let outcome = allocate(dec!(300), &[], false, date("2025-01-15")).unwrap();

        assert!(outcome.allocations.is_empty());
        assert_eq!(outcome.total_applied, Decimal::ZERO);
        assert_eq!(outcome.remaining_unapplied, dec!(300));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = allocate(Decimal::ZERO, &[], false, date("2025-01-15")).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err = allocate(dec!(-50), &[], false, date("2025-01-15")).unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn amount_is_conserved_on_overpayment() {
        let items = vec![outstanding(
            1,
            "2025-01-01",
            "2025-01-01",
            dec!(500),
            Decimal::ZERO,
        )];

        let outcome = allocate(dec!(800), &items, false, date("2025-01-15")).unwrap();

        assert_eq!(outcome.total_applied, dec!(500));
        assert_eq!(outcome.remaining_unapplied, dec!(300));
        let applied: Decimal = outcome.allocations.iter().map(|a| a.amount_applied).sum();
        assert_eq!(applied + outcome.remaining_unapplied, dec!(800));
    }

    #[test]
    fn later_due_item_untouched_until_earlier_is_exhausted() {
        let items = vec![
            outstanding(1, "2025-01-01", "2025-01-01", dec!(500), Decimal::ZERO),
            outstanding(2, "2025-01-01", "2025-02-01", dec!(700), Decimal::ZERO),
        ];

        let outcome = allocate(dec!(400), &items, false, date("2025-01-15")).unwrap();

        assert_eq!(outcome.allocations.len(), 1);
        assert_eq!(outcome.allocations[0].item_id, Uuid::from_u128(1));
        assert_eq!(outcome.allocations[0].new_status, FeeStatus::Partial);
    }

    #[test]
    fn equal_due_dates_break_ties_by_item_id() {
        let items = vec![
            outstanding(7, "2025-01-01", "2025-01-01", dec!(300), Decimal::ZERO),
            outstanding(3, "2025-01-01", "2025-01-01", dec!(300), Decimal::ZERO),
        ];

        let outcome = allocate(dec!(100), &items, false, date("2025-01-15")).unwrap();

        assert_eq!(outcome.allocations[0].item_id, Uuid::from_u128(3));
    }

    #[test]
    fn partially_paid_item_only_absorbs_its_balance() {
        let items = vec![outstanding(
            1,
            "2025-01-01",
            "2025-01-01",
            dec!(500),
            dec!(400),
        )];

        let outcome = allocate(dec!(250), &items, false, date("2025-01-15")).unwrap();

        assert_eq!(outcome.allocations[0].amount_applied, dec!(100));
        assert_eq!(outcome.allocations[0].new_status, FeeStatus::Paid);
        assert_eq!(outcome.remaining_unapplied, dec!(150));
    }

    #[test]
    fn future_terms_skipped_unless_requested() {
        let mut future = outstanding(2, "2025-06-01", "2025-06-15", dec!(700), Decimal::ZERO);
        future.assignment_id = Uuid::from_u128(2000);
        let items = vec![
            outstanding(1, "2025-01-01", "2025-01-01", dec!(500), Decimal::ZERO),
            future,
        ];

        let without = allocate(dec!(1000), &items, false, date("2025-01-15")).unwrap();
        assert_eq!(without.allocations.len(), 1);
        assert_eq!(without.remaining_unapplied, dec!(500));

        let with = allocate(dec!(1000), &items, true, date("2025-01-15")).unwrap();
        assert_eq!(with.allocations.len(), 2);
        assert_eq!(with.remaining_unapplied, Decimal::ZERO);
        assert_eq!(with.touched_assignments().len(), 2);
    }

    #[test]
    fn future_terms_ordered_after_current_term() {
        let mut future = outstanding(1, "2025-06-01", "2025-06-01", dec!(300), Decimal::ZERO);
        future.assignment_id = Uuid::from_u128(2000);
        // Future item has the lexically smallest id and an early due date, but
        // the current-term item must still be served first.
        let items = vec![
            future,
            outstanding(9, "2025-01-01", "2025-08-01", dec!(300), Decimal::ZERO),
        ];

        let outcome = allocate(dec!(100), &items, true, date("2025-01-15")).unwrap();

        assert_eq!(outcome.allocations[0].item_id, Uuid::from_u128(9));
    }

    #[test]
    fn non_outstanding_statuses_are_skipped() {
        let mut waived = outstanding(1, "2025-01-01", "2025-01-01", dec!(500), Decimal::ZERO);
        waived.status = FeeStatus::Waived;
        let mut cancelled = outstanding(2, "2025-01-01", "2025-01-01", dec!(500), Decimal::ZERO);
        cancelled.status = FeeStatus::Cancelled;

        let outcome = allocate(dec!(300), &[waived, cancelled], false, date("2025-01-15")).unwrap();

        assert!(outcome.allocations.is_empty());
        assert_eq!(outcome.remaining_unapplied, dec!(300));
    }

    #[test]
    fn overdue_items_are_still_payable() {
        let mut overdue = outstanding(1, "2025-01-01", "2025-01-01", dec!(500), Decimal::ZERO);
        overdue.status = FeeStatus::Overdue;

        let outcome = allocate(dec!(500), &[overdue], false, date("2025-03-01")).unwrap();

        assert_eq!(outcome.allocations[0].new_status, FeeStatus::Paid);
    }
}
