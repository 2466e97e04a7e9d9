//! Status derivation rules for fee items, term assignments, and terms.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{FeeStatus, StudentTermAssignment, TermFeeItem, TermStatus};

/// Derives payment status from amounts and the due date.
///
/// The same rule applies to a single fee item and to the assignment-level
/// rollup: paid in full wins, then past-due, then partially paid, then
/// pending. A past-due partial balance is reported as overdue; the partial
/// progress stays recoverable from the amounts.
pub fn derive_fee_status(
    amount: Decimal,
    paid_amount: Decimal,
    due_date: NaiveDate,
    today: NaiveDate,
) -> FeeStatus {
    if amount > Decimal::ZERO && paid_amount >= amount {
        FeeStatus::Paid
    } else if today > due_date {
        FeeStatus::Overdue
    } else if paid_amount > Decimal::ZERO {
        FeeStatus::Partial
    } else {
        FeeStatus::Pending
    }
}

/// Derives term lifecycle status from its date range. Cancelled is sticky.
pub fn derive_term_status(
    start_date: NaiveDate,
    end_date: NaiveDate,
    stored: TermStatus,
    today: NaiveDate,
) -> TermStatus {
    if stored == TermStatus::Cancelled {
        return TermStatus::Cancelled;
    }
    if today > end_date {
        TermStatus::Completed
    } else if today >= start_date {
        TermStatus::Active
    } else {
        TermStatus::Upcoming
    }
}

/// Re-derives the status of every non-administrative fee item in place.
pub fn recalculate_items(items: &mut [TermFeeItem], today: NaiveDate) {
    for item in items.iter_mut() {
        if item.status().is_administrative() {
            continue;
        }
        let status = derive_fee_status(item.amount, item.paid_amount, item.due_date, today);
        item.status = status.as_str().to_string();
    }
}

/// Recomputes assignment totals and status from the owned fee items.
///
/// Idempotent: a second call with no intervening mutation is a no-op. The
/// cancelled/waived overrides survive; only the totals are refreshed for them.
pub fn recalculate(
    assignment: &mut StudentTermAssignment,
    items: &[TermFeeItem],
    today: NaiveDate,
) {
    let total: Decimal = items.iter().map(|i| i.amount).sum();
    let paid: Decimal = items.iter().map(|i| i.paid_amount).sum();

    assignment.total_term_fee = total;
    assignment.paid_amount = paid;
    assignment.pending_amount = (total - paid).max(Decimal::ZERO);

    if !assignment.status().is_administrative() {
        let status = derive_fee_status(total, paid, assignment.due_date, today);
        assignment.status = status.as_str().to_string();
    }
}
