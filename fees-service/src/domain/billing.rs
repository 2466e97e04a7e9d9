//! Fee item generation and mutation rules for billing.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::{FeeComponents, FeeStatus, FeeType, TermFeeItem};

use super::status::derive_fee_status;

/// One fee item to be created when a student is billed.
#[derive(Debug, Clone)]
pub struct FeeItemDraft {
    pub name: String,
    pub fee_type: FeeType,
    pub amount: Decimal,
    pub status: FeeStatus,
}

/// Drafts the billable items for one assignment from a grade fee schedule.
///
/// The drafts are a snapshot of the schedule at billing time; later schedule
/// edits leave billed amounts untouched. Zero-amount components produce no
/// item.
pub fn draft_fee_items(
    components: &FeeComponents,
    due_date: NaiveDate,
    today: NaiveDate,
) -> Vec<FeeItemDraft> {
    components
        .itemized()
        .into_iter()
        .filter(|(_, amount)| *amount > Decimal::ZERO)
        .map(|(fee_type, amount)| FeeItemDraft {
            name: fee_type.display_name().to_string(),
            fee_type,
            amount,
            status: derive_fee_status(amount, Decimal::ZERO, due_date, today),
        })
        .collect()
}

/// A fee item with payments applied cannot be removed; deleting it would
/// drop the applied money from the assignment's recalculated totals.
pub fn ensure_removable(item: &TermFeeItem) -> Result<(), AppError> {
    if item.paid_amount > Decimal::ZERO {
        return Err(AppError::InvalidState(anyhow::anyhow!(
            "Fee item '{}' has {} already applied and cannot be removed",
            item.name,
            item.paid_amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn drafts_one_item_per_nonzero_component() {
        let components = FeeComponents {
            tuition_fee: dec!(1000),
            library_fee: dec!(200),
            ..Default::default()
        };

        let drafts = draft_fee_items(&components, date("2025-03-01"), date("2025-01-15"));

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name, "Tuition Fee");
        assert_eq!(drafts[0].fee_type, FeeType::Tuition);
        assert_eq!(drafts[0].amount, dec!(1000));
        assert_eq!(drafts[0].status, FeeStatus::Pending);
        assert_eq!(drafts[1].name, "Library Fee");
        assert_eq!(drafts[1].amount, dec!(200));

        let total: Decimal = drafts.iter().map(|d| d.amount).sum();
        assert_eq!(total, dec!(1200));
    }

    #[test]
    fn zero_components_produce_no_items() {
        let drafts = draft_fee_items(&FeeComponents::default(), date("2025-03-01"), date("2025-01-15"));
        assert!(drafts.is_empty());
    }

    #[test]
    fn past_due_schedule_drafts_overdue_items() {
        let components = FeeComponents {
            tuition_fee: dec!(500),
            ..Default::default()
        };

        let drafts = draft_fee_items(&components, date("2025-01-01"), date("2025-02-01"));

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].status, FeeStatus::Overdue);
    }

    fn item(paid: Decimal) -> TermFeeItem {
        TermFeeItem {
            item_id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Transport Fee".to_string(),
            fee_type: "transport".to_string(),
            amount: dec!(300),
            paid_amount: paid,
            due_date: date("2025-03-01"),
            is_mandatory: true,
            status: "partial".to_string(),
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn unpaid_item_is_removable() {
        assert!(ensure_removable(&item(Decimal::ZERO)).is_ok());
    }

    #[test]
    fn paid_item_removal_is_rejected() {
        let result = ensure_removable(&item(dec!(100)));
        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }
}
