//! Payment eligibility classification.
//!
//! Pure decision table over per-student aggregates; the repository supplies
//! the counts with one grouped query so batch checks stay O(1) round trips.
//! The query counts only non-cancelled, non-waived assignments, so the
//! aggregates here always describe ledgers a payment could actually reach.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of the eligibility decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityCode {
    NoTermAssignments,
    NoFeeItems,
    NoUnpaidItems,
    Eligible,
}

impl EligibilityCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EligibilityCode::NoTermAssignments => "NO_TERM_ASSIGNMENTS",
            EligibilityCode::NoFeeItems => "NO_FEE_ITEMS",
            EligibilityCode::NoUnpaidItems => "NO_UNPAID_ITEMS",
            EligibilityCode::Eligible => "ELIGIBLE",
        }
    }
}

/// Raw aggregates for one student, as produced by the grouped query.
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentFeeAggregates {
    pub assignment_count: i64,
    pub fee_item_count: i64,
    pub unpaid_fee_item_count: i64,
    pub total_pending_amount: Decimal,
}

/// Eligibility verdict for one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEligibility {
    pub student_id: Uuid,
    pub is_valid: bool,
    pub has_term_assignments: bool,
    pub fee_item_count: i64,
    pub unpaid_fee_item_count: i64,
    pub total_pending_amount: Decimal,
    pub error_code: EligibilityCode,
}

/// Applies the decision table to one student's aggregates.
pub fn classify(student_id: Uuid, aggregates: StudentFeeAggregates) -> PaymentEligibility {
    let error_code = if aggregates.assignment_count == 0 {
        EligibilityCode::NoTermAssignments
    } else if aggregates.fee_item_count == 0 {
        EligibilityCode::NoFeeItems
    } else if aggregates.unpaid_fee_item_count == 0 {
        EligibilityCode::NoUnpaidItems
    } else {
        EligibilityCode::Eligible
    };

    PaymentEligibility {
        student_id,
        is_valid: error_code == EligibilityCode::Eligible,
        has_term_assignments: aggregates.assignment_count > 0,
        fee_item_count: aggregates.fee_item_count,
        unpaid_fee_item_count: aggregates.unpaid_fee_item_count,
        total_pending_amount: aggregates.total_pending_amount,
        error_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn student_without_assignments_is_rejected() {
        let verdict = classify(Uuid::new_v4(), StudentFeeAggregates::default());
        assert!(!verdict.is_valid);
        assert!(!verdict.has_term_assignments);
        assert_eq!(verdict.error_code, EligibilityCode::NoTermAssignments);
    }

    #[test]
    fn waived_only_student_counts_as_unassigned() {
        // A waived assignment is excluded from the aggregation entirely, so
        // its unpaid items never reach the decision table and the student is
        // not offered a payment that allocation would skip.
        let verdict = classify(Uuid::new_v4(), StudentFeeAggregates::default());
        assert!(!verdict.is_valid);
        assert_eq!(verdict.error_code, EligibilityCode::NoTermAssignments);
        assert_eq!(verdict.total_pending_amount, Decimal::ZERO);
    }

    #[test]
    fn assignments_without_items_are_rejected() {
        let verdict = classify(
            Uuid::new_v4(),
            StudentFeeAggregates {
                assignment_count: 2,
                ..Default::default()
            },
        );
        assert!(!verdict.is_valid);
        assert!(verdict.has_term_assignments);
        assert_eq!(verdict.error_code, EligibilityCode::NoFeeItems);
    }

    #[test]
    fn fully_paid_student_is_rejected() {
        let verdict = classify(
            Uuid::new_v4(),
            StudentFeeAggregates {
                assignment_count: 1,
                fee_item_count: 3,
                unpaid_fee_item_count: 0,
                total_pending_amount: Decimal::ZERO,
            },
        );
        assert!(!verdict.is_valid);
        assert_eq!(verdict.error_code, EligibilityCode::NoUnpaidItems);
    }

    #[test]
    fn student_with_unpaid_items_is_eligible() {
        let verdict = classify(
            Uuid::new_v4(),
            StudentFeeAggregates {
                assignment_count: 1,
                fee_item_count: 3,
                unpaid_fee_item_count: 2,
                total_pending_amount: dec!(750),
            },
        );
        assert!(verdict.is_valid);
        assert_eq!(verdict.error_code, EligibilityCode::Eligible);
        assert_eq!(verdict.total_pending_amount, dec!(750));
    }
}
