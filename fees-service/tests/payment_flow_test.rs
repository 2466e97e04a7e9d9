//! End-to-end allocation flow over the pure billing engine: a payment is
//! allocated across two terms, the touched ledgers are recalculated, and the
//! resulting aggregates drive the eligibility verdict.

use chrono::{NaiveDate, Utc};
use fees_service::domain::allocation::{allocate, OutstandingFeeItem};
use fees_service::domain::eligibility::{classify, EligibilityCode, StudentFeeAggregates};
use fees_service::domain::status::recalculate;
use fees_service::models::{FeeStatus, StudentTermAssignment, TermFeeItem};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn fee_item(
    assignment_id: Uuid,
    name: &str,
    amount: Decimal,
    due: NaiveDate,
) -> TermFeeItem {
    TermFeeItem {
        item_id: Uuid::new_v4(),
        assignment_id,
        tenant_id: Uuid::new_v4(),
        name: name.to_string(),
        fee_type: "tuition".to_string(),
        amount,
        paid_amount: Decimal::ZERO,
        due_date: due,
        is_mandatory: true,
        status: "pending".to_string(),
        created_utc: Utc::now(),
    }
}

fn assignment(assignment_id: Uuid, due: NaiveDate) -> StudentTermAssignment {
    StudentTermAssignment {
        assignment_id,
        tenant_id: Uuid::new_v4(),
        student_id: Uuid::new_v4(),
        academic_term_id: Uuid::new_v4(),
        total_term_fee: Decimal::ZERO,
        paid_amount: Decimal::ZERO,
        pending_amount: Decimal::ZERO,
        status: "pending".to_string(),
        is_billed: true,
        billing_date: Some(due),
        due_date: due,
        reminders_sent: 0,
        version: 1,
        created_utc: Utc::now(),
        updated_utc: Utc::now(),
    }
}

fn outstanding(item: &TermFeeItem, term_start: NaiveDate) -> OutstandingFeeItem {
    OutstandingFeeItem {
        item_id: item.item_id,
        assignment_id: item.assignment_id,
        term_start_date: term_start,
        due_date: item.due_date,
        amount: item.amount,
        paid_amount: item.paid_amount,
        status: item.status(),
    }
}

#[test]
fn payment_spans_terms_and_updates_ledgers() {
    let today = date("2025-05-10");
    let term1_start = date("2025-01-06");
    let term2_start = date("2025-04-07");

    let a1 = Uuid::new_v4();
    let a2 = Uuid::new_v4();

    // Term 1 is fully past due; term 2 is current and not yet due.
    let mut term1_items = vec![
        fee_item(a1, "Tuition Fee", dec!(500), date("2025-02-01")),
        fee_item(a1, "Transport Fee", dec!(200), date("2025-02-01")),
    ];
    let mut term2_items = vec![fee_item(a2, "Tuition Fee", dec!(500), date("2025-06-01"))];

    let mut ledger1 = assignment(a1, date("2025-02-01"));
    let mut ledger2 = assignment(a2, date("2025-06-01"));
    recalculate(&mut ledger1, &term1_items, today);
    recalculate(&mut ledger2, &term2_items, today);
    assert_eq!(ledger1.status, "overdue");
    assert_eq!(ledger2.status, "pending");

    // 800 covers term 1 entirely and starts on term 2.
    let pool: Vec<OutstandingFeeItem> = term1_items
        .iter()
        .map(|i| outstanding(i, term1_start))
        .chain(term2_items.iter().map(|i| outstanding(i, term2_start)))
        .collect();

    let outcome = allocate(dec!(800), &pool, false, today).unwrap();
    assert_eq!(outcome.total_applied, dec!(800));
    assert_eq!(outcome.remaining_unapplied, Decimal::ZERO);
    assert_eq!(outcome.allocations.len(), 3);

    // Oldest term drains first.
    assert_eq!(outcome.allocations[0].assignment_id, a1);
    assert_eq!(outcome.allocations[1].assignment_id, a1);
    assert_eq!(outcome.allocations[2].assignment_id, a2);
    assert_eq!(outcome.allocations[2].amount_applied, dec!(100));
    assert_eq!(outcome.allocations[2].new_status, FeeStatus::Partial);

    // Apply the allocation back onto the items, then recalculate.
    for allocation in &outcome.allocations {
        for item in term1_items.iter_mut().chain(term2_items.iter_mut()) {
            if item.item_id == allocation.item_id {
                item.paid_amount += allocation.amount_applied;
                item.status = allocation.new_status.as_str().to_string();
            }
        }
    }
    recalculate(&mut ledger1, &term1_items, today);
    recalculate(&mut ledger2, &term2_items, today);

    assert_eq!(ledger1.status, "paid");
    assert_eq!(ledger1.pending_amount, Decimal::ZERO);
    assert_eq!(ledger2.status, "partial");
    assert_eq!(ledger2.paid_amount, dec!(100));
    assert_eq!(ledger2.pending_amount, dec!(400));

    // The student remains eligible while term 2 carries a balance.
    let verdict = classify(
        ledger2.student_id,
        StudentFeeAggregates {
            assignment_count: 2,
            fee_item_count: 3,
            unpaid_fee_item_count: 1,
            total_pending_amount: ledger2.pending_amount,
        },
    );
    assert!(verdict.is_valid);
    assert_eq!(verdict.error_code, EligibilityCode::Eligible);
}

#[test]
fn overpayment_remainder_is_reported_not_lost() {
    let today = date("2025-05-10");
    let a1 = Uuid::new_v4();
    let items = vec![fee_item(a1, "Library Fee", dec!(150), date("2025-06-01"))];
    let pool: Vec<OutstandingFeeItem> = items
        .iter()
        .map(|i| outstanding(i, date("2025-04-07")))
        .collect();

    let outcome = allocate(dec!(500), &pool, false, today).unwrap();
    assert_eq!(outcome.total_applied, dec!(150));
    assert_eq!(outcome.remaining_unapplied, dec!(350));
    assert_eq!(
        outcome.total_applied + outcome.remaining_unapplied,
        dec!(500)
    );
}

#[test]
fn future_term_excluded_until_opted_in() {
    let today = date("2025-05-10");
    let a1 = Uuid::new_v4();
    let items = vec![fee_item(a1, "Tuition Fee", dec!(300), date("2025-10-01"))];
    let pool: Vec<OutstandingFeeItem> = items
        .iter()
        .map(|i| outstanding(i, date("2025-09-01")))
        .collect();

    let skipped = allocate(dec!(300), &pool, false, today).unwrap();
    assert!(skipped.allocations.is_empty());
    assert_eq!(skipped.remaining_unapplied, dec!(300));

    let applied = allocate(dec!(300), &pool, true, today).unwrap();
    assert_eq!(applied.total_applied, dec!(300));
    assert_eq!(applied.allocations[0].new_status, FeeStatus::Paid);
}
