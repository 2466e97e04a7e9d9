//! Student term assignment model: per-student per-term fee ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::fee_item::{FeeStatus, TermFeeItem};

/// Links one student to one term and owns that term's fee items.
///
/// `total_term_fee`, `paid_amount`, `pending_amount` and `status` are derived
/// from the owned fee items by `domain::status::recalculate` and are never set
/// directly, except for the administrative cancel/waive overrides. `version`
/// guards against lost updates from concurrent payments.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentTermAssignment {
    pub assignment_id: Uuid,
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub academic_term_id: Uuid,
    pub total_term_fee: Decimal,
    pub paid_amount: Decimal,
    pub pending_amount: Decimal,
    pub status: String,
    pub is_billed: bool,
    pub billing_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub reminders_sent: i32,
    pub version: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl StudentTermAssignment {
    pub fn status(&self) -> FeeStatus {
        FeeStatus::from_string(&self.status)
    }
}

/// An assignment together with its owned fee items, loaded explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermLedgerView {
    pub assignment: StudentTermAssignment,
    pub fee_items: Vec<TermFeeItem>,
}
