//! Request and response DTOs for the fees API.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::allocation::AllocationOutcome;
use crate::models::{AcademicTerm, FeeStatus, FeeType};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTermRequest {
    #[validate(length(min = 1, message = "Term name cannot be empty"))]
    pub name: String,
    #[validate(length(min = 4, message = "Academic year is required, e.g. 2025-2026"))]
    pub academic_year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fee_due_date: NaiveDate,
    #[serde(default)]
    pub break_dates: Vec<NaiveDate>,
}

/// Term as returned by the API, with the derived working-day count.
#[derive(Debug, Serialize)]
pub struct TermResponse {
    #[serde(flatten)]
    pub term: AcademicTerm,
    pub working_days: u32,
}

impl From<AcademicTerm> for TermResponse {
    fn from(term: AcademicTerm) -> Self {
        let working_days =
            crate::domain::calendar::working_days(term.start_date, term.end_date, &term.break_dates);
        Self { term, working_days }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddBreakDaysRequest {
    #[validate(length(min = 1, message = "At least one break date is required"))]
    pub dates: Vec<NaiveDate>,
}

/// An empty list removes every break date.
#[derive(Debug, Default, Deserialize)]
pub struct RemoveBreakDaysRequest {
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BillStudentRequest {
    pub term_id: Uuid,
    #[validate(length(min = 1, message = "Grade is required"))]
    pub grade: String,
}

#[derive(Debug, Deserialize)]
pub struct NewFeeItemRequest {
    pub name: String,
    pub fee_type: FeeType,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    #[serde(default = "default_true")]
    pub is_mandatory: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ManualUpdateRequest {
    pub term_id: Uuid,
    #[serde(default)]
    pub add: Vec<NewFeeItemRequest>,
    #[serde(default)]
    pub remove: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyPaymentRequest {
    pub amount: Decimal,
    /// External payment reference, echoed back for reconciliation.
    pub reference: Option<String>,
    #[serde(default)]
    pub apply_to_future_terms: bool,
}

#[derive(Debug, Serialize)]
pub struct ApplyPaymentResponse {
    pub student_id: Uuid,
    pub reference: Option<String>,
    #[serde(flatten)]
    pub outcome: AllocationOutcome,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchEligibilityRequest {
    #[validate(length(min = 1, max = 500, message = "Between 1 and 500 student ids per batch"))]
    pub student_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentOverrideRequest {
    /// Must be `cancelled` or `waived`.
    pub status: FeeStatus,
}
