//! Term fee item model: one billable line for one student for one term.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment status shared by fee items and term assignments.
///
/// `Cancelled` and `Waived` are administrative overrides; payment allocation
/// never produces or consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    Cancelled,
    Waived,
}

impl FeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeStatus::Pending => "pending",
            FeeStatus::Partial => "partial",
            FeeStatus::Paid => "paid",
            FeeStatus::Overdue => "overdue",
            FeeStatus::Cancelled => "cancelled",
            FeeStatus::Waived => "waived",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "partial" => FeeStatus::Partial,
            "paid" => FeeStatus::Paid,
            "overdue" => FeeStatus::Overdue,
            "cancelled" => FeeStatus::Cancelled,
            "waived" => FeeStatus::Waived,
            _ => FeeStatus::Pending,
        }
    }

    /// Whether a payment can still be applied against this status.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            FeeStatus::Pending | FeeStatus::Partial | FeeStatus::Overdue
        )
    }

    /// Administrative override states survive recalculation untouched.
    pub fn is_administrative(&self) -> bool {
        matches!(self, FeeStatus::Cancelled | FeeStatus::Waived)
    }
}

/// Fee component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    Tuition,
    Basic,
    Examination,
    Transport,
    Library,
    Sports,
    Activity,
    Hostel,
    Uniform,
    Book,
    Other,
}

impl FeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeType::Tuition => "tuition",
            FeeType::Basic => "basic",
            FeeType::Examination => "examination",
            FeeType::Transport => "transport",
            FeeType::Library => "library",
            FeeType::Sports => "sports",
            FeeType::Activity => "activity",
            FeeType::Hostel => "hostel",
            FeeType::Uniform => "uniform",
            FeeType::Book => "book",
            FeeType::Other => "other",
        }
    }

    /// Human-readable name used when billing generates items from a grade
    /// fee schedule.
    pub fn display_name(&self) -> &'static str {
        match self {
            FeeType::Tuition => "Tuition Fee",
            FeeType::Basic => "Basic Fee",
            FeeType::Examination => "Examination Fee",
            FeeType::Transport => "Transport Fee",
            FeeType::Library => "Library Fee",
            FeeType::Sports => "Sports Fee",
            FeeType::Activity => "Activity Fee",
            FeeType::Hostel => "Hostel Fee",
            FeeType::Uniform => "Uniform Fee",
            FeeType::Book => "Book Fee",
            FeeType::Other => "Other Fee",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "tuition" => FeeType::Tuition,
            "basic" => FeeType::Basic,
            "examination" => FeeType::Examination,
            "transport" => FeeType::Transport,
            "library" => FeeType::Library,
            "sports" => FeeType::Sports,
            "activity" => FeeType::Activity,
            "hostel" => FeeType::Hostel,
            "uniform" => FeeType::Uniform,
            "book" => FeeType::Book,
            _ => FeeType::Other,
        }
    }
}

/// One billable line item, owned by exactly one student term assignment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TermFeeItem {
    pub item_id: Uuid,
    pub assignment_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub fee_type: String,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub due_date: NaiveDate,
    pub is_mandatory: bool,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

impl TermFeeItem {
    pub fn status(&self) -> FeeStatus {
        FeeStatus::from_string(&self.status)
    }

    /// Unpaid portion of this item.
    pub fn outstanding_balance(&self) -> Decimal {
        (self.amount - self.paid_amount).max(Decimal::ZERO)
    }
}

/// Input for manually adding a fee item to an assignment.
#[derive(Debug, Clone)]
pub struct NewFeeItem {
    pub name: String,
    pub fee_type: FeeType,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub is_mandatory: bool,
}
