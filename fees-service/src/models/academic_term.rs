//! Academic term model: the billing period for a school year.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Academic term status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermStatus {
    Upcoming,
    Active,
    Completed,
    Cancelled,
}

impl TermStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermStatus::Upcoming => "upcoming",
            TermStatus::Active => "active",
            TermStatus::Completed => "completed",
            TermStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "active" => TermStatus::Active,
            "completed" => TermStatus::Completed,
            "cancelled" => TermStatus::Cancelled,
            _ => TermStatus::Upcoming,
        }
    }
}

/// Academic term: one billing period with its fee due date and break days.
///
/// At most one term per tenant carries `is_current`. Terms are never
/// hard-deleted; cancellation is a status change.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AcademicTerm {
    pub term_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub academic_year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fee_due_date: NaiveDate,
    pub status: String,
    pub is_current: bool,
    pub break_dates: Vec<NaiveDate>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl AcademicTerm {
    pub fn status(&self) -> TermStatus {
        TermStatus::from_string(&self.status)
    }
}

/// Input for creating a term.
#[derive(Debug, Clone)]
pub struct CreateTerm {
    pub name: String,
    pub academic_year: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub fee_due_date: NaiveDate,
    pub break_dates: Vec<NaiveDate>,
}
