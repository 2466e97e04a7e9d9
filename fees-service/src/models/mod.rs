//! Data models for fees-service.

pub mod academic_term;
pub mod fee_item;
pub mod grade_term_fee;
pub mod term_assignment;

pub use academic_term::{AcademicTerm, CreateTerm, TermStatus};
pub use fee_item::{FeeStatus, FeeType, NewFeeItem, TermFeeItem};
pub use grade_term_fee::{FeeComponents, GradeTermFee};
pub use term_assignment::{StudentTermAssignment, TermLedgerView};
