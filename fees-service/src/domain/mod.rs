//! Pure billing domain logic.
//!
//! Everything in this module is a function of its inputs: no clocks, no
//! database handles. Mutating operations in `services::database` load the
//! aggregate, call into here, and persist the result in one transaction.

pub mod allocation;
pub mod billing;
pub mod calendar;
pub mod eligibility;
pub mod status;
