//! Grade term fee model: the priced fee schedule for one (term, grade) pair.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::fee_item::FeeType;

/// The eleven billable fee components. Missing components default to zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeComponents {
    pub tuition_fee: Decimal,
    pub basic_fee: Decimal,
    pub examination_fee: Decimal,
    pub transport_fee: Decimal,
    pub library_fee: Decimal,
    pub sports_fee: Decimal,
    pub activity_fee: Decimal,
    pub hostel_fee: Decimal,
    pub uniform_fee: Decimal,
    pub book_fee: Decimal,
    pub other_fee: Decimal,
}

impl FeeComponents {
    /// Derived total. Never stored independently of the components.
    pub fn total(&self) -> Decimal {
        self.tuition_fee
            + self.basic_fee
            + self.examination_fee
            + self.transport_fee
            + self.library_fee
            + self.sports_fee
            + self.activity_fee
            + self.hostel_fee
            + self.uniform_fee
            + self.book_fee
            + self.other_fee
    }

    /// Component amounts paired with their fee type, for fee item generation.
    pub fn itemized(&self) -> Vec<(FeeType, Decimal)> {
        vec![
            (FeeType::Tuition, self.tuition_fee),
            (FeeType::Basic, self.basic_fee),
            (FeeType::Examination, self.examination_fee),
            (FeeType::Transport, self.transport_fee),
            (FeeType::Library, self.library_fee),
            (FeeType::Sports, self.sports_fee),
            (FeeType::Activity, self.activity_fee),
            (FeeType::Hostel, self.hostel_fee),
            (FeeType::Uniform, self.uniform_fee),
            (FeeType::Book, self.book_fee),
            (FeeType::Other, self.other_fee),
        ]
    }
}

/// Fee schedule row for one (term, grade) pair. One active row per pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradeTermFee {
    pub grade_fee_id: Uuid,
    pub tenant_id: Uuid,
    pub academic_term_id: Uuid,
    pub grade: String,
    pub tuition_fee: Decimal,
    pub basic_fee: Decimal,
    pub examination_fee: Decimal,
    pub transport_fee: Decimal,
    pub library_fee: Decimal,
    pub sports_fee: Decimal,
    pub activity_fee: Decimal,
    pub hostel_fee: Decimal,
    pub uniform_fee: Decimal,
    pub book_fee: Decimal,
    pub other_fee: Decimal,
    pub total_fee: Decimal,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl GradeTermFee {
    pub fn components(&self) -> FeeComponents {
        FeeComponents {
            tuition_fee: self.tuition_fee,
            basic_fee: self.basic_fee,
            examination_fee: self.examination_fee,
            transport_fee: self.transport_fee,
            library_fee: self.library_fee,
            sports_fee: self.sports_fee,
            activity_fee: self.activity_fee,
            hostel_fee: self.hostel_fee,
            uniform_fee: self.uniform_fee,
            book_fee: self.book_fee,
            other_fee: self.other_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_is_sum_of_components() {
        let components = FeeComponents {
            tuition_fee: dec!(1000),
            library_fee: dec!(200),
            ..Default::default()
        };
        assert_eq!(components.total(), dec!(1200));
    }

    #[test]
    fn empty_schedule_totals_zero() {
        assert_eq!(FeeComponents::default().total(), Decimal::ZERO);
    }

    #[test]
    fn itemized_covers_all_eleven_components() {
        let items = FeeComponents::default().itemized();
        assert_eq!(items.len(), 11);
    }
}
