//! Database service for fees-service.
//!
//! Every query is scoped by tenant id. Mutating operations load the affected
//! aggregate, run the pure domain logic, and persist the result within one
//! transaction; assignment rows carry a version column so concurrent payments
//! against the same assignment surface as conflicts instead of lost updates.

use crate::domain::allocation::{allocate, AllocationOutcome, OutstandingFeeItem};
use crate::domain::billing::{draft_fee_items, ensure_removable};
use crate::domain::eligibility::{classify, PaymentEligibility, StudentFeeAggregates};
use crate::domain::status::{derive_fee_status, derive_term_status, recalculate, recalculate_items};
use crate::models::{
    AcademicTerm, CreateTerm, FeeComponents, FeeStatus, GradeTermFee, NewFeeItem,
    StudentTermAssignment, TermFeeItem, TermLedgerView, TermStatus,
};
use crate::services::metrics::{DB_QUERY_DURATION, PAYMENTS_APPLIED_TOTAL, PAYMENT_AMOUNT_TOTAL, STUDENTS_BILLED_TOTAL};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const TERM_COLUMNS: &str = "term_id, tenant_id, name, academic_year, start_date, end_date, \
     fee_due_date, status, is_current, break_dates, created_utc, updated_utc";

const GRADE_FEE_COLUMNS: &str = "grade_fee_id, tenant_id, academic_term_id, grade, \
     tuition_fee, basic_fee, examination_fee, transport_fee, library_fee, sports_fee, \
     activity_fee, hostel_fee, uniform_fee, book_fee, other_fee, total_fee, created_utc, updated_utc";

const ASSIGNMENT_COLUMNS: &str = "assignment_id, tenant_id, student_id, academic_term_id, \
     total_term_fee, paid_amount, pending_amount, status, is_billed, billing_date, due_date, \
     reminders_sent, version, created_utc, updated_utc";

const ITEM_COLUMNS: &str = "item_id, assignment_id, tenant_id, name, fee_type, amount, \
     paid_amount, due_date, is_mandatory, status, created_utc";

/// Per-term collection statistics for reporting collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermCollectionStats {
    pub term_id: Uuid,
    pub billed_students: i64,
    pub total_billed: Decimal,
    pub total_collected: Decimal,
    pub total_pending: Decimal,
    pub collection_rate: f64,
}

#[derive(Debug, FromRow)]
struct CollectionStatsRow {
    billed_students: i64,
    total_billed: Decimal,
    total_collected: Decimal,
    total_pending: Decimal,
}

#[derive(Debug, FromRow)]
struct OutstandingItemRow {
    item_id: Uuid,
    assignment_id: Uuid,
    term_start_date: NaiveDate,
    due_date: NaiveDate,
    amount: Decimal,
    paid_amount: Decimal,
    status: String,
}

#[derive(Debug, FromRow)]
struct EligibilityRow {
    student_id: Uuid,
    assignment_count: i64,
    fee_item_count: i64,
    unpaid_fee_item_count: i64,
    total_pending_amount: Decimal,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "fees-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Academic Term Operations
    // -------------------------------------------------------------------------

    /// Create a new academic term.
    ///
    /// Rejects inverted date ranges and overlaps with a non-cancelled term in
    /// the same academic year. The new term becomes current when today falls
    /// inside its range and no other term claims it.
    #[instrument(skip(self, input), fields(tenant_id = %tenant_id, name = %input.name))]
    pub async fn create_term(
        &self,
        tenant_id: Uuid,
        input: &CreateTerm,
        today: NaiveDate,
    ) -> Result<AcademicTerm, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_term"])
            .start_timer();

        if input.start_date >= input.end_date {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Term start date {} must be before end date {}",
                input.start_date,
                input.end_date
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let overlaps: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM academic_terms
                WHERE tenant_id = $1
                  AND academic_year = $2
                  AND status <> 'cancelled'
                  AND start_date <= $4
                  AND end_date >= $3
            )
            "#,
        )
        .bind(tenant_id)
        .bind(&input.academic_year)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check term overlap: {}", e))
        })?;

        if overlaps {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Term dates overlap an existing term in academic year {}",
                input.academic_year
            )));
        }

        let status = derive_term_status(input.start_date, input.end_date, TermStatus::Upcoming, today);
        let is_current = status == TermStatus::Active;

        if is_current {
            sqlx::query("UPDATE academic_terms SET is_current = FALSE WHERE tenant_id = $1 AND is_current")
                .bind(tenant_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to clear current term: {}", e))
                })?;
        }

        let term_id = Uuid::new_v4();
        let term = sqlx::query_as::<_, AcademicTerm>(&format!(
            r#"
            INSERT INTO academic_terms (
                term_id, tenant_id, name, academic_year, start_date, end_date,
                fee_due_date, status, is_current, break_dates
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TERM_COLUMNS}
            "#
        ))
        .bind(term_id)
        .bind(tenant_id)
        .bind(&input.name)
        .bind(&input.academic_year)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.fee_due_date)
        .bind(status.as_str())
        .bind(is_current)
        .bind(&input.break_dates)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Term '{}' already exists for academic year {}",
                    input.name,
                    input.academic_year
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create term: {}", e)),
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(term_id = %term.term_id, name = %term.name, "Academic term created");

        Ok(term)
    }

    /// Get a term by ID.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, term_id = %term_id))]
    pub async fn get_term(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
    ) -> Result<Option<AcademicTerm>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_term"])
            .start_timer();

        let term = sqlx::query_as::<_, AcademicTerm>(&format!(
            "SELECT {TERM_COLUMNS} FROM academic_terms WHERE tenant_id = $1 AND term_id = $2"
        ))
        .bind(tenant_id)
        .bind(term_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get term: {}", e)))?;

        timer.observe_duration();

        Ok(term)
    }

    /// List terms for a tenant, newest first.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn list_terms(&self, tenant_id: Uuid) -> Result<Vec<AcademicTerm>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_terms"])
            .start_timer();

        let terms = sqlx::query_as::<_, AcademicTerm>(&format!(
            "SELECT {TERM_COLUMNS} FROM academic_terms WHERE tenant_id = $1 ORDER BY start_date DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list terms: {}", e)))?;

        timer.observe_duration();

        Ok(terms)
    }

    /// Mark one term as current, clearing the flag on every other term, and
    /// refresh the date-derived status of all non-cancelled terms.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, term_id = %term_id))]
    pub async fn set_current_term(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
        today: NaiveDate,
    ) -> Result<AcademicTerm, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_current_term"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = sqlx::query_as::<_, AcademicTerm>(&format!(
            "SELECT {TERM_COLUMNS} FROM academic_terms WHERE tenant_id = $1 AND term_id = $2 FOR UPDATE"
        ))
        .bind(tenant_id)
        .bind(term_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get term: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Term not found")))?;

        if existing.status() == TermStatus::Cancelled {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "A cancelled term cannot be made current"
            )));
        }

        sqlx::query(
            r#"
            UPDATE academic_terms
            SET status = CASE
                    WHEN status = 'cancelled' THEN 'cancelled'
                    WHEN end_date < $2 THEN 'completed'
                    WHEN start_date <= $2 THEN 'active'
                    ELSE 'upcoming'
                END,
                is_current = FALSE,
                updated_utc = NOW()
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(today)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to refresh term statuses: {}", e))
        })?;

        let term = sqlx::query_as::<_, AcademicTerm>(&format!(
            r#"
            UPDATE academic_terms
            SET is_current = TRUE, updated_utc = NOW()
            WHERE tenant_id = $1 AND term_id = $2
            RETURNING {TERM_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(term_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to set current term: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(term_id = %term.term_id, "Current term updated");

        Ok(term)
    }

    /// Replace a term's break dates with the given merge/removal applied.
    #[instrument(skip(self, dates), fields(tenant_id = %tenant_id, term_id = %term_id))]
    pub async fn add_break_days(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
        dates: &[NaiveDate],
    ) -> Result<AcademicTerm, AppError> {
        let term = self
            .get_term(tenant_id, term_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Term not found")))?;

        let mut merged = term.break_dates.clone();
        for date in dates {
            if *date < term.start_date || *date > term.end_date {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Break date {} falls outside the term range",
                    date
                )));
            }
            if !merged.contains(date) {
                merged.push(*date);
            }
        }
        merged.sort();

        self.store_break_dates(tenant_id, term_id, &merged).await
    }

    /// Remove the given break dates; an empty list clears all of them.
    #[instrument(skip(self, dates), fields(tenant_id = %tenant_id, term_id = %term_id))]
    pub async fn remove_break_days(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
        dates: &[NaiveDate],
    ) -> Result<AcademicTerm, AppError> {
        let term = self
            .get_term(tenant_id, term_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Term not found")))?;

        let remaining: Vec<NaiveDate> = if dates.is_empty() {
            Vec::new()
        } else {
            term.break_dates
                .iter()
                .copied()
                .filter(|d| !dates.contains(d))
                .collect()
        };

        self.store_break_dates(tenant_id, term_id, &remaining).await
    }

    async fn store_break_dates(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
        dates: &[NaiveDate],
    ) -> Result<AcademicTerm, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["store_break_dates"])
            .start_timer();

        let term = sqlx::query_as::<_, AcademicTerm>(&format!(
            r#"
            UPDATE academic_terms
            SET break_dates = $3, updated_utc = NOW()
            WHERE tenant_id = $1 AND term_id = $2
            RETURNING {TERM_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(term_id)
        .bind(dates)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update break dates: {}", e))
        })?;

        timer.observe_duration();

        Ok(term)
    }

    // -------------------------------------------------------------------------
    // Grade Term Fee Operations
    // -------------------------------------------------------------------------

    /// Upsert the fee schedule for one (term, grade) pair.
    ///
    /// `total_fee` is always recomputed from the components; a caller-supplied
    /// total is never accepted.
    #[instrument(skip(self, components), fields(tenant_id = %tenant_id, term_id = %term_id, grade = %grade))]
    pub async fn upsert_grade_fee(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
        grade: &str,
        components: &FeeComponents,
    ) -> Result<GradeTermFee, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_grade_fee"])
            .start_timer();

        self.get_term(tenant_id, term_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Term not found")))?;

        let grade_fee = sqlx::query_as::<_, GradeTermFee>(&format!(
            r#"
            INSERT INTO grade_term_fees (
                grade_fee_id, tenant_id, academic_term_id, grade,
                tuition_fee, basic_fee, examination_fee, transport_fee, library_fee,
                sports_fee, activity_fee, hostel_fee, uniform_fee, book_fee, other_fee,
                total_fee
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (tenant_id, academic_term_id, grade)
            DO UPDATE SET
                tuition_fee = EXCLUDED.tuition_fee,
                basic_fee = EXCLUDED.basic_fee,
                examination_fee = EXCLUDED.examination_fee,
                transport_fee = EXCLUDED.transport_fee,
                library_fee = EXCLUDED.library_fee,
                sports_fee = EXCLUDED.sports_fee,
                activity_fee = EXCLUDED.activity_fee,
                hostel_fee = EXCLUDED.hostel_fee,
                uniform_fee = EXCLUDED.uniform_fee,
                book_fee = EXCLUDED.book_fee,
                other_fee = EXCLUDED.other_fee,
                total_fee = EXCLUDED.total_fee,
                updated_utc = NOW()
            RETURNING {GRADE_FEE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(term_id)
        .bind(grade)
        .bind(components.tuition_fee)
        .bind(components.basic_fee)
        .bind(components.examination_fee)
        .bind(components.transport_fee)
        .bind(components.library_fee)
        .bind(components.sports_fee)
        .bind(components.activity_fee)
        .bind(components.hostel_fee)
        .bind(components.uniform_fee)
        .bind(components.book_fee)
        .bind(components.other_fee)
        .bind(components.total())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to upsert grade fee: {}", e))
        })?;

        timer.observe_duration();

        info!(
            grade_fee_id = %grade_fee.grade_fee_id,
            total_fee = %grade_fee.total_fee,
            "Grade fee schedule stored"
        );

        Ok(grade_fee)
    }

    /// List the fee schedules for a term.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, term_id = %term_id))]
    pub async fn list_grade_fees(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
    ) -> Result<Vec<GradeTermFee>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_grade_fees"])
            .start_timer();

        let fees = sqlx::query_as::<_, GradeTermFee>(&format!(
            r#"
            SELECT {GRADE_FEE_COLUMNS}
            FROM grade_term_fees
            WHERE tenant_id = $1 AND academic_term_id = $2
            ORDER BY grade
            "#
        ))
        .bind(tenant_id)
        .bind(term_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list grade fees: {}", e)))?;

        timer.observe_duration();

        Ok(fees)
    }

    // -------------------------------------------------------------------------
    // Billing Operations
    // -------------------------------------------------------------------------

    /// Bill a student for a term.
    ///
    /// The duplicate guard is an existence query, not an entity load, so two
    /// racing calls cannot both observe "not billed" past commit (the unique
    /// (student, term) constraint backs it up). Fee items are a snapshot of
    /// the grade schedule at billing time; later schedule edits leave billed
    /// amounts untouched. Zero-amount components produce no item.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, student_id = %student_id, term_id = %term_id, grade = %grade))]
    pub async fn bill_student(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        term_id: Uuid,
        grade: &str,
        today: NaiveDate,
    ) -> Result<TermLedgerView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["bill_student"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let term = sqlx::query_as::<_, AcademicTerm>(&format!(
            "SELECT {TERM_COLUMNS} FROM academic_terms WHERE tenant_id = $1 AND term_id = $2"
        ))
        .bind(tenant_id)
        .bind(term_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get term: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Term not found")))?;

        if term.status() == TermStatus::Cancelled {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Cannot bill against a cancelled term"
            )));
        }

        let already_billed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM student_term_assignments
                WHERE tenant_id = $1 AND student_id = $2 AND academic_term_id = $3
            )
            "#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .bind(term_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check billing state: {}", e))
        })?;

        if already_billed {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Student is already billed for this term"
            )));
        }

        let schedule = sqlx::query_as::<_, GradeTermFee>(&format!(
            r#"
            SELECT {GRADE_FEE_COLUMNS}
            FROM grade_term_fees
            WHERE tenant_id = $1 AND academic_term_id = $2 AND grade = $3
            "#
        ))
        .bind(tenant_id)
        .bind(term_id)
        .bind(grade)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get grade fee: {}", e)))?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "No fee schedule defined for grade {} in this term",
                grade
            ))
        })?;

        let assignment_id = Uuid::new_v4();
        let mut assignment = sqlx::query_as::<_, StudentTermAssignment>(&format!(
            r#"
            INSERT INTO student_term_assignments (
                assignment_id, tenant_id, student_id, academic_term_id,
                total_term_fee, paid_amount, pending_amount, status,
                is_billed, billing_date, due_date
            )
            VALUES ($1, $2, $3, $4, 0, 0, 0, 'pending', TRUE, $5, $6)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(assignment_id)
        .bind(tenant_id)
        .bind(student_id)
        .bind(term_id)
        .bind(today)
        .bind(term.fee_due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Student is already billed for this term"
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create assignment: {}", e)),
        })?;

        let mut items = Vec::new();
        for draft in draft_fee_items(&schedule.components(), term.fee_due_date, today) {
            let item = sqlx::query_as::<_, TermFeeItem>(&format!(
                r#"
                INSERT INTO term_fee_items (
                    item_id, assignment_id, tenant_id, name, fee_type,
                    amount, paid_amount, due_date, is_mandatory, status
                )
                VALUES ($1, $2, $3, $4, $5, $6, 0, $7, TRUE, $8)
                RETURNING {ITEM_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(assignment_id)
            .bind(tenant_id)
            .bind(&draft.name)
            .bind(draft.fee_type.as_str())
            .bind(draft.amount)
            .bind(term.fee_due_date)
            .bind(draft.status.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to create fee item: {}", e))
            })?;
            items.push(item);
        }

        recalculate(&mut assignment, &items, today);

        let assignment = sqlx::query_as::<_, StudentTermAssignment>(&format!(
            r#"
            UPDATE student_term_assignments
            SET total_term_fee = $3, paid_amount = $4, pending_amount = $5,
                status = $6, updated_utc = NOW()
            WHERE tenant_id = $1 AND assignment_id = $2
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(assignment_id)
        .bind(assignment.total_term_fee)
        .bind(assignment.paid_amount)
        .bind(assignment.pending_amount)
        .bind(&assignment.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to store assignment totals: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();
        STUDENTS_BILLED_TOTAL.with_label_values(&[grade]).inc();

        info!(
            assignment_id = %assignment.assignment_id,
            total_term_fee = %assignment.total_term_fee,
            "Student billed for term"
        );

        Ok(TermLedgerView {
            assignment,
            fee_items: items,
        })
    }

    /// Load one assignment with its fee items.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, student_id = %student_id, term_id = %term_id))]
    pub async fn get_assignment(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        term_id: Uuid,
    ) -> Result<Option<TermLedgerView>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_assignment"])
            .start_timer();

        let assignment = sqlx::query_as::<_, StudentTermAssignment>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM student_term_assignments
            WHERE tenant_id = $1 AND student_id = $2 AND academic_term_id = $3
            "#
        ))
        .bind(tenant_id)
        .bind(student_id)
        .bind(term_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get assignment: {}", e)))?;

        let Some(assignment) = assignment else {
            timer.observe_duration();
            return Ok(None);
        };

        let fee_items = self
            .fee_items_for_assignment(tenant_id, assignment.assignment_id)
            .await?;

        timer.observe_duration();

        Ok(Some(TermLedgerView {
            assignment,
            fee_items,
        }))
    }

    /// List all term assignments for a student with their items, oldest term
    /// first.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, student_id = %student_id))]
    pub async fn list_student_assignments(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<TermLedgerView>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_student_assignments"])
            .start_timer();

        let assignments = sqlx::query_as::<_, StudentTermAssignment>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM student_term_assignments a
            WHERE tenant_id = $1 AND student_id = $2
            ORDER BY (SELECT start_date FROM academic_terms t WHERE t.term_id = a.academic_term_id)
            "#
        ))
        .bind(tenant_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list assignments: {}", e))
        })?;

        let mut views = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let fee_items = self
                .fee_items_for_assignment(tenant_id, assignment.assignment_id)
                .await?;
            views.push(TermLedgerView {
                assignment,
                fee_items,
            });
        }

        timer.observe_duration();

        Ok(views)
    }

    async fn fee_items_for_assignment(
        &self,
        tenant_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<Vec<TermFeeItem>, AppError> {
        sqlx::query_as::<_, TermFeeItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM term_fee_items
            WHERE tenant_id = $1 AND assignment_id = $2
            ORDER BY due_date, item_id
            "#
        ))
        .bind(tenant_id)
        .bind(assignment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get fee items: {}", e)))
    }

    /// Manually add and remove fee items on an assignment, then recalculate.
    ///
    /// Rejected for cancelled/waived assignments, and for removal of items
    /// that already have payments applied. The whole update is one
    /// version-checked transaction.
    #[instrument(skip(self, add, remove), fields(tenant_id = %tenant_id, student_id = %student_id, term_id = %term_id))]
    pub async fn manual_update(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        term_id: Uuid,
        add: &[NewFeeItem],
        remove: &[Uuid],
        today: NaiveDate,
    ) -> Result<TermLedgerView, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["manual_update"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let mut assignment = sqlx::query_as::<_, StudentTermAssignment>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM student_term_assignments
            WHERE tenant_id = $1 AND student_id = $2 AND academic_term_id = $3
            FOR UPDATE
            "#
        ))
        .bind(tenant_id)
        .bind(student_id)
        .bind(term_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get assignment: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Assignment not found")))?;

        if assignment.status().is_administrative() {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Cannot modify fee items on a {} assignment",
                assignment.status
            )));
        }

        for item_id in remove {
            let item = sqlx::query_as::<_, TermFeeItem>(&format!(
                r#"
                SELECT {ITEM_COLUMNS}
                FROM term_fee_items
                WHERE tenant_id = $1 AND assignment_id = $2 AND item_id = $3
                "#
            ))
            .bind(tenant_id)
            .bind(assignment.assignment_id)
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get fee item: {}", e))
            })?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Fee item {} not found on this assignment",
                    item_id
                ))
            })?;

            ensure_removable(&item)?;

            sqlx::query(
                "DELETE FROM term_fee_items WHERE tenant_id = $1 AND assignment_id = $2 AND item_id = $3",
            )
            .bind(tenant_id)
            .bind(assignment.assignment_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to remove fee item: {}", e))
            })?;
        }

        for input in add {
            if input.amount <= Decimal::ZERO {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Fee item amount must be positive, got {}",
                    input.amount
                )));
            }
            let status = derive_fee_status(input.amount, Decimal::ZERO, input.due_date, today);
            sqlx::query(
                r#"
                INSERT INTO term_fee_items (
                    item_id, assignment_id, tenant_id, name, fee_type,
                    amount, paid_amount, due_date, is_mandatory, status
                )
                VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(assignment.assignment_id)
            .bind(tenant_id)
            .bind(&input.name)
            .bind(input.fee_type.as_str())
            .bind(input.amount)
            .bind(input.due_date)
            .bind(input.is_mandatory)
            .bind(status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to add fee item: {}", e))
            })?;
        }

        let mut fee_items = sqlx::query_as::<_, TermFeeItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM term_fee_items
            WHERE tenant_id = $1 AND assignment_id = $2
            ORDER BY due_date, item_id
            "#
        ))
        .bind(tenant_id)
        .bind(assignment.assignment_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get fee items: {}", e)))?;

        // Items that crossed their due date since the last write become
        // overdue here, not just the ones this request touched.
        let stale: Vec<(Uuid, String)> = fee_items
            .iter()
            .map(|i| (i.item_id, i.status.clone()))
            .collect();
        recalculate_items(&mut fee_items, today);
        for item in &fee_items {
            let changed = stale
                .iter()
                .any(|(id, old)| *id == item.item_id && *old != item.status);
            if changed {
                sqlx::query(
                    "UPDATE term_fee_items SET status = $3 WHERE tenant_id = $1 AND item_id = $2",
                )
                .bind(tenant_id)
                .bind(item.item_id)
                .bind(&item.status)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to refresh fee item status: {}",
                        e
                    ))
                })?;
            }
        }

        recalculate(&mut assignment, &fee_items, today);

        let assignment = self
            .store_recalculated_assignment(&mut tx, &assignment)
            .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            assignment_id = %assignment.assignment_id,
            added = add.len(),
            removed = remove.len(),
            "Fee items manually updated"
        );

        Ok(TermLedgerView {
            assignment,
            fee_items,
        })
    }

    /// Apply an administrative cancel/waive override to an assignment.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, assignment_id = %assignment_id))]
    pub async fn set_assignment_override(
        &self,
        tenant_id: Uuid,
        assignment_id: Uuid,
        status: FeeStatus,
    ) -> Result<StudentTermAssignment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_assignment_override"])
            .start_timer();

        if !status.is_administrative() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Only cancelled or waived may be set directly; other statuses are derived"
            )));
        }

        let assignment = sqlx::query_as::<_, StudentTermAssignment>(&format!(
            r#"
            UPDATE student_term_assignments
            SET status = $3, version = version + 1, updated_utc = NOW()
            WHERE tenant_id = $1 AND assignment_id = $2
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(assignment_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to override assignment: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Assignment not found")))?;

        timer.observe_duration();

        info!(
            assignment_id = %assignment.assignment_id,
            status = %assignment.status,
            "Assignment status overridden"
        );

        Ok(assignment)
    }

    // -------------------------------------------------------------------------
    // Payment Allocation
    // -------------------------------------------------------------------------

    /// Allocate a payment across a student's outstanding fee items and persist
    /// the result atomically.
    ///
    /// Outstanding rows are locked for the duration of the transaction and the
    /// final assignment update is version-checked, so a racing payment against
    /// the same assignment fails with a conflict rather than losing an update.
    /// An unapplied remainder is reported to the caller, never stored.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, student_id = %student_id, amount = %amount))]
    pub async fn apply_payment(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
        amount: Decimal,
        apply_to_future_terms: bool,
        today: NaiveDate,
    ) -> Result<AllocationOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_payment"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let rows = sqlx::query_as::<_, OutstandingItemRow>(
            r#"
            SELECT i.item_id, i.assignment_id, t.start_date AS term_start_date,
                   i.due_date, i.amount, i.paid_amount, i.status
            FROM term_fee_items i
            JOIN student_term_assignments a ON a.assignment_id = i.assignment_id
            JOIN academic_terms t ON t.term_id = a.academic_term_id
            WHERE a.tenant_id = $1
              AND a.student_id = $2
              AND a.status NOT IN ('cancelled', 'waived')
              AND i.status IN ('pending', 'partial', 'overdue')
            ORDER BY t.start_date, i.due_date, i.item_id
            FOR UPDATE OF i, a
            "#,
        )
        .bind(tenant_id)
        .bind(student_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load outstanding items: {}", e))
        })?;

        let outstanding: Vec<OutstandingFeeItem> = rows
            .into_iter()
            .map(|r| OutstandingFeeItem {
                item_id: r.item_id,
                assignment_id: r.assignment_id,
                term_start_date: r.term_start_date,
                due_date: r.due_date,
                amount: r.amount,
                paid_amount: r.paid_amount,
                status: FeeStatus::from_string(&r.status),
            })
            .collect();

        let outcome = allocate(amount, &outstanding, apply_to_future_terms, today)?;

        for allocation in &outcome.allocations {
            sqlx::query(
                r#"
                UPDATE term_fee_items
                SET paid_amount = paid_amount + $3, status = $4
                WHERE tenant_id = $1 AND item_id = $2
                "#,
            )
            .bind(tenant_id)
            .bind(allocation.item_id)
            .bind(allocation.amount_applied)
            .bind(allocation.new_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update fee item: {}", e))
            })?;
        }

        for assignment_id in outcome.touched_assignments() {
            let mut assignment = sqlx::query_as::<_, StudentTermAssignment>(&format!(
                r#"
                SELECT {ASSIGNMENT_COLUMNS}
                FROM student_term_assignments
                WHERE tenant_id = $1 AND assignment_id = $2
                "#
            ))
            .bind(tenant_id)
            .bind(assignment_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to reload assignment: {}", e))
            })?;

            let fee_items = sqlx::query_as::<_, TermFeeItem>(&format!(
                r#"
                SELECT {ITEM_COLUMNS}
                FROM term_fee_items
                WHERE tenant_id = $1 AND assignment_id = $2
                ORDER BY due_date, item_id
                "#
            ))
            .bind(tenant_id)
            .bind(assignment_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to reload fee items: {}", e))
            })?;

            recalculate(&mut assignment, &fee_items, today);
            self.store_recalculated_assignment(&mut tx, &assignment)
                .await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        let outcome_label = if outcome.allocations.is_empty() {
            "nothing_outstanding"
        } else if outcome.remaining_unapplied > Decimal::ZERO {
            "remainder_returned"
        } else {
            "fully_applied"
        };
        PAYMENTS_APPLIED_TOTAL
            .with_label_values(&[outcome_label])
            .inc();
        PAYMENT_AMOUNT_TOTAL
            .with_label_values(&["applied"])
            .inc_by(outcome.total_applied.to_f64().unwrap_or(0.0));
        PAYMENT_AMOUNT_TOTAL
            .with_label_values(&["unapplied"])
            .inc_by(outcome.remaining_unapplied.to_f64().unwrap_or(0.0));

        info!(
            total_applied = %outcome.total_applied,
            remaining_unapplied = %outcome.remaining_unapplied,
            items_touched = outcome.allocations.len(),
            "Payment allocated"
        );

        Ok(outcome)
    }

    /// Persist recalculated totals with an optimistic version check.
    async fn store_recalculated_assignment(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        assignment: &StudentTermAssignment,
    ) -> Result<StudentTermAssignment, AppError> {
        sqlx::query_as::<_, StudentTermAssignment>(&format!(
            r#"
            UPDATE student_term_assignments
            SET total_term_fee = $3, paid_amount = $4, pending_amount = $5,
                status = $6, version = version + 1, updated_utc = NOW()
            WHERE tenant_id = $1 AND assignment_id = $2 AND version = $7
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(assignment.tenant_id)
        .bind(assignment.assignment_id)
        .bind(assignment.total_term_fee)
        .bind(assignment.paid_amount)
        .bind(assignment.pending_amount)
        .bind(&assignment.status)
        .bind(assignment.version)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to store assignment totals: {}", e))
        })?
        .ok_or_else(|| {
            AppError::Conflict(anyhow::anyhow!(
                "Assignment was modified concurrently; retry the operation"
            ))
        })
    }

    // -------------------------------------------------------------------------
    // Eligibility
    // -------------------------------------------------------------------------

    /// Classify one student's payment eligibility.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, student_id = %student_id))]
    pub async fn payment_eligibility(
        &self,
        tenant_id: Uuid,
        student_id: Uuid,
    ) -> Result<PaymentEligibility, AppError> {
        let results = self
            .payment_eligibility_batch(tenant_id, &[student_id])
            .await?;
        results.into_iter().next().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!("Eligibility query returned no verdict"))
        })
    }

    /// Classify a batch of students with a single grouped aggregation query.
    ///
    /// Students with no assignment rows simply do not appear in the result
    /// set and classify as NO_TERM_ASSIGNMENTS. Cancelled and waived
    /// assignments are excluded the same way allocation skips them, so a
    /// student whose only assignment is waived classifies as unassigned
    /// rather than eligible for a payment that could never apply.
    #[instrument(skip(self, student_ids), fields(tenant_id = %tenant_id, batch = student_ids.len()))]
    pub async fn payment_eligibility_batch(
        &self,
        tenant_id: Uuid,
        student_ids: &[Uuid],
    ) -> Result<Vec<PaymentEligibility>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["payment_eligibility_batch"])
            .start_timer();

        let rows = sqlx::query_as::<_, EligibilityRow>(
            r#"
            SELECT a.student_id,
                   COUNT(DISTINCT a.assignment_id) AS assignment_count,
                   COUNT(i.item_id) AS fee_item_count,
                   COUNT(i.item_id) FILTER (
                       WHERE i.status IN ('pending', 'partial', 'overdue')
                         AND i.paid_amount < i.amount
                   ) AS unpaid_fee_item_count,
                   COALESCE(SUM(GREATEST(i.amount - i.paid_amount, 0)) FILTER (
                       WHERE i.status IN ('pending', 'partial', 'overdue')
                   ), 0) AS total_pending_amount
            FROM student_term_assignments a
            LEFT JOIN term_fee_items i ON i.assignment_id = a.assignment_id
            WHERE a.tenant_id = $1
              AND a.student_id = ANY($2)
              AND a.status NOT IN ('cancelled', 'waived')
            GROUP BY a.student_id
            "#,
        )
        .bind(tenant_id)
        .bind(student_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to aggregate eligibility: {}", e))
        })?;

        timer.observe_duration();

        let verdicts = student_ids
            .iter()
            .map(|student_id| {
                let aggregates = rows
                    .iter()
                    .find(|r| r.student_id == *student_id)
                    .map(|r| StudentFeeAggregates {
                        assignment_count: r.assignment_count,
                        fee_item_count: r.fee_item_count,
                        unpaid_fee_item_count: r.unpaid_fee_item_count,
                        total_pending_amount: r.total_pending_amount,
                    })
                    .unwrap_or_default();
                classify(*student_id, aggregates)
            })
            .collect();

        Ok(verdicts)
    }

    // -------------------------------------------------------------------------
    // Reporting Reads
    // -------------------------------------------------------------------------

    /// Collection statistics for one term.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, term_id = %term_id))]
    pub async fn term_collection_stats(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
    ) -> Result<TermCollectionStats, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["term_collection_stats"])
            .start_timer();

        let row = sqlx::query_as::<_, CollectionStatsRow>(
            r#"
            SELECT COUNT(*) AS billed_students,
                   COALESCE(SUM(total_term_fee), 0) AS total_billed,
                   COALESCE(SUM(paid_amount), 0) AS total_collected,
                   COALESCE(SUM(pending_amount), 0) AS total_pending
            FROM student_term_assignments
            WHERE tenant_id = $1
              AND academic_term_id = $2
              AND status NOT IN ('cancelled', 'waived')
            "#,
        )
        .bind(tenant_id)
        .bind(term_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute collection stats: {}", e))
        })?;

        timer.observe_duration();

        let collection_rate = if row.total_billed > Decimal::ZERO {
            (row.total_collected / row.total_billed * Decimal::ONE_HUNDRED)
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };

        Ok(TermCollectionStats {
            term_id,
            billed_students: row.billed_students,
            total_billed: row.total_billed,
            total_collected: row.total_collected,
            total_pending: row.total_pending,
            collection_rate,
        })
    }

    /// Assignments past their due date with a pending balance.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, term_id = %term_id))]
    pub async fn overdue_assignments(
        &self,
        tenant_id: Uuid,
        term_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<StudentTermAssignment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["overdue_assignments"])
            .start_timer();

        let assignments = sqlx::query_as::<_, StudentTermAssignment>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM student_term_assignments
            WHERE tenant_id = $1
              AND academic_term_id = $2
              AND due_date < $3
              AND pending_amount > 0
              AND status NOT IN ('cancelled', 'waived')
            ORDER BY due_date, assignment_id
            "#
        ))
        .bind(tenant_id)
        .bind(term_id)
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list overdue assignments: {}", e))
        })?;

        timer.observe_duration();

        Ok(assignments)
    }
}
