//! Budget consolidation repository.
//!
//! Runs one consolidation inside a single read-write transaction. The ledger
//! row is locked first, so concurrent runs on the same ledger queue behind
//! it. The transaction stays at `READ COMMITTED`: every load after the lock
//! takes a fresh snapshot and sees what the previous holder committed. The
//! change set is computed in memory and written back before commit. Any
//! failure rolls the whole run back.

use glb_core::consolidation::{
    BudgetConsolidation, ChangeSet, ConsolidationDataset, ConsolidationError,
    ConsolidationSummary, ReservedSequences,
};
use glb_shared::AppError;
use glb_shared::types::LedgerNumber;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel,
    RuntimeErr, TransactionTrait, sqlx,
};
use tracing::{error, info, warn};

use crate::repositories::budget::BudgetRepository;
use crate::repositories::glm::GlmRepository;
use crate::repositories::ledger::LedgerRepository;

/// SQLSTATEs of a transaction aborted by a concurrent one: serialization
/// failure and deadlock.
const CONCURRENCY_SQLSTATES: [&str; 2] = ["40001", "40P01"];

/// Error types for consolidation runs.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidationRepoError {
    /// Consolidation logic rejected the run.
    #[error(transparent)]
    Consolidation(#[from] ConsolidationError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ConsolidationRepoError {
    /// Returns true if the database aborted the transaction because of a
    /// concurrent transaction. The caller may retry the whole run.
    #[must_use]
    pub fn is_concurrency_conflict(&self) -> bool {
        match self {
            Self::Database(e) => {
                sqlstate(e).is_some_and(|code| CONCURRENCY_SQLSTATES.contains(&code.as_str()))
            }
            Self::Consolidation(_) => false,
        }
    }
}

/// SQLSTATE reported by the database server, if the error came from it.
fn sqlstate(err: &DbErr) -> Option<String> {
    let (DbErr::Conn(runtime) | DbErr::Exec(runtime) | DbErr::Query(runtime)) = err else {
        return None;
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db)) => {
            db.code().map(std::borrow::Cow::into_owned)
        }
        _ => None,
    }
}

impl From<ConsolidationRepoError> for AppError {
    fn from(err: ConsolidationRepoError) -> Self {
        if err.is_concurrency_conflict() {
            return Self::Conflict(
                "Ledger was modified concurrently, retry the consolidation".to_string(),
            );
        }
        match err {
            ConsolidationRepoError::Consolidation(ConsolidationError::LedgerNotFound(n)) => {
                Self::NotFound(format!("Ledger {n}"))
            }
            ConsolidationRepoError::Consolidation(e) => Self::Internal(e.to_string()),
            ConsolidationRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Repository that consolidates budgets into the GLM period accumulators.
#[derive(Debug, Clone)]
pub struct BudgetConsolidationRepository {
    db: DatabaseConnection,
}

impl BudgetConsolidationRepository {
    /// Creates a new consolidation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Consolidates all budgets of `ledger_number` for the current and next
    /// financial year.
    ///
    /// With `consolidate_all`, every GLM period accumulator is rebuilt from
    /// scratch. Otherwise only budgets not yet posted are (re)posted.
    ///
    /// # Errors
    ///
    /// Returns `Consolidation(LedgerNotFound)` if the ledger does not exist,
    /// any other `ConsolidationError` raised while posting, or `Database` if
    /// loading, writing or committing fails. Nothing is persisted on error.
    pub async fn consolidate_budgets(
        &self,
        ledger_number: LedgerNumber,
        consolidate_all: bool,
    ) -> Result<ConsolidationSummary, ConsolidationRepoError> {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await?;

        match Self::consolidate_in(&txn, ledger_number, consolidate_all).await {
            Ok((mut run, summary)) => {
                if let Err(e) = txn.commit().await {
                    error!(ledger_number = %ledger_number, error = %e, "Consolidation commit failed");
                    run.roll_back()?;
                    return Err(e.into());
                }
                run.commit()?;
                Ok(summary)
            }
            Err(e) => {
                error!(
                    ledger_number = %ledger_number,
                    consolidate_all,
                    error = %e,
                    "Budget consolidation failed, rolling back"
                );
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed consolidation failed");
                }
                Err(e)
            }
        }
    }

    async fn consolidate_in(
        txn: &DatabaseTransaction,
        ledger_number: LedgerNumber,
        consolidate_all: bool,
    ) -> Result<(BudgetConsolidation, ConsolidationSummary), ConsolidationRepoError> {
        let dataset = Self::load_dataset(txn, ledger_number).await?;
        let mut run = BudgetConsolidation::load(ledger_number, dataset)?;

        let needed = run.missing_buckets(consolidate_all).len();
        let reserved = GlmRepository::reserve_sequences(txn, needed).await?;

        let outcome = run.process(consolidate_all, ReservedSequences::new(reserved))?;

        if let Err(e) = Self::submit_changes(txn, &outcome.changes).await {
            run.roll_back()?;
            return Err(e.into());
        }

        info!(
            ledger_number = %ledger_number,
            consolidate_all,
            budgets_posted = outcome.summary.budgets_posted,
            glm_rows_created = outcome.summary.glm_rows_created,
            glm_periods_touched = outcome.summary.glm_periods_touched,
            "Budget consolidation written"
        );
        Ok((run, outcome.summary))
    }

    /// Locks the ledger and loads everything the run needs.
    ///
    /// The lock must be the first statement of the transaction; the loads
    /// after it run once any concurrent run on the ledger has finished.
    async fn load_dataset(
        txn: &DatabaseTransaction,
        ledger_number: LedgerNumber,
    ) -> Result<ConsolidationDataset, DbErr> {
        let Some(ledger) = LedgerRepository::lock(txn, ledger_number).await? else {
            return Ok(ConsolidationDataset::default());
        };
        let years = ledger.consolidation_years();

        let (budgets, budget_periods) =
            BudgetRepository::load_for_years(txn, ledger_number, years).await?;
        let (glm_rows, glm_periods) =
            GlmRepository::load_for_years(txn, ledger_number, years).await?;

        Ok(ConsolidationDataset {
            ledger: Some(ledger),
            budgets,
            budget_periods,
            glm_rows,
            glm_periods,
        })
    }

    /// Writes a change set: GLM rows first so their period rows can reference
    /// them.
    async fn submit_changes<C: ConnectionTrait>(conn: &C, changes: &ChangeSet) -> Result<(), DbErr> {
        if changes.is_empty() {
            return Ok(());
        }
        BudgetRepository::update_statuses(conn, &changes.budget_status).await?;
        GlmRepository::insert_rows(conn, &changes.new_glm_rows).await?;
        GlmRepository::insert_periods(conn, &changes.added_periods).await?;
        GlmRepository::update_periods(conn, &changes.modified_periods).await?;
        Ok(())
    }
}
