//! Budget repository for budget and budget period rows.

use glb_core::consolidation::{BudgetPeriodRow, BudgetRow, BudgetStatusChange};
use glb_shared::types::{BudgetSequence, LedgerNumber};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use serde::Serialize;

use crate::entities::{budget_periods, budgets};
use crate::repositories::ledger::LedgerRepository;

/// Posted/unposted budget counts of a ledger's consolidation years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetStatusSummary {
    /// Ledger number.
    pub ledger_number: LedgerNumber,
    /// Current and next financial year.
    pub years: [i32; 2],
    /// Budget rows marked posted.
    pub posted: u64,
    /// Budget rows not yet posted.
    pub unposted: u64,
}

/// Budget repository.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    db: DatabaseConnection,
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Counts posted and unposted budgets for the ledger's current and next
    /// financial year. Returns `None` if the ledger does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn status_summary(
        &self,
        ledger_number: LedgerNumber,
    ) -> Result<Option<BudgetStatusSummary>, DbErr> {
        let Some(ledger) = LedgerRepository::new(self.db.clone())
            .find(ledger_number)
            .await?
        else {
            return Ok(None);
        };
        let years = ledger.consolidation_years();

        let for_years = || {
            budgets::Entity::find()
                .filter(budgets::Column::LedgerNumber.eq(ledger_number.get()))
                .filter(budgets::Column::Year.is_in(years))
        };
        let posted = for_years()
            .filter(budgets::Column::BudgetStatus.eq(true))
            .count(&self.db)
            .await?;
        let unposted = for_years()
            .filter(budgets::Column::BudgetStatus.eq(false))
            .count(&self.db)
            .await?;

        Ok(Some(BudgetStatusSummary {
            ledger_number,
            years,
            posted,
            unposted,
        }))
    }

    /// Loads budgets of `years` ordered by sequence, with their period rows.
    pub(crate) async fn load_for_years<C: ConnectionTrait>(
        conn: &C,
        ledger_number: LedgerNumber,
        years: [i32; 2],
    ) -> Result<(Vec<BudgetRow>, Vec<BudgetPeriodRow>), DbErr> {
        let budgets = budgets::Entity::find()
            .filter(budgets::Column::LedgerNumber.eq(ledger_number.get()))
            .filter(budgets::Column::Year.is_in(years))
            .order_by_asc(budgets::Column::BudgetSequence)
            .all(conn)
            .await?;

        let periods = budget_periods::Entity::find()
            .inner_join(budgets::Entity)
            .filter(budgets::Column::LedgerNumber.eq(ledger_number.get()))
            .filter(budgets::Column::Year.is_in(years))
            .order_by_asc(budget_periods::Column::BudgetSequence)
            .order_by_asc(budget_periods::Column::PeriodNumber)
            .all(conn)
            .await?;

        Ok((
            budgets.into_iter().map(BudgetRow::from).collect(),
            periods.into_iter().map(BudgetPeriodRow::from).collect(),
        ))
    }

    /// Writes changed budget statuses.
    pub(crate) async fn update_statuses<C: ConnectionTrait>(
        conn: &C,
        changes: &[BudgetStatusChange],
    ) -> Result<(), DbErr> {
        for status in [true, false] {
            let sequences: Vec<i32> = changes
                .iter()
                .filter(|c| c.budget_status == status)
                .map(|c| c.budget_sequence.get())
                .collect();
            if sequences.is_empty() {
                continue;
            }
            budgets::Entity::update_many()
                .col_expr(budgets::Column::BudgetStatus, Expr::value(status))
                .filter(budgets::Column::BudgetSequence.is_in(sequences))
                .exec(conn)
                .await?;
        }
        Ok(())
    }
}

impl From<budgets::Model> for BudgetRow {
    fn from(model: budgets::Model) -> Self {
        Self {
            ledger_number: LedgerNumber(model.ledger_number),
            budget_sequence: BudgetSequence(model.budget_sequence),
            year: model.year,
            account_code: model.account_code,
            cost_centre_code: model.cost_centre_code,
            budget_status: model.budget_status,
        }
    }
}

impl From<budget_periods::Model> for BudgetPeriodRow {
    fn from(model: budget_periods::Model) -> Self {
        Self {
            budget_sequence: BudgetSequence(model.budget_sequence),
            period_number: model.period_number,
            budget_base_amount: model.budget_base_amount,
        }
    }
}
