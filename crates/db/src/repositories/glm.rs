//! General ledger master repository: GLM rows and their period accumulators.

use glb_core::consolidation::{BucketKey, GeneralLedgerMasterRow, GlmPeriodRow};
use glb_shared::types::{GlmSequence, LedgerNumber};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Statement, Value,
};
use serde::Serialize;

use crate::entities::{general_ledger_master_periods, general_ledger_masters};

/// Rows per multi-row insert, well below the Postgres bind parameter limit.
const INSERT_CHUNK: usize = 1000;

/// Budget accumulators of one GLM bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlmBucketBudget {
    /// GLM row id.
    pub glm_sequence: GlmSequence,
    /// The bucket.
    pub bucket: BucketKey,
    /// Period accumulators, ascending by period number.
    pub periods: Vec<GlmPeriodRow>,
}

/// GLM repository.
#[derive(Debug, Clone)]
pub struct GlmRepository {
    db: DatabaseConnection,
}

impl GlmRepository {
    /// Creates a new GLM repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the budget accumulators of a bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn bucket_budget(&self, bucket: &BucketKey) -> Result<Option<GlmBucketBudget>, DbErr> {
        let Some(glm) = general_ledger_masters::Entity::find()
            .filter(general_ledger_masters::Column::LedgerNumber.eq(bucket.ledger_number.get()))
            .filter(general_ledger_masters::Column::Year.eq(bucket.year))
            .filter(general_ledger_masters::Column::AccountCode.eq(bucket.account_code.as_str()))
            .filter(
                general_ledger_masters::Column::CostCentreCode.eq(bucket.cost_centre_code.as_str()),
            )
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let periods = general_ledger_master_periods::Entity::find()
            .filter(general_ledger_master_periods::Column::GlmSequence.eq(glm.glm_sequence))
            .order_by_asc(general_ledger_master_periods::Column::PeriodNumber)
            .all(&self.db)
            .await?;

        Ok(Some(GlmBucketBudget {
            glm_sequence: GlmSequence(glm.glm_sequence),
            bucket: bucket.clone(),
            periods: periods.into_iter().map(GlmPeriodRow::from).collect(),
        }))
    }

    /// Loads GLM rows of `years` with their period rows.
    pub(crate) async fn load_for_years<C: ConnectionTrait>(
        conn: &C,
        ledger_number: LedgerNumber,
        years: [i32; 2],
    ) -> Result<(Vec<GeneralLedgerMasterRow>, Vec<GlmPeriodRow>), DbErr> {
        let rows = general_ledger_masters::Entity::find()
            .filter(general_ledger_masters::Column::LedgerNumber.eq(ledger_number.get()))
            .filter(general_ledger_masters::Column::Year.is_in(years))
            .order_by_asc(general_ledger_masters::Column::GlmSequence)
            .all(conn)
            .await?;

        let periods = general_ledger_master_periods::Entity::find()
            .inner_join(general_ledger_masters::Entity)
            .filter(general_ledger_masters::Column::LedgerNumber.eq(ledger_number.get()))
            .filter(general_ledger_masters::Column::Year.is_in(years))
            .order_by_asc(general_ledger_master_periods::Column::GlmSequence)
            .order_by_asc(general_ledger_master_periods::Column::PeriodNumber)
            .all(conn)
            .await?;

        Ok((
            rows.into_iter().map(GeneralLedgerMasterRow::from).collect(),
            periods.into_iter().map(GlmPeriodRow::from).collect(),
        ))
    }

    /// Draws `count` values from the GLM sequence.
    pub(crate) async fn reserve_sequences<C: ConnectionTrait>(
        conn: &C,
        count: usize,
    ) -> Result<Vec<GlmSequence>, DbErr> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let count = i64::try_from(count)
            .map_err(|_| DbErr::Custom(format!("cannot reserve {count} GLM sequences")))?;

        let stmt = Statement::from_sql_and_values(
            conn.get_database_backend(),
            "SELECT nextval('seq_general_ledger_master')::integer AS glm_sequence \
             FROM generate_series(1, $1) ORDER BY 1",
            [count.into()],
        );
        let rows = conn.query_all(stmt).await?;
        rows.iter()
            .map(|row| {
                let value: i32 = row.try_get("", "glm_sequence")?;
                Ok(GlmSequence(value))
            })
            .collect()
    }

    /// Inserts new GLM rows.
    pub(crate) async fn insert_rows<C: ConnectionTrait>(
        conn: &C,
        rows: &[GeneralLedgerMasterRow],
    ) -> Result<(), DbErr> {
        for chunk in rows.chunks(INSERT_CHUNK) {
            let models = chunk.iter().map(|row| general_ledger_masters::ActiveModel {
                glm_sequence: Set(row.glm_sequence.get()),
                ledger_number: Set(row.ledger_number.get()),
                year: Set(row.year),
                account_code: Set(row.account_code.clone()),
                cost_centre_code: Set(row.cost_centre_code.clone()),
            });
            general_ledger_masters::Entity::insert_many(models)
                .exec_without_returning(conn)
                .await?;
        }
        Ok(())
    }

    /// Inserts period rows that did not exist before.
    pub(crate) async fn insert_periods<C: ConnectionTrait>(
        conn: &C,
        periods: &[GlmPeriodRow],
    ) -> Result<(), DbErr> {
        for chunk in periods.chunks(INSERT_CHUNK) {
            let models = chunk
                .iter()
                .map(|period| general_ledger_master_periods::ActiveModel {
                    glm_sequence: Set(period.glm_sequence.get()),
                    period_number: Set(period.period_number),
                    budget_base_amount: Set(period.budget_base_amount),
                });
            general_ledger_master_periods::Entity::insert_many(models)
                .exec_without_returning(conn)
                .await?;
        }
        Ok(())
    }

    /// Writes new accumulator values of existing period rows, one
    /// `UPDATE ... FROM (VALUES ...)` per chunk.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotUpdated` if a chunk matched fewer rows than it carries.
    pub(crate) async fn update_periods<C: ConnectionTrait>(
        conn: &C,
        periods: &[GlmPeriodRow],
    ) -> Result<(), DbErr> {
        for chunk in periods.chunks(INSERT_CHUNK) {
            let stmt = update_periods_statement(conn, chunk);
            let result = conn.execute(stmt).await?;
            if usize::try_from(result.rows_affected()).ok() != Some(chunk.len()) {
                return Err(DbErr::RecordNotUpdated);
            }
        }
        Ok(())
    }
}

fn update_periods_statement<C: ConnectionTrait>(conn: &C, chunk: &[GlmPeriodRow]) -> Statement {
    let mut rows = Vec::with_capacity(chunk.len());
    let mut values: Vec<Value> = Vec::with_capacity(chunk.len() * 3);
    for (i, period) in chunk.iter().enumerate() {
        let base = i * 3;
        rows.push(format!(
            "(${}::integer, ${}::integer, ${}::numeric)",
            base + 1,
            base + 2,
            base + 3
        ));
        values.push(period.glm_sequence.get().into());
        values.push(period.period_number.into());
        values.push(period.budget_base_amount.into());
    }

    let sql = format!(
        "UPDATE general_ledger_master_periods AS p \
         SET budget_base_amount = v.budget_base_amount \
         FROM (VALUES {}) AS v(glm_sequence, period_number, budget_base_amount) \
         WHERE p.glm_sequence = v.glm_sequence AND p.period_number = v.period_number",
        rows.join(", ")
    );
    Statement::from_sql_and_values(conn.get_database_backend(), sql, values)
}

impl From<general_ledger_masters::Model> for GeneralLedgerMasterRow {
    fn from(model: general_ledger_masters::Model) -> Self {
        Self {
            ledger_number: LedgerNumber(model.ledger_number),
            year: model.year,
            account_code: model.account_code,
            cost_centre_code: model.cost_centre_code,
            glm_sequence: GlmSequence(model.glm_sequence),
        }
    }
}

impl From<general_ledger_master_periods::Model> for GlmPeriodRow {
    fn from(model: general_ledger_master_periods::Model) -> Self {
        Self {
            glm_sequence: GlmSequence(model.glm_sequence),
            period_number: model.period_number,
            budget_base_amount: model.budget_base_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn period(glm_sequence: i32, period_number: i32) -> GlmPeriodRow {
        GlmPeriodRow {
            glm_sequence: GlmSequence(glm_sequence),
            period_number,
            budget_base_amount: dec!(12.50),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[test]
    fn test_update_statement_binds_three_values_per_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let chunk: Vec<GlmPeriodRow> = (1..=3).map(|p| period(7, p)).collect();

        let stmt = update_periods_statement(&db, &chunk);

        assert!(stmt.sql.starts_with("UPDATE general_ledger_master_periods AS p"));
        assert!(stmt.sql.contains("($7::integer, $8::integer, $9::numeric)"));
        assert!(!stmt.sql.contains("$10"));
        assert_eq!(stmt.values.map(|v| v.0.len()), Some(9));
    }

    #[tokio::test]
    async fn test_update_periods_sends_one_statement_per_chunk() {
        let periods: Vec<GlmPeriodRow> = (1..=3)
            .flat_map(|glm| (1..=12).map(move |p| period(glm, p)))
            .collect();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(36)])
            .into_connection();

        GlmRepository::update_periods(&db, &periods).await.unwrap();

        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn test_update_periods_splits_large_batches() {
        let periods: Vec<GlmPeriodRow> = (1..=1500).map(|glm| period(glm, 1)).collect();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1000), exec(500)])
            .into_connection();

        GlmRepository::update_periods(&db, &periods).await.unwrap();

        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[tokio::test]
    async fn test_update_periods_fails_when_a_row_is_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1)])
            .into_connection();

        let err = GlmRepository::update_periods(&db, &[period(1, 1), period(1, 2)])
            .await
            .unwrap_err();

        assert!(matches!(err, DbErr::RecordNotUpdated));
    }

    #[tokio::test]
    async fn test_update_periods_without_rows_is_a_no_op() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        GlmRepository::update_periods(&db, &[]).await.unwrap();

        assert!(db.into_transaction_log().is_empty());
    }
}
