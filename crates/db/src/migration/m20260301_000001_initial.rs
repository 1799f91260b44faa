//! Initial database migration.
//!
//! Creates the ledger, budget and general ledger master tables together with
//! the sequences that number budget and GLM rows.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: SEQUENCES
        // ============================================================
        db.execute_unprepared(SEQUENCES_SQL).await?;

        // ============================================================
        // PART 2: LEDGERS
        // ============================================================
        db.execute_unprepared(LEDGERS_SQL).await?;

        // ============================================================
        // PART 3: BUDGETS
        // ============================================================
        db.execute_unprepared(BUDGETS_SQL).await?;
        db.execute_unprepared(BUDGET_PERIODS_SQL).await?;

        // ============================================================
        // PART 4: GENERAL LEDGER MASTER
        // ============================================================
        db.execute_unprepared(GENERAL_LEDGER_MASTERS_SQL).await?;
        db.execute_unprepared(GENERAL_LEDGER_MASTER_PERIODS_SQL)
            .await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const SEQUENCES_SQL: &str = r"
CREATE SEQUENCE seq_budget AS INTEGER START WITH 1;
CREATE SEQUENCE seq_general_ledger_master AS INTEGER START WITH 1;
";

const LEDGERS_SQL: &str = r"
CREATE TABLE ledgers (
    ledger_number INTEGER PRIMARY KEY,
    name VARCHAR(80) NOT NULL,
    current_financial_year INTEGER NOT NULL,
    number_of_accounting_periods INTEGER NOT NULL DEFAULT 12,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_ledger_number_positive CHECK (ledger_number > 0),
    CONSTRAINT chk_accounting_periods CHECK (number_of_accounting_periods BETWEEN 1 AND 20)
);
";

const BUDGETS_SQL: &str = r"
CREATE TABLE budgets (
    budget_sequence INTEGER PRIMARY KEY DEFAULT nextval('seq_budget'),
    ledger_number INTEGER NOT NULL REFERENCES ledgers(ledger_number) ON DELETE CASCADE,
    year INTEGER NOT NULL,
    account_code VARCHAR(8) NOT NULL,
    cost_centre_code VARCHAR(12) NOT NULL,
    budget_status BOOLEAN NOT NULL DEFAULT FALSE,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

ALTER SEQUENCE seq_budget OWNED BY budgets.budget_sequence;

CREATE INDEX idx_budgets_ledger_year ON budgets(ledger_number, year);
CREATE INDEX idx_budgets_bucket ON budgets(ledger_number, year, account_code, cost_centre_code);
";

const BUDGET_PERIODS_SQL: &str = r"
CREATE TABLE budget_periods (
    budget_sequence INTEGER NOT NULL REFERENCES budgets(budget_sequence) ON DELETE CASCADE,
    period_number INTEGER NOT NULL,
    budget_base_amount NUMERIC(24, 10) NOT NULL DEFAULT 0,
    PRIMARY KEY (budget_sequence, period_number),
    CONSTRAINT chk_budget_period_number CHECK (period_number > 0)
);
";

const GENERAL_LEDGER_MASTERS_SQL: &str = r"
CREATE TABLE general_ledger_masters (
    glm_sequence INTEGER PRIMARY KEY DEFAULT nextval('seq_general_ledger_master'),
    ledger_number INTEGER NOT NULL REFERENCES ledgers(ledger_number) ON DELETE CASCADE,
    year INTEGER NOT NULL,
    account_code VARCHAR(8) NOT NULL,
    cost_centre_code VARCHAR(12) NOT NULL,
    CONSTRAINT uq_glm_bucket UNIQUE (ledger_number, year, account_code, cost_centre_code)
);

ALTER SEQUENCE seq_general_ledger_master OWNED BY general_ledger_masters.glm_sequence;
";

const GENERAL_LEDGER_MASTER_PERIODS_SQL: &str = r"
CREATE TABLE general_ledger_master_periods (
    glm_sequence INTEGER NOT NULL REFERENCES general_ledger_masters(glm_sequence) ON DELETE CASCADE,
    period_number INTEGER NOT NULL,
    budget_base_amount NUMERIC(24, 10) NOT NULL DEFAULT 0,
    PRIMARY KEY (glm_sequence, period_number),
    CONSTRAINT chk_glm_period_number CHECK (period_number > 0)
);
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION touch_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_ledgers_updated_at
    BEFORE UPDATE ON ledgers
    FOR EACH ROW EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_budgets_updated_at
    BEFORE UPDATE ON budgets
    FOR EACH ROW EXECUTE FUNCTION touch_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS general_ledger_master_periods CASCADE;
DROP TABLE IF EXISTS general_ledger_masters CASCADE;
DROP TABLE IF EXISTS budget_periods CASCADE;
DROP TABLE IF EXISTS budgets CASCADE;
DROP TABLE IF EXISTS ledgers CASCADE;
DROP FUNCTION IF EXISTS touch_updated_at() CASCADE;
DROP SEQUENCE IF EXISTS seq_general_ledger_master;
DROP SEQUENCE IF EXISTS seq_budget;
";
