//! `SeaORM` entity definitions.

pub mod budget_periods;
pub mod budgets;
pub mod general_ledger_master_periods;
pub mod general_ledger_masters;
pub mod ledgers;
