//! Ledger repository.

use glb_core::consolidation::Ledger;
use glb_shared::types::LedgerNumber;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QuerySelect};

use crate::entities::ledgers;

/// Ledger repository for read access and row locking.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a ledger by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find(&self, ledger_number: LedgerNumber) -> Result<Option<Ledger>, DbErr> {
        let ledger = ledgers::Entity::find_by_id(ledger_number.get())
            .one(&self.db)
            .await?;
        Ok(ledger.map(Ledger::from))
    }

    /// Loads a ledger and locks its row (`FOR UPDATE`) until the enclosing
    /// transaction ends.
    pub(crate) async fn lock<C: ConnectionTrait>(
        conn: &C,
        ledger_number: LedgerNumber,
    ) -> Result<Option<Ledger>, DbErr> {
        let ledger = ledgers::Entity::find_by_id(ledger_number.get())
            .lock_exclusive()
            .one(conn)
            .await?;
        Ok(ledger.map(Ledger::from))
    }
}

impl From<ledgers::Model> for Ledger {
    fn from(model: ledgers::Model) -> Self {
        Self {
            ledger_number: LedgerNumber(model.ledger_number),
            name: model.name,
            current_financial_year: model.current_financial_year,
            number_of_accounting_periods: model.number_of_accounting_periods,
        }
    }
}
