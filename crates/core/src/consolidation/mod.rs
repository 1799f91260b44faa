//! Budget consolidation.
//!
//! Posts ledger budgets into the general ledger master (GLM) period
//! accumulators for the current and next financial year. The driver works on
//! a dataset loaded up front and produces a [`ChangeSet`] that the caller
//! persists in one transaction.

pub mod driver;
pub mod error;
pub mod poster;
pub mod sequence;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use driver::{BudgetConsolidation, ConsolidationPhase, consolidate_in_memory};
pub use error::ConsolidationError;
pub use poster::BudgetPoster;
pub use sequence::{CountingSequences, GlmSequenceAllocator, ReservedSequences};
pub use store::PeriodValueStore;
pub use types::{
    BucketKey, BudgetPeriodRow, BudgetRow, BudgetStatusChange, ChangeSet, ConsolidationDataset,
    ConsolidationOutcome, ConsolidationSummary, GeneralLedgerMasterRow, GlmPeriodRow, Ledger,
};
