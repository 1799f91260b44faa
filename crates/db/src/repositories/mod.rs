//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod budget;
pub mod consolidation;
pub mod glm;
pub mod ledger;

pub use budget::{BudgetRepository, BudgetStatusSummary};
pub use consolidation::{BudgetConsolidationRepository, ConsolidationRepoError};
pub use glm::{GlmBucketBudget, GlmRepository};
pub use ledger::LedgerRepository;
