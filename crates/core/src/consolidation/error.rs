//! Consolidation error types.

use glb_shared::types::{GlmSequence, LedgerNumber};
use thiserror::Error;

use super::driver::ConsolidationPhase;

/// Consolidation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsolidationError {
    /// Ledger does not exist.
    #[error("Ledger not found: {0}")]
    LedgerNotFound(LedgerNumber),

    /// A GLM period row was required but missing.
    #[error("GLM period not found: glm {glm_sequence}, period {period_number}")]
    PeriodNotFound {
        /// GLM row.
        glm_sequence: GlmSequence,
        /// Period number.
        period_number: i32,
    },

    /// More GLM rows were created than sequence values were reserved.
    #[error("No GLM sequence values left to allocate")]
    SequenceExhausted,

    /// Driver was asked to move between incompatible phases.
    #[error("Invalid consolidation phase transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current phase.
        from: ConsolidationPhase,
        /// Requested phase.
        to: ConsolidationPhase,
    },
}
