//! Consolidation driver: reconciles all budgets of a ledger with the GLM
//! period accumulators for the current and next financial year.

use glb_shared::types::LedgerNumber;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::ConsolidationError;
use super::poster::BudgetPoster;
use super::sequence::GlmSequenceAllocator;
use super::store::PeriodValueStore;
use super::types::{
    BucketKey, BudgetStatusChange, ChangeSet, ConsolidationDataset, ConsolidationOutcome,
    ConsolidationSummary, Ledger,
};

/// Phase of one consolidation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationPhase {
    /// Dataset loaded, nothing processed yet.
    Loaded,
    /// Change set computed, waiting to be persisted.
    Processing,
    /// Changes persisted.
    Committed,
    /// Run aborted; nothing persisted.
    RolledBack,
}

/// One consolidation run over a loaded dataset.
///
/// `Loaded -> Processing -> Committed`, or `RolledBack` from any phase
/// before `Committed`.
#[derive(Debug)]
pub struct BudgetConsolidation {
    ledger: Ledger,
    dataset: ConsolidationDataset,
    phase: ConsolidationPhase,
}

impl BudgetConsolidation {
    /// Starts a run over `dataset`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerNotFound` if the dataset carries no ledger.
    pub fn load(
        ledger_number: LedgerNumber,
        mut dataset: ConsolidationDataset,
    ) -> Result<Self, ConsolidationError> {
        let ledger = dataset
            .ledger
            .take()
            .ok_or(ConsolidationError::LedgerNotFound(ledger_number))?;
        info!(
            ledger_number = %ledger.ledger_number,
            budgets = dataset.budgets.len(),
            glm_rows = dataset.glm_rows.len(),
            "Consolidation dataset loaded"
        );
        Ok(Self {
            ledger,
            dataset,
            phase: ConsolidationPhase::Loaded,
        })
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> ConsolidationPhase {
        self.phase
    }

    /// The ledger being consolidated.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Buckets that processing will create a GLM row for, in ascending order.
    ///
    /// Every budget that will be posted or unposted targets its bucket; those
    /// without a loaded GLM row get one.
    #[must_use]
    pub fn missing_buckets(&self, consolidate_all: bool) -> Vec<BucketKey> {
        let mut missing: Vec<BucketKey> = self
            .dataset
            .budgets
            .iter()
            .filter(|b| !b.budget_status || consolidate_all)
            .map(|b| {
                let mut bucket = b.bucket();
                bucket.ledger_number = self.ledger.ledger_number;
                bucket
            })
            .filter(|bucket| self.dataset.glm_for(bucket).is_none())
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Computes the change set.
    ///
    /// With `consolidate_all`, every budget is marked unposted and every GLM
    /// period accumulator cleared before reposting all budgets. Otherwise,
    /// budgets whose status is unposted are unposted again (reversing their
    /// bucket) and then reposted. Afterwards every budget is marked posted.
    ///
    /// Moves `Loaded -> Processing`; on error the run is `RolledBack`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if not in `Loaded`, or any posting error.
    pub fn process<A: GlmSequenceAllocator>(
        &mut self,
        consolidate_all: bool,
        allocator: A,
    ) -> Result<ConsolidationOutcome, ConsolidationError> {
        self.transition(ConsolidationPhase::Loaded, ConsolidationPhase::Processing)?;

        match self.run(consolidate_all, allocator) {
            Ok(outcome) => {
                info!(
                    ledger_number = %self.ledger.ledger_number,
                    consolidate_all,
                    budgets_posted = outcome.summary.budgets_posted,
                    budgets_unposted = outcome.summary.budgets_unposted,
                    glm_rows_created = outcome.summary.glm_rows_created,
                    glm_periods_touched = outcome.summary.glm_periods_touched,
                    "Consolidation processed"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.phase = ConsolidationPhase::RolledBack;
                Err(e)
            }
        }
    }

    /// Marks the change set as persisted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if not in `Processing`.
    pub fn commit(&mut self) -> Result<(), ConsolidationError> {
        self.transition(ConsolidationPhase::Processing, ConsolidationPhase::Committed)?;
        info!(ledger_number = %self.ledger.ledger_number, "Consolidation committed");
        Ok(())
    }

    /// Marks the run as aborted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if already `Committed`.
    pub fn roll_back(&mut self) -> Result<(), ConsolidationError> {
        if self.phase == ConsolidationPhase::Committed {
            return Err(ConsolidationError::InvalidTransition {
                from: self.phase,
                to: ConsolidationPhase::RolledBack,
            });
        }
        self.phase = ConsolidationPhase::RolledBack;
        info!(ledger_number = %self.ledger.ledger_number, "Consolidation rolled back");
        Ok(())
    }

    fn transition(
        &mut self,
        from: ConsolidationPhase,
        to: ConsolidationPhase,
    ) -> Result<(), ConsolidationError> {
        if self.phase != from {
            return Err(ConsolidationError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }

    fn run<A: GlmSequenceAllocator>(
        &self,
        consolidate_all: bool,
        allocator: A,
    ) -> Result<ConsolidationOutcome, ConsolidationError> {
        let ledger_number = self.ledger.ledger_number;
        let number_of_periods = self.ledger.number_of_accounting_periods;
        let periods_by_budget = self.dataset.periods_by_budget();

        let mut budgets = self.dataset.budgets.clone();
        let mut poster = BudgetPoster::new(
            number_of_periods,
            &self.dataset.glm_rows,
            PeriodValueStore::from_rows(&self.dataset.glm_periods),
            allocator,
        );
        let mut summary = ConsolidationSummary::default();

        if consolidate_all {
            for budget in &mut budgets {
                budget.budget_status = false;
            }
            for glm in &self.dataset.glm_rows {
                for period_number in self.ledger.periods() {
                    poster.store_mut().clear(glm.glm_sequence, period_number);
                }
            }
        } else {
            // Rows already marked unposted are unposted again before reposting.
            for budget in budgets.iter_mut().filter(|b| !b.budget_status) {
                poster.unpost(budget, ledger_number)?;
                summary.budgets_unposted += 1;
            }
        }

        for budget in &budgets {
            if !budget.budget_status || consolidate_all {
                let period_rows = periods_by_budget
                    .get(&budget.budget_sequence)
                    .map_or(&[][..], Vec::as_slice);
                debug!(
                    budget_sequence = %budget.budget_sequence,
                    periods = period_rows.len(),
                    "Posting budget"
                );
                poster.post(ledger_number, budget, period_rows)?;
                summary.budgets_posted += 1;
            }
        }

        for budget in &mut budgets {
            budget.budget_status = true;
        }

        let (new_glm_rows, mut store) = poster.finish();
        for glm_sequence in self
            .dataset
            .glm_rows
            .iter()
            .chain(new_glm_rows.iter())
            .map(|g| g.glm_sequence)
        {
            store.create_periods(glm_sequence, number_of_periods);
        }

        let budget_status = self
            .dataset
            .budgets
            .iter()
            .zip(&budgets)
            .filter(|(before, after)| before.budget_status != after.budget_status)
            .map(|(_, after)| BudgetStatusChange {
                budget_sequence: after.budget_sequence,
                budget_status: after.budget_status,
            })
            .collect();
        let (added_periods, modified_periods) = store.changes();

        summary.glm_rows_created = new_glm_rows.len();
        summary.glm_periods_touched = added_periods.len() + modified_periods.len();

        Ok(ConsolidationOutcome {
            changes: ChangeSet {
                budget_status,
                new_glm_rows,
                added_periods,
                modified_periods,
            },
            summary,
        })
    }
}

/// Runs a full consolidation in memory and applies the result to `dataset`.
///
/// # Errors
///
/// Returns any error from [`BudgetConsolidation::process`].
pub fn consolidate_in_memory<A: GlmSequenceAllocator>(
    dataset: &mut ConsolidationDataset,
    ledger_number: LedgerNumber,
    consolidate_all: bool,
    allocator: A,
) -> Result<ConsolidationSummary, ConsolidationError> {
    let mut run = BudgetConsolidation::load(ledger_number, dataset.clone())?;
    let outcome = run.process(consolidate_all, allocator)?;
    dataset.apply(&outcome.changes);
    run.commit()?;
    Ok(outcome.summary)
}
