//! Budget poster: applies budget amounts to one GLM bucket.

use std::collections::HashMap;

use glb_shared::types::{GlmSequence, LedgerNumber};
use rust_decimal::Decimal;
use tracing::debug;

use super::error::ConsolidationError;
use super::sequence::GlmSequenceAllocator;
use super::store::PeriodValueStore;
use super::types::{BucketKey, BudgetPeriodRow, BudgetRow, GeneralLedgerMasterRow};

/// Posts and unposts budgets against the GLM period accumulators of one ledger.
///
/// Buckets without a GLM row get one on first post, together with zeroed
/// period rows for every accounting period.
#[derive(Debug)]
pub struct BudgetPoster<A> {
    number_of_periods: i32,
    glm_index: HashMap<BucketKey, GlmSequence>,
    created: Vec<GeneralLedgerMasterRow>,
    store: PeriodValueStore,
    allocator: A,
}

impl<A: GlmSequenceAllocator> BudgetPoster<A> {
    /// Creates a poster over the loaded GLM rows and period store.
    pub fn new<'a>(
        number_of_periods: i32,
        glm_rows: impl IntoIterator<Item = &'a GeneralLedgerMasterRow>,
        store: PeriodValueStore,
        allocator: A,
    ) -> Self {
        let glm_index = glm_rows
            .into_iter()
            .map(|row| (row.bucket(), row.glm_sequence))
            .collect();
        Self {
            number_of_periods,
            glm_index,
            created: Vec::new(),
            store,
            allocator,
        }
    }

    /// The underlying period store.
    pub fn store_mut(&mut self) -> &mut PeriodValueStore {
        &mut self.store
    }

    /// GLM sequence of a bucket, if a row exists (loaded or created).
    #[must_use]
    pub fn glm_sequence(&self, bucket: &BucketKey) -> Option<GlmSequence> {
        self.glm_index.get(bucket).copied()
    }

    /// Adds `period_rows` into the accumulators of the budget's bucket,
    /// creating the GLM row and its periods first if the bucket has none.
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound` if a period row falls outside the GLM row's
    /// periods, or `SequenceExhausted` if a new GLM row cannot be numbered.
    pub fn post(
        &mut self,
        ledger_number: LedgerNumber,
        budget_row: &BudgetRow,
        period_rows: &[BudgetPeriodRow],
    ) -> Result<(), ConsolidationError> {
        let mut bucket = budget_row.bucket();
        bucket.ledger_number = ledger_number;
        let glm_sequence = self.find_or_create(bucket)?;

        let mut ordered: Vec<&BudgetPeriodRow> = period_rows.iter().collect();
        ordered.sort_by_key(|r| r.period_number);
        for row in ordered {
            self.store
                .add(glm_sequence, row.period_number, row.budget_base_amount)?;
        }
        Ok(())
    }

    /// Reverses whatever is currently accumulated in the budget's bucket by
    /// posting the negated current value of every period, then marks the
    /// budget unposted.
    ///
    /// # Errors
    ///
    /// Same as [`post`](Self::post).
    pub fn unpost(
        &mut self,
        budget_row: &mut BudgetRow,
        ledger_number: LedgerNumber,
    ) -> Result<(), ConsolidationError> {
        let mut bucket = budget_row.bucket();
        bucket.ledger_number = ledger_number;
        let existing = self.glm_sequence(&bucket);

        let negated: Vec<BudgetPeriodRow> = (1..=self.number_of_periods)
            .map(|period_number| {
                let current = existing.map_or(Decimal::ZERO, |glm| {
                    self.store.get(glm, period_number)
                });
                BudgetPeriodRow {
                    budget_sequence: budget_row.budget_sequence,
                    period_number,
                    budget_base_amount: if current.is_zero() {
                        Decimal::ZERO
                    } else {
                        -current
                    },
                }
            })
            .collect();

        debug!(
            budget_sequence = %budget_row.budget_sequence,
            bucket = %bucket,
            "Unposting budget"
        );
        self.post(ledger_number, budget_row, &negated)?;
        budget_row.budget_status = false;
        Ok(())
    }

    fn find_or_create(&mut self, bucket: BucketKey) -> Result<GlmSequence, ConsolidationError> {
        if let Some(glm_sequence) = self.glm_index.get(&bucket) {
            return Ok(*glm_sequence);
        }

        let glm_sequence = self.allocator.next_glm_sequence()?;
        debug!(bucket = %bucket, glm_sequence = %glm_sequence, "Creating GLM row");
        self.store.create_periods(glm_sequence, self.number_of_periods);
        self.created
            .push(GeneralLedgerMasterRow::for_bucket(&bucket, glm_sequence));
        self.glm_index.insert(bucket, glm_sequence);
        Ok(glm_sequence)
    }

    /// Finishes posting, returning the GLM rows created and the period store.
    pub fn finish(self) -> (Vec<GeneralLedgerMasterRow>, PeriodValueStore) {
        (self.created, self.store)
    }
}
