//! Period value store: GLM period accumulators with staged-change tracking.

use std::collections::BTreeMap;

use glb_shared::types::GlmSequence;
use rust_decimal::Decimal;

use super::error::ConsolidationError;
use super::types::GlmPeriodRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    Unchanged,
    Added,
    Modified,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    amount: Decimal,
    state: RowState,
}

/// Budget accumulators keyed by `(glm_sequence, period_number)`.
///
/// Loaded rows start unchanged. Rows materialized by [`get`](Self::get) or
/// [`create_periods`](Self::create_periods) are staged as added; any change
/// to a loaded row stages it as modified.
#[derive(Debug, Clone, Default)]
pub struct PeriodValueStore {
    entries: BTreeMap<(GlmSequence, i32), Entry>,
}

impl PeriodValueStore {
    /// Creates a store holding the persisted period rows.
    #[must_use]
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a GlmPeriodRow>) -> Self {
        let entries = rows
            .into_iter()
            .map(|row| {
                (
                    (row.glm_sequence, row.period_number),
                    Entry {
                        amount: row.budget_base_amount,
                        state: RowState::Unchanged,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Returns the current accumulator, staging a zeroed row if none exists.
    pub fn get(&mut self, glm_sequence: GlmSequence, period_number: i32) -> Decimal {
        self.entries
            .entry((glm_sequence, period_number))
            .or_insert(Entry {
                amount: Decimal::ZERO,
                state: RowState::Added,
            })
            .amount
    }

    /// Returns the accumulator without materializing anything.
    #[must_use]
    pub fn peek(&self, glm_sequence: GlmSequence, period_number: i32) -> Option<Decimal> {
        self.entries
            .get(&(glm_sequence, period_number))
            .map(|e| e.amount)
    }

    /// Adds `delta` to an existing accumulator.
    ///
    /// # Errors
    ///
    /// Returns `ConsolidationError::PeriodNotFound` if the row does not exist,
    /// which means the GLM row was never created for this bucket.
    pub fn add(
        &mut self,
        glm_sequence: GlmSequence,
        period_number: i32,
        delta: Decimal,
    ) -> Result<(), ConsolidationError> {
        let entry = self
            .entries
            .get_mut(&(glm_sequence, period_number))
            .ok_or(ConsolidationError::PeriodNotFound {
                glm_sequence,
                period_number,
            })?;

        if !delta.is_zero() {
            entry.amount += delta;
            entry.mark_modified();
        }
        Ok(())
    }

    /// Sets the accumulator to zero. No-op if the row is absent.
    pub fn clear(&mut self, glm_sequence: GlmSequence, period_number: i32) {
        if let Some(entry) = self.entries.get_mut(&(glm_sequence, period_number))
            && !entry.amount.is_zero()
        {
            entry.amount = Decimal::ZERO;
            entry.mark_modified();
        }
    }

    /// Stages zeroed rows for periods `1..=periods` that do not exist yet.
    pub fn create_periods(&mut self, glm_sequence: GlmSequence, periods: i32) {
        for period_number in 1..=periods {
            self.get(glm_sequence, period_number);
        }
    }

    /// Staged `(added, modified)` rows, ascending by `(glm_sequence, period_number)`.
    #[must_use]
    pub fn changes(&self) -> (Vec<GlmPeriodRow>, Vec<GlmPeriodRow>) {
        let mut added = Vec::new();
        let mut modified = Vec::new();
        for (&(glm_sequence, period_number), entry) in &self.entries {
            let row = GlmPeriodRow {
                glm_sequence,
                period_number,
                budget_base_amount: entry.amount,
            };
            match entry.state {
                RowState::Added => added.push(row),
                RowState::Modified => modified.push(row),
                RowState::Unchanged => {}
            }
        }
        (added, modified)
    }
}

impl Entry {
    fn mark_modified(&mut self) {
        if self.state == RowState::Unchanged {
            self.state = RowState::Modified;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(glm: i32, period: i32, amount: Decimal) -> GlmPeriodRow {
        GlmPeriodRow {
            glm_sequence: GlmSequence(glm),
            period_number: period,
            budget_base_amount: amount,
        }
    }

    #[test]
    fn test_get_returns_loaded_value() {
        let loaded = [row(1, 1, dec!(250.00))];
        let mut store = PeriodValueStore::from_rows(&loaded);

        assert_eq!(store.get(GlmSequence(1), 1), dec!(250.00));
        let (added, modified) = store.changes();
        assert!(added.is_empty());
        assert!(modified.is_empty());
    }

    #[test]
    fn test_get_materializes_zero_placeholder() {
        let mut store = PeriodValueStore::default();

        assert_eq!(store.get(GlmSequence(7), 3), Decimal::ZERO);
        assert_eq!(store.peek(GlmSequence(7), 3), Some(Decimal::ZERO));
        let (added, _) = store.changes();
        assert_eq!(added, vec![row(7, 3, Decimal::ZERO)]);
    }

    #[test]
    fn test_add_accumulates() {
        let loaded = [row(1, 1, dec!(10))];
        let mut store = PeriodValueStore::from_rows(&loaded);

        store.add(GlmSequence(1), 1, dec!(5.50)).unwrap();
        store.add(GlmSequence(1), 1, dec!(-2.25)).unwrap();

        assert_eq!(store.peek(GlmSequence(1), 1), Some(dec!(13.25)));
        let (_, modified) = store.changes();
        assert_eq!(modified, vec![row(1, 1, dec!(13.25))]);
    }

    #[test]
    fn test_add_to_missing_row_fails() {
        let mut store = PeriodValueStore::default();

        let err = store.add(GlmSequence(9), 4, dec!(1)).unwrap_err();
        assert_eq!(
            err,
            ConsolidationError::PeriodNotFound {
                glm_sequence: GlmSequence(9),
                period_number: 4
            }
        );
    }

    #[test]
    fn test_add_zero_leaves_row_unchanged() {
        let loaded = [row(1, 1, dec!(10))];
        let mut store = PeriodValueStore::from_rows(&loaded);

        store.add(GlmSequence(1), 1, Decimal::ZERO).unwrap();
        let (_, modified) = store.changes();
        assert!(modified.is_empty());
    }

    #[test]
    fn test_clear_is_noop_for_missing_row() {
        let mut store = PeriodValueStore::default();
        store.clear(GlmSequence(1), 1);

        assert_eq!(store.peek(GlmSequence(1), 1), None);
        let (added, modified) = store.changes();
        assert!(added.is_empty() && modified.is_empty());
    }

    #[test]
    fn test_clear_zeroes_loaded_row() {
        let loaded = [row(1, 2, dec!(99.99))];
        let mut store = PeriodValueStore::from_rows(&loaded);

        store.clear(GlmSequence(1), 2);
        assert_eq!(store.peek(GlmSequence(1), 2), Some(Decimal::ZERO));
        let (_, modified) = store.changes();
        assert_eq!(modified, vec![row(1, 2, Decimal::ZERO)]);
    }

    #[test]
    fn test_added_row_stays_added_after_add() {
        let mut store = PeriodValueStore::default();
        store.create_periods(GlmSequence(3), 2);
        store.add(GlmSequence(3), 2, dec!(40)).unwrap();

        let (added, modified) = store.changes();
        assert_eq!(
            added,
            vec![row(3, 1, Decimal::ZERO), row(3, 2, dec!(40))]
        );
        assert!(modified.is_empty());
    }
}
