//! Scenario and property tests for budget consolidation.

use glb_shared::types::{BudgetSequence, GlmSequence, LedgerNumber};
use proptest::prelude::*;
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::driver::{BudgetConsolidation, ConsolidationPhase, consolidate_in_memory};
use super::error::ConsolidationError;
use super::sequence::{CountingSequences, ReservedSequences};
use super::types::{
    BudgetPeriodRow, BudgetRow, ConsolidationDataset, GeneralLedgerMasterRow, GlmPeriodRow,
    Ledger,
};

const LEDGER: LedgerNumber = LedgerNumber(43);

fn ledger(periods: i32) -> Ledger {
    Ledger {
        ledger_number: LEDGER,
        name: "Test Ledger".to_string(),
        current_financial_year: 2024,
        number_of_accounting_periods: periods,
    }
}

fn budget(seq: i32, year: i32, account: &str, cost_centre: &str, posted: bool) -> BudgetRow {
    BudgetRow {
        ledger_number: LEDGER,
        budget_sequence: BudgetSequence(seq),
        year,
        account_code: account.to_string(),
        cost_centre_code: cost_centre.to_string(),
        budget_status: posted,
    }
}

fn flat_periods(seq: i32, periods: i32, amount: Decimal) -> Vec<BudgetPeriodRow> {
    (1..=periods)
        .map(|period_number| BudgetPeriodRow {
            budget_sequence: BudgetSequence(seq),
            period_number,
            budget_base_amount: amount,
        })
        .collect()
}

fn accumulators(dataset: &ConsolidationDataset, account: &str, year: i32) -> Vec<Decimal> {
    let glm = dataset
        .glm_rows
        .iter()
        .find(|g| g.account_code == account && g.year == year)
        .expect("GLM row exists");
    let mut rows: Vec<&GlmPeriodRow> = dataset
        .glm_periods
        .iter()
        .filter(|p| p.glm_sequence == glm.glm_sequence)
        .collect();
    rows.sort_by_key(|p| p.period_number);
    rows.iter().map(|p| p.budget_base_amount).collect()
}

/// Ledger 43, 12 periods, one budget of 12 x 100.00 on 4000/BASE for 2024.
fn ledger_43_scenario() -> ConsolidationDataset {
    let mut dataset = ConsolidationDataset::for_ledger(ledger(12));
    dataset.budgets.push(budget(1, 2024, "4000", "BASE", false));
    dataset.budget_periods = flat_periods(1, 12, dec!(100.00));
    dataset
}

#[test]
fn test_ledger_43_consolidate_all() {
    let mut dataset = ledger_43_scenario();

    let summary =
        consolidate_in_memory(&mut dataset, LEDGER, true, CountingSequences::starting_at(1))
            .unwrap();

    assert_eq!(summary.budgets_posted, 1);
    assert_eq!(summary.glm_rows_created, 1);
    assert_eq!(summary.glm_periods_touched, 12);
    assert_eq!(accumulators(&dataset, "4000", 2024), vec![dec!(100.00); 12]);
    assert!(dataset.budgets[0].budget_status);
}

#[rstest]
#[case::consolidate_all(true, 0)]
#[case::incremental(false, 1)]
fn test_fresh_ledger_posts_in_either_mode(#[case] consolidate_all: bool, #[case] unposted: usize) {
    let mut dataset = ledger_43_scenario();

    let summary = consolidate_in_memory(
        &mut dataset,
        LEDGER,
        consolidate_all,
        CountingSequences::starting_at(1),
    )
    .unwrap();

    assert_eq!(summary.budgets_posted, 1);
    assert_eq!(summary.budgets_unposted, unposted);
    assert_eq!(summary.glm_rows_created, 1);
    assert_eq!(accumulators(&dataset, "4000", 2024), vec![dec!(100.00); 12]);
}

#[test]
fn test_ledger_43_incremental_run_leaves_posted_budget_alone() {
    let mut dataset = ledger_43_scenario();
    consolidate_in_memory(&mut dataset, LEDGER, true, CountingSequences::starting_at(1)).unwrap();

    let summary =
        consolidate_in_memory(&mut dataset, LEDGER, false, CountingSequences::starting_at(100))
            .unwrap();

    assert_eq!(summary.budgets_posted, 0);
    assert_eq!(summary.budgets_unposted, 0);
    assert_eq!(summary.glm_periods_touched, 0);
    assert_eq!(accumulators(&dataset, "4000", 2024), vec![dec!(100.00); 12]);
    assert!(dataset.budgets[0].budget_status);
}

#[test]
fn test_missing_ledger_is_not_found() {
    let err = BudgetConsolidation::load(LEDGER, ConsolidationDataset::default()).unwrap_err();
    assert_eq!(err, ConsolidationError::LedgerNotFound(LEDGER));
}

#[test]
fn test_consolidate_all_clears_stale_accumulators() {
    let mut dataset = ConsolidationDataset::for_ledger(ledger(2));
    dataset.glm_rows.push(GeneralLedgerMasterRow {
        ledger_number: LEDGER,
        year: 2024,
        account_code: "9999".to_string(),
        cost_centre_code: "BASE".to_string(),
        glm_sequence: GlmSequence(5),
    });
    dataset.glm_periods = (1..=2)
        .map(|period_number| GlmPeriodRow {
            glm_sequence: GlmSequence(5),
            period_number,
            budget_base_amount: dec!(42),
        })
        .collect();

    consolidate_in_memory(&mut dataset, LEDGER, true, CountingSequences::starting_at(10)).unwrap();

    assert_eq!(accumulators(&dataset, "9999", 2024), vec![dec!(0), dec!(0)]);
}

#[test]
fn test_incremental_run_reposts_unposted_budget_only() {
    let mut dataset = ConsolidationDataset::for_ledger(ledger(2));
    dataset.budgets.push(budget(1, 2024, "4000", "BASE", false));
    dataset.budgets.push(budget(2, 2024, "5000", "BASE", false));
    dataset.budget_periods = flat_periods(1, 2, dec!(10));
    dataset.budget_periods.extend(flat_periods(2, 2, dec!(20)));
    consolidate_in_memory(&mut dataset, LEDGER, true, CountingSequences::starting_at(1)).unwrap();

    // The planner edits budget 2 and flags it unposted again.
    dataset.budgets[1].budget_status = false;
    for row in dataset
        .budget_periods
        .iter_mut()
        .filter(|r| r.budget_sequence == BudgetSequence(2))
    {
        row.budget_base_amount = dec!(35);
    }

    let summary =
        consolidate_in_memory(&mut dataset, LEDGER, false, CountingSequences::starting_at(50))
            .unwrap();

    assert_eq!(summary.budgets_unposted, 1);
    assert_eq!(summary.budgets_posted, 1);
    assert_eq!(accumulators(&dataset, "4000", 2024), vec![dec!(10), dec!(10)]);
    assert_eq!(accumulators(&dataset, "5000", 2024), vec![dec!(35), dec!(35)]);
    assert!(dataset.budgets.iter().all(|b| b.budget_status));
}

#[test]
fn test_budgets_sharing_a_bucket_sum_up() {
    let mut dataset = ConsolidationDataset::for_ledger(ledger(3));
    dataset.budgets.push(budget(1, 2025, "4000", "BASE", false));
    dataset.budgets.push(budget(2, 2025, "4000", "BASE", false));
    dataset.budget_periods = flat_periods(1, 3, dec!(1.25));
    dataset.budget_periods.extend(flat_periods(2, 3, dec!(2.50)));

    let summary =
        consolidate_in_memory(&mut dataset, LEDGER, true, CountingSequences::starting_at(1))
            .unwrap();

    assert_eq!(summary.glm_rows_created, 1);
    assert_eq!(accumulators(&dataset, "4000", 2025), vec![dec!(3.75); 3]);
}

#[test]
fn test_missing_buckets_drive_sequence_reservation() {
    let mut dataset = ConsolidationDataset::for_ledger(ledger(12));
    dataset.budgets.push(budget(1, 2024, "4000", "BASE", false));
    dataset.budgets.push(budget(2, 2024, "4000", "BASE", false));
    dataset.budgets.push(budget(3, 2025, "4000", "BASE", false));
    dataset.budgets.push(budget(4, 2024, "5000", "BASE", true));

    let run = BudgetConsolidation::load(LEDGER, dataset.clone()).unwrap();
    assert_eq!(run.missing_buckets(false).len(), 2);
    assert_eq!(run.missing_buckets(true).len(), 3);

    let mut run = BudgetConsolidation::load(LEDGER, dataset).unwrap();
    let needed = run.missing_buckets(true).len();
    let reserved = ReservedSequences::new(
        (0..needed).map(|i| GlmSequence(900 + i32::try_from(i).unwrap())),
    );
    let outcome = run.process(true, reserved).unwrap();
    assert_eq!(outcome.changes.new_glm_rows.len(), 3);
}

#[test]
fn test_too_few_reserved_sequences_rolls_back() {
    let mut run = BudgetConsolidation::load(LEDGER, ledger_43_scenario()).unwrap();

    let err = run.process(true, ReservedSequences::default()).unwrap_err();

    assert_eq!(err, ConsolidationError::SequenceExhausted);
    assert_eq!(run.phase(), ConsolidationPhase::RolledBack);
}

#[test]
fn test_budget_period_outside_ledger_periods_aborts_run() {
    let mut dataset = ledger_43_scenario();
    dataset.budget_periods.push(BudgetPeriodRow {
        budget_sequence: BudgetSequence(1),
        period_number: 13,
        budget_base_amount: dec!(1),
    });
    let mut run = BudgetConsolidation::load(LEDGER, dataset).unwrap();

    let err = run.process(true, CountingSequences::starting_at(1)).unwrap_err();

    assert!(matches!(err, ConsolidationError::PeriodNotFound { period_number: 13, .. }));
    assert_eq!(run.phase(), ConsolidationPhase::RolledBack);
}

#[test]
fn test_phase_transitions() {
    let mut run = BudgetConsolidation::load(LEDGER, ledger_43_scenario()).unwrap();
    assert_eq!(run.phase(), ConsolidationPhase::Loaded);

    assert!(matches!(
        run.commit(),
        Err(ConsolidationError::InvalidTransition { .. })
    ));

    run.process(true, CountingSequences::starting_at(1)).unwrap();
    assert_eq!(run.phase(), ConsolidationPhase::Processing);
    assert!(run.process(true, CountingSequences::starting_at(1)).is_err());

    run.commit().unwrap();
    assert_eq!(run.phase(), ConsolidationPhase::Committed);
    assert!(run.roll_back().is_err());
}

#[test]
fn test_missing_glm_periods_are_materialized() {
    let mut dataset = ConsolidationDataset::for_ledger(ledger(4));
    dataset.glm_rows.push(GeneralLedgerMasterRow {
        ledger_number: LEDGER,
        year: 2024,
        account_code: "6000".to_string(),
        cost_centre_code: "BASE".to_string(),
        glm_sequence: GlmSequence(3),
    });
    dataset.glm_periods.push(GlmPeriodRow {
        glm_sequence: GlmSequence(3),
        period_number: 1,
        budget_base_amount: dec!(0),
    });

    let mut run = BudgetConsolidation::load(LEDGER, dataset).unwrap();
    let outcome = run.process(false, CountingSequences::starting_at(1)).unwrap();

    let added: Vec<i32> = outcome
        .changes
        .added_periods
        .iter()
        .map(|p| p.period_number)
        .collect();
    assert_eq!(added, vec![2, 3, 4]);
}

#[test]
fn test_empty_ledger_produces_no_changes() {
    let mut run =
        BudgetConsolidation::load(LEDGER, ConsolidationDataset::for_ledger(ledger(12))).unwrap();
    let outcome = run.process(true, CountingSequences::starting_at(1)).unwrap();
    assert!(outcome.changes.is_empty());
}

// ============================================================================
// Properties
// ============================================================================

/// Strategy for budget amounts with two decimal places, positive or negative.
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Up to six budgets spread over a handful of buckets, four periods each.
fn dataset_strategy() -> impl Strategy<Value = ConsolidationDataset> {
    prop::collection::vec(
        (
            0usize..3,
            0i32..2,
            any::<bool>(),
            prop::collection::vec(amount_strategy(), 4),
        ),
        0..6,
    )
    .prop_map(|specs| {
        let accounts = ["4000", "5000", "6000"];
        let mut dataset = ConsolidationDataset::for_ledger(ledger(4));
        for (i, (account, year_offset, posted, amounts)) in specs.into_iter().enumerate() {
            let seq = i32::try_from(i).unwrap() + 1;
            dataset.budgets.push(budget(
                seq,
                2024 + year_offset,
                accounts[account],
                "BASE",
                posted,
            ));
            dataset
                .budget_periods
                .extend(amounts.into_iter().zip(1..).map(|(amount, period_number)| {
                    BudgetPeriodRow {
                        budget_sequence: BudgetSequence(seq),
                        period_number,
                        budget_base_amount: amount,
                    }
                }));
        }
        dataset
    })
}

fn expected_bucket_total(
    dataset: &ConsolidationDataset,
    glm: &GeneralLedgerMasterRow,
    period_number: i32,
) -> Decimal {
    dataset
        .budgets
        .iter()
        .filter(|b| b.bucket() == glm.bucket())
        .flat_map(move |b| {
            dataset
                .budget_periods
                .iter()
                .filter(move |p| p.budget_sequence == b.budget_sequence)
        })
        .filter(|p| p.period_number == period_number)
        .map(|p| p.budget_base_amount)
        .sum()
}

proptest! {
    /// After consolidating everything, every budget is posted and every
    /// accumulator equals the sum of its bucket's budget period amounts.
    #[test]
    fn prop_consolidate_all_matches_budget_sums(mut dataset in dataset_strategy()) {
        consolidate_in_memory(&mut dataset, LEDGER, true, CountingSequences::starting_at(1)).unwrap();

        prop_assert!(dataset.budgets.iter().all(|b| b.budget_status));
        for glm in &dataset.glm_rows {
            for period_number in 1..=4 {
                let actual = dataset.glm_period_amount(glm.glm_sequence, period_number);
                prop_assert_eq!(actual, Some(expected_bucket_total(&dataset, glm, period_number)));
            }
        }
    }

    /// Consolidating everything twice gives the same accumulators as once.
    #[test]
    fn prop_consolidate_all_is_idempotent(dataset in dataset_strategy()) {
        let mut once = dataset.clone();
        consolidate_in_memory(&mut once, LEDGER, true, CountingSequences::starting_at(1)).unwrap();

        let mut twice = once.clone();
        let summary = consolidate_in_memory(&mut twice, LEDGER, true, CountingSequences::starting_at(1000)).unwrap();

        prop_assert_eq!(summary.glm_rows_created, 0);
        prop_assert_eq!(&once.glm_periods, &twice.glm_periods);
        prop_assert_eq!(&once.glm_rows, &twice.glm_rows);
    }

    /// Creating a missing bucket yields one GLM row and one row per period.
    #[test]
    fn prop_every_glm_row_has_every_period(dataset in dataset_strategy(), all in any::<bool>()) {
        let mut dataset = dataset;
        consolidate_in_memory(&mut dataset, LEDGER, all, CountingSequences::starting_at(1)).unwrap();

        let mut buckets: Vec<_> = dataset.glm_rows.iter().map(GeneralLedgerMasterRow::bucket).collect();
        let total = buckets.len();
        buckets.sort();
        buckets.dedup();
        prop_assert_eq!(buckets.len(), total);

        for glm in &dataset.glm_rows {
            let count = dataset.glm_periods.iter().filter(|p| p.glm_sequence == glm.glm_sequence).count();
            prop_assert_eq!(count, 4);
        }
    }
}
