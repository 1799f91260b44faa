//! Consolidation data types.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use glb_shared::types::{BudgetSequence, GlmSequence, LedgerNumber};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A financial book, scoped by financial year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Ledger number.
    pub ledger_number: LedgerNumber,
    /// Display name.
    pub name: String,
    /// The financial year currently open for posting.
    pub current_financial_year: i32,
    /// Number of accounting periods per year (usually 12).
    pub number_of_accounting_periods: i32,
}

impl Ledger {
    /// Years consolidation covers: the current and the next financial year.
    #[must_use]
    pub const fn consolidation_years(&self) -> [i32; 2] {
        [self.current_financial_year, self.current_financial_year + 1]
    }

    /// Valid period numbers, `1..=number_of_accounting_periods`.
    #[must_use]
    pub const fn periods(&self) -> RangeInclusive<i32> {
        1..=self.number_of_accounting_periods
    }
}

/// Identifies one year/account/cost-centre combination of a ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    /// Ledger number.
    pub ledger_number: LedgerNumber,
    /// Financial year.
    pub year: i32,
    /// Account code.
    pub account_code: String,
    /// Cost centre code.
    pub cost_centre_code: String,
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.ledger_number, self.year, self.account_code, self.cost_centre_code
        )
    }
}

/// A budget for one account/cost-centre/year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRow {
    /// Ledger number.
    pub ledger_number: LedgerNumber,
    /// Unique budget id.
    pub budget_sequence: BudgetSequence,
    /// Financial year.
    pub year: i32,
    /// Account code.
    pub account_code: String,
    /// Cost centre code.
    pub cost_centre_code: String,
    /// True once the budget has been posted into the GLM period accumulators.
    pub budget_status: bool,
}

impl BudgetRow {
    /// The GLM bucket this budget posts into.
    #[must_use]
    pub fn bucket(&self) -> BucketKey {
        BucketKey {
            ledger_number: self.ledger_number,
            year: self.year,
            account_code: self.account_code.clone(),
            cost_centre_code: self.cost_centre_code.clone(),
        }
    }
}

/// Budget amount for one accounting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPeriodRow {
    /// Owning budget.
    pub budget_sequence: BudgetSequence,
    /// Period number, starting at 1.
    pub period_number: i32,
    /// Budgeted base-currency amount.
    pub budget_base_amount: Decimal,
}

/// Aggregate record per account/cost-centre/year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralLedgerMasterRow {
    /// Ledger number.
    pub ledger_number: LedgerNumber,
    /// Financial year.
    pub year: i32,
    /// Account code.
    pub account_code: String,
    /// Cost centre code.
    pub cost_centre_code: String,
    /// Unique GLM id.
    pub glm_sequence: GlmSequence,
}

impl GeneralLedgerMasterRow {
    /// The bucket this row stands for.
    #[must_use]
    pub fn bucket(&self) -> BucketKey {
        BucketKey {
            ledger_number: self.ledger_number,
            year: self.year,
            account_code: self.account_code.clone(),
            cost_centre_code: self.cost_centre_code.clone(),
        }
    }

    /// Builds the row for a newly created bucket.
    #[must_use]
    pub fn for_bucket(bucket: &BucketKey, glm_sequence: GlmSequence) -> Self {
        Self {
            ledger_number: bucket.ledger_number,
            year: bucket.year,
            account_code: bucket.account_code.clone(),
            cost_centre_code: bucket.cost_centre_code.clone(),
            glm_sequence,
        }
    }
}

/// Per-period budget accumulator of a GLM row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlmPeriodRow {
    /// Owning GLM row.
    pub glm_sequence: GlmSequence,
    /// Period number, starting at 1.
    pub period_number: i32,
    /// Accumulated budget base amount.
    pub budget_base_amount: Decimal,
}

/// Status change of one budget row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStatusChange {
    /// Budget row.
    pub budget_sequence: BudgetSequence,
    /// New status.
    pub budget_status: bool,
}

/// Everything consolidation needs for one ledger, loaded up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationDataset {
    /// The ledger, if it exists.
    pub ledger: Option<Ledger>,
    /// Budget rows for the consolidation years, in load order.
    pub budgets: Vec<BudgetRow>,
    /// Budget period rows of `budgets`.
    pub budget_periods: Vec<BudgetPeriodRow>,
    /// GLM rows for the consolidation years.
    pub glm_rows: Vec<GeneralLedgerMasterRow>,
    /// GLM period rows of `glm_rows`.
    pub glm_periods: Vec<GlmPeriodRow>,
}

impl ConsolidationDataset {
    /// Creates an empty dataset for `ledger`.
    #[must_use]
    pub const fn for_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Some(ledger),
            budgets: Vec::new(),
            budget_periods: Vec::new(),
            glm_rows: Vec::new(),
            glm_periods: Vec::new(),
        }
    }

    /// Groups budget period rows by budget, each group sorted by period number.
    #[must_use]
    pub fn periods_by_budget(&self) -> BTreeMap<BudgetSequence, Vec<BudgetPeriodRow>> {
        let mut grouped: BTreeMap<BudgetSequence, Vec<BudgetPeriodRow>> = BTreeMap::new();
        for row in &self.budget_periods {
            grouped
                .entry(row.budget_sequence)
                .or_default()
                .push(row.clone());
        }
        for rows in grouped.values_mut() {
            rows.sort_by_key(|r| r.period_number);
        }
        grouped
    }

    /// Looks up the accumulator of one GLM period.
    #[must_use]
    pub fn glm_period_amount(&self, glm_sequence: GlmSequence, period_number: i32) -> Option<Decimal> {
        self.glm_periods
            .iter()
            .find(|p| p.glm_sequence == glm_sequence && p.period_number == period_number)
            .map(|p| p.budget_base_amount)
    }

    /// Finds the GLM row for a bucket.
    #[must_use]
    pub fn glm_for(&self, bucket: &BucketKey) -> Option<&GeneralLedgerMasterRow> {
        self.glm_rows.iter().find(|g| &g.bucket() == bucket)
    }

    /// Applies a change set in memory, mirroring what the persistence layer does.
    pub fn apply(&mut self, changes: &ChangeSet) {
        for change in &changes.budget_status {
            if let Some(budget) = self
                .budgets
                .iter_mut()
                .find(|b| b.budget_sequence == change.budget_sequence)
            {
                budget.budget_status = change.budget_status;
            }
        }
        self.glm_rows.extend(changes.new_glm_rows.iter().cloned());
        self.glm_periods.extend(changes.added_periods.iter().cloned());
        for modified in &changes.modified_periods {
            if let Some(row) = self.glm_periods.iter_mut().find(|p| {
                p.glm_sequence == modified.glm_sequence && p.period_number == modified.period_number
            }) {
                row.budget_base_amount = modified.budget_base_amount;
            }
        }
    }
}

/// Staged changes produced by one consolidation run.
///
/// Applied atomically by the persistence layer: budget statuses are updated,
/// new GLM rows inserted before their period rows, then period rows inserted
/// or updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Budget rows whose status changed.
    pub budget_status: Vec<BudgetStatusChange>,
    /// GLM rows created for buckets that had none.
    pub new_glm_rows: Vec<GeneralLedgerMasterRow>,
    /// GLM period rows that did not exist before.
    pub added_periods: Vec<GlmPeriodRow>,
    /// Existing GLM period rows whose accumulator changed.
    pub modified_periods: Vec<GlmPeriodRow>,
}

impl ChangeSet {
    /// Returns true if nothing needs to be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.budget_status.is_empty()
            && self.new_glm_rows.is_empty()
            && self.added_periods.is_empty()
            && self.modified_periods.is_empty()
    }
}

/// Counts reported back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationSummary {
    /// Budget rows posted in this run.
    pub budgets_posted: usize,
    /// Budget rows unposted in this run.
    pub budgets_unposted: usize,
    /// GLM rows created for missing buckets.
    pub glm_rows_created: usize,
    /// GLM period rows added or modified.
    pub glm_periods_touched: usize,
}

/// Result of a successful processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationOutcome {
    /// Changes to persist.
    pub changes: ChangeSet,
    /// Counts for the caller.
    pub summary: ConsolidationSummary,
}
