//! Ledger budget routes: consolidation and budget read models.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use glb_core::consolidation::BucketKey;
use glb_db::{BudgetConsolidationRepository, BudgetRepository, GlmRepository};
use glb_shared::types::{GlmSequence, LedgerNumber};
use glb_shared::{AppError, Permission};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{AppState, error::error_response, middleware::AuthUser};

/// Creates the ledger routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/ledgers/{ledger_number}/budgets/consolidate",
            post(consolidate_budgets),
        )
        .route(
            "/ledgers/{ledger_number}/budgets/status",
            get(get_budget_status),
        )
        .route(
            "/ledgers/{ledger_number}/glm/{year}/{account_code}/{cost_centre_code}/budget",
            get(get_bucket_budget),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a consolidation run.
#[derive(Debug, Default, Deserialize)]
pub struct ConsolidateRequest {
    /// Rebuild every GLM accumulator instead of posting only unposted budgets.
    #[serde(default)]
    pub consolidate_all: bool,
}

/// Response for a consolidation run.
#[derive(Debug, Serialize)]
pub struct ConsolidateResponse {
    /// Ledger number.
    pub ledger_number: LedgerNumber,
    /// Whether the run rebuilt everything.
    pub consolidate_all: bool,
    /// Budget rows posted.
    pub budgets_posted: usize,
    /// Budget rows unposted before reposting.
    pub budgets_unposted: usize,
    /// GLM rows created for missing buckets.
    pub glm_rows_created: usize,
    /// GLM period rows added or changed.
    pub glm_periods_touched: usize,
}

/// One period of a bucket budget.
#[derive(Debug, Serialize)]
pub struct PeriodAmountResponse {
    /// Period number.
    pub period_number: i32,
    /// Accumulated budget base amount.
    pub budget_base_amount: Decimal,
}

/// Response for a GLM bucket budget.
#[derive(Debug, Serialize)]
pub struct BucketBudgetResponse {
    /// GLM row id.
    pub glm_sequence: GlmSequence,
    /// Ledger number.
    pub ledger_number: LedgerNumber,
    /// Financial year.
    pub year: i32,
    /// Account code.
    pub account_code: String,
    /// Cost centre code.
    pub cost_centre_code: String,
    /// Per-period accumulators.
    pub periods: Vec<PeriodAmountResponse>,
    /// Sum over all periods.
    pub total: Decimal,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /ledgers/{ledger_number}/budgets/consolidate
///
/// The body is optional; without one only unposted budgets are posted.
async fn consolidate_budgets(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<LedgerNumber>, PathRejection>,
    payload: Result<Option<Json<ConsolidateRequest>>, JsonRejection>,
) -> Response {
    if let Err(e) = auth.require(Permission::FinanceWrite) {
        return error_response(&e);
    }
    let Path(ledger_number) = match path {
        Ok(path) => path,
        Err(rejection) => return invalid_request(&rejection.body_text()),
    };
    let consolidate_all = match payload {
        Ok(payload) => payload.is_some_and(|Json(p)| p.consolidate_all),
        Err(rejection) => return invalid_request(&rejection.body_text()),
    };

    let repo = BudgetConsolidationRepository::new((*state.db).clone());
    match repo.consolidate_budgets(ledger_number, consolidate_all).await {
        Ok(summary) => {
            info!(
                ledger_number = %ledger_number,
                user_id = %auth.user_id(),
                consolidate_all,
                budgets_posted = summary.budgets_posted,
                "Budgets consolidated"
            );
            (
                StatusCode::OK,
                Json(ConsolidateResponse {
                    ledger_number,
                    consolidate_all,
                    budgets_posted: summary.budgets_posted,
                    budgets_unposted: summary.budgets_unposted,
                    glm_rows_created: summary.glm_rows_created,
                    glm_periods_touched: summary.glm_periods_touched,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(&AppError::from(e)),
    }
}

/// GET /ledgers/{ledger_number}/budgets/status
async fn get_budget_status(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<LedgerNumber>, PathRejection>,
) -> Response {
    if let Err(e) = auth.require(Permission::FinanceRead) {
        return error_response(&e);
    }
    let Path(ledger_number) = match path {
        Ok(path) => path,
        Err(rejection) => return invalid_request(&rejection.body_text()),
    };

    let repo = BudgetRepository::new((*state.db).clone());
    match repo.status_summary(ledger_number).await {
        Ok(Some(summary)) => (StatusCode::OK, Json(summary)).into_response(),
        Ok(None) => error_response(&ledger_not_found(ledger_number)),
        Err(e) => {
            error!(error = %e, ledger_number = %ledger_number, "Failed to count budgets");
            error_response(&AppError::Database(e.to_string()))
        }
    }
}

/// GET /ledgers/{ledger_number}/glm/{year}/{account_code}/{cost_centre_code}/budget
async fn get_bucket_budget(
    State(state): State<AppState>,
    auth: AuthUser,
    path: Result<Path<(LedgerNumber, i32, String, String)>, PathRejection>,
) -> Response {
    if let Err(e) = auth.require(Permission::FinanceRead) {
        return error_response(&e);
    }
    let Path((ledger_number, year, account_code, cost_centre_code)) = match path {
        Ok(path) => path,
        Err(rejection) => return invalid_request(&rejection.body_text()),
    };

    let bucket = BucketKey {
        ledger_number,
        year,
        account_code,
        cost_centre_code,
    };
    let repo = GlmRepository::new((*state.db).clone());
    match repo.bucket_budget(&bucket).await {
        Ok(Some(budget)) => {
            let total = budget.periods.iter().map(|p| p.budget_base_amount).sum();
            let periods = budget
                .periods
                .into_iter()
                .map(|p| PeriodAmountResponse {
                    period_number: p.period_number,
                    budget_base_amount: p.budget_base_amount,
                })
                .collect();
            (
                StatusCode::OK,
                Json(BucketBudgetResponse {
                    glm_sequence: budget.glm_sequence,
                    ledger_number: budget.bucket.ledger_number,
                    year: budget.bucket.year,
                    account_code: budget.bucket.account_code,
                    cost_centre_code: budget.bucket.cost_centre_code,
                    periods,
                    total,
                }),
            )
                .into_response()
        }
        Ok(None) => error_response(&AppError::NotFound(format!("GLM bucket {bucket}"))),
        Err(e) => {
            error!(error = %e, bucket = %bucket, "Failed to load bucket budget");
            error_response(&AppError::Database(e.to_string()))
        }
    }
}

fn invalid_request(detail: &str) -> Response {
    error_response(&AppError::Validation(detail.to_string()))
}

fn ledger_not_found(ledger_number: LedgerNumber) -> AppError {
    AppError::NotFound(format!("Ledger {ledger_number}"))
}

#[cfg(test)]
#[path = "ledgers_tests.rs"]
mod tests;
