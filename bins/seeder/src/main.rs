//! Database seeder for GL Budget development and testing.
//!
//! Seeds ledger 43 with a few unposted budgets for the current and next
//! financial year, then prints an accountant access token for trying the
//! consolidation endpoint.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use glb_db::entities::{budget_periods, budgets, ledgers};
use glb_shared::{AppConfig, JwtService, Role};

/// Test ledger number (consistent for all seeds)
const TEST_LEDGER: i32 = 43;
/// Test user ID embedded in the printed token
const TEST_USER_ID: Uuid = Uuid::from_u128(2);
const PERIODS: i32 = 12;

/// `(year offset, account, cost centre, amount per period in cents)`
const BUDGETS: &[(i32, &str, &str, i64)] = &[
    (0, "4000", "BASE", 10_000),
    (0, "0400", "4300", 2_550),
    (0, "0400", "4310", 1_200),
    (1, "0300", "4300", 10_500),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    println!("Connecting to database...");
    let db = glb_db::connect(&config.database.url).await?;

    println!("Seeding ledger {TEST_LEDGER}...");
    let current_year = Utc::now().year();
    if seed_ledger(&db, current_year).await? {
        println!("Seeding budgets...");
        seed_budgets(&db, current_year).await?;
    } else {
        println!("  Ledger {TEST_LEDGER} already exists, skipping budgets...");
    }

    let jwt_service = JwtService::new(config.jwt.to_jwt_config());
    let token = jwt_service
        .generate_access_token(TEST_USER_ID, Role::Accountant)
        .context("Failed to generate access token")?;

    println!("Seeding complete!");
    println!();
    println!("Accountant token:");
    println!("{token}");
    println!();
    println!(
        "Try: curl -X POST -H 'Authorization: Bearer <token>' -H 'Content-Type: application/json' \
         -d '{{\"consolidate_all\":true}}' \
         http://{}:{}/api/v1/ledgers/{TEST_LEDGER}/budgets/consolidate",
        config.server.host, config.server.port
    );

    Ok(())
}

/// Creates the test ledger. Returns false if it already exists.
async fn seed_ledger(db: &DatabaseConnection, current_year: i32) -> anyhow::Result<bool> {
    if ledgers::Entity::find_by_id(TEST_LEDGER).one(db).await?.is_some() {
        return Ok(false);
    }

    ledgers::ActiveModel {
        ledger_number: Set(TEST_LEDGER),
        name: Set("Test ledger".to_string()),
        current_financial_year: Set(current_year),
        number_of_accounting_periods: Set(PERIODS),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(true)
}

/// Seeds unposted budgets with an even amount in every period.
async fn seed_budgets(db: &DatabaseConnection, current_year: i32) -> anyhow::Result<()> {
    for &(year_offset, account_code, cost_centre_code, cents) in BUDGETS {
        let budget = budgets::ActiveModel {
            ledger_number: Set(TEST_LEDGER),
            year: Set(current_year + year_offset),
            account_code: Set(account_code.to_string()),
            cost_centre_code: Set(cost_centre_code.to_string()),
            budget_status: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await?;

        for period_number in 1..=PERIODS {
            budget_periods::ActiveModel {
                budget_sequence: Set(budget.budget_sequence),
                period_number: Set(period_number),
                budget_base_amount: Set(Decimal::new(cents, 2)),
            }
            .insert(db)
            .await?;
        }
        println!(
            "  Budget {} for {account_code}/{cost_centre_code}",
            budget.budget_sequence
        );
    }
    Ok(())
}
