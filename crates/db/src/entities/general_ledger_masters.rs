//! `SeaORM` Entity for general_ledger_masters table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "general_ledger_masters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub glm_sequence: i32,
    pub ledger_number: i32,
    pub year: i32,
    pub account_code: String,
    pub cost_centre_code: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ledgers::Entity",
        from = "Column::LedgerNumber",
        to = "super::ledgers::Column::LedgerNumber"
    )]
    Ledgers,
    #[sea_orm(has_many = "super::general_ledger_master_periods::Entity")]
    GeneralLedgerMasterPeriods,
}

impl Related<super::ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledgers.def()
    }
}

impl Related<super::general_ledger_master_periods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeneralLedgerMasterPeriods.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
