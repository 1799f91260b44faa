//! `SeaORM` Entity for general_ledger_master_periods table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "general_ledger_master_periods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub glm_sequence: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub period_number: i32,
    #[sea_orm(column_type = "Decimal(Some((24, 10)))")]
    pub budget_base_amount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::general_ledger_masters::Entity",
        from = "Column::GlmSequence",
        to = "super::general_ledger_masters::Column::GlmSequence",
        on_delete = "Cascade"
    )]
    GeneralLedgerMasters,
}

impl Related<super::general_ledger_masters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GeneralLedgerMasters.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
