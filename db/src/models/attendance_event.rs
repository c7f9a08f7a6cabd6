use chrono::{NaiveDate, NaiveTime};
use sea_orm::entity::prelude::*;

/// Whether a punch opens or closes the working day.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PunchKind {
    #[sea_orm(string_value = "Entrada")]
    Entrada,
    #[sea_orm(string_value = "Salida")]
    Salida,
}

impl std::fmt::Display for PunchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PunchKind::Entrada => write!(f, "Entrada"),
            PunchKind::Salida => write!(f, "Salida"),
        }
    }
}

/// One recorded punch. Immutable once inserted; at most one row per
/// (employee, date, kind) enforced both in the engine and by a unique index.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub employee_id: i64,
    pub period_id: i64,
    pub position_id: i64,
    pub kind: PunchKind,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub status: String,
    pub shift: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::attendance_period::Entity",
        from = "Column::PeriodId",
        to = "super::attendance_period::Column::Id"
    )]
    Period,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}
impl Related<super::attendance_period::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Period.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
