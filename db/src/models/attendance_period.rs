use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

/// Per-employee, per-date grouping row, created lazily the first time an
/// event is recorded for that date.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "attendance_periods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub employee_id: i64,
    pub period_date: NaiveDate,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    #[sea_orm(has_many = "super::attendance_event::Entity")]
    AttendanceEvents,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}
impl Related<super::attendance_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
