use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance_event::Entity")]
    AttendanceEvents,
    #[sea_orm(has_many = "super::face_template::Entity")]
    FaceTemplates,
    #[sea_orm(has_one = "super::work_schedule::Entity")]
    WorkSchedule,
}

impl Related<super::attendance_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceEvents.def()
    }
}
impl Related<super::face_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FaceTemplates.def()
    }
}
impl Related<super::work_schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkSchedule.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
