use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// One reference vector of an employee's biometric template, keyed by the
/// gesture it was captured under. Rows are only ever written as a complete
/// gesture set.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "face_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub employee_id: i64,
    pub gesture: String,
    /// JSON-encoded array of f64.
    pub embedding: String,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn vector(&self) -> Result<Vec<f64>, serde_json::Error> {
        serde_json::from_str(&self.embedding)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
