use chrono::{NaiveTime, Utc};
use migration::Migrator;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

use crate::models::{attendance_setting, employee, work_schedule};

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub async fn seed_employee(db: &DatabaseConnection, full_name: &str) -> employee::Model {
    employee::ActiveModel {
        full_name: Set(full_name.to_owned()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed employee")
}

pub async fn seed_schedule(
    db: &DatabaseConnection,
    employee_id: i64,
    shift_start: NaiveTime,
    shift_end: NaiveTime,
) -> work_schedule::Model {
    work_schedule::ActiveModel {
        employee_id: Set(employee_id),
        position_id: Set(1),
        shift: Set("Mañana".to_owned()),
        shift_start: Set(shift_start),
        shift_end: Set(shift_end),
    }
    .insert(db)
    .await
    .expect("Failed to seed work schedule")
}

pub async fn set_setting(db: &DatabaseConnection, key: &str, value_seconds: i64) {
    attendance_setting::ActiveModel {
        key: Set(key.to_owned()),
        value_seconds: Set(value_seconds),
    }
    .insert(db)
    .await
    .expect("Failed to seed attendance setting");
}
