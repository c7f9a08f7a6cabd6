use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202608250001_create_employees::Migration),
            Box::new(migrations::m202608250002_create_work_schedules::Migration),
            Box::new(migrations::m202608250003_create_attendance_periods::Migration),
            Box::new(migrations::m202608250004_create_attendance_events::Migration),
            Box::new(migrations::m202608250005_create_attendance_settings::Migration),
            Box::new(migrations::m202608250006_create_face_templates::Migration),
        ]
    }
}
