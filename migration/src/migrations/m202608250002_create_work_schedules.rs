use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202608250002_create_work_schedules"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("work_schedules"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("employee_id"))
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("position_id"))
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("shift")).string().not_null())
                    .col(ColumnDef::new(Alias::new("shift_start")).time().not_null())
                    .col(ColumnDef::new(Alias::new("shift_end")).time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_work_schedule_employee")
                            .from(Alias::new("work_schedules"), Alias::new("employee_id"))
                            .to(Alias::new("employees"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("work_schedules")).to_owned())
            .await
    }
}
