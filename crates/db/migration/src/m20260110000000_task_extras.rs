use sea_orm_migration::prelude::*;

/// Adds the free-form `extras` blob. Rows that predate it read as `{}`.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Tasks::Table)
                    .add_column(
                        ColumnDef::new(Tasks::Extras)
                            .json()
                            .not_null()
                            .default(Expr::val("{}")),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Tasks::Table)
                    .drop_column(Tasks::Extras)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum Tasks {
    Table,
    Extras,
}
