use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Concepts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Concepts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Concepts::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Concepts::Label).string().not_null())
                    .col(ColumnDef::new(Concepts::PromptBase).text().not_null())
                    .col(
                        ColumnDef::new(Concepts::Status)
                            .string()
                            .not_null()
                            .default("idea"),
                    )
                    .col(ColumnDef::new(Concepts::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_concepts_project_id")
                            .from(Concepts::Table, Concepts::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Concepts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Concepts {
    Table,
    Id,
    ProjectId,
    Label,
    PromptBase,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}
