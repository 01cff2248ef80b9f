use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Renders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Renders::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Renders::ProjectId).uuid())
                    .col(ColumnDef::new(Renders::ConceptId).uuid())
                    .col(ColumnDef::new(Renders::Brand).string())
                    .col(ColumnDef::new(Renders::Product).string())
                    .col(ColumnDef::new(Renders::Model).string().not_null())
                    .col(ColumnDef::new(Renders::ImageUrl).text().not_null())
                    .col(ColumnDef::new(Renders::ThumbnailUrl).text())
                    .col(
                        ColumnDef::new(Renders::Public)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Renders::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_renders_project_id")
                            .from(Renders::Table, Renders::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_renders_concept_id")
                            .from(Renders::Table, Renders::ConceptId)
                            .to(Concepts::Table, Concepts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_renders_public_created_at")
                    .table(Renders::Table)
                    .col(Renders::Public)
                    .col(Renders::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Renders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Renders {
    Table,
    Id,
    ProjectId,
    ConceptId,
    Brand,
    Product,
    Model,
    ImageUrl,
    ThumbnailUrl,
    Public,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Concepts {
    Table,
    Id,
}
