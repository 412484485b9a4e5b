use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Shortener::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shortener::Url)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shortener::Digest).text().not_null())
                    .col(
                        ColumnDef::new(Shortener::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Shortener::Collide).boolean().null())
                    .to_owned(),
            )
            .await?;

        // digest 唯一索引：并发注册和哈希碰撞的最终裁决者
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_digest")
                    .table(Shortener::Table)
                    .col(Shortener::Digest)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_digest").table(Shortener::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Shortener::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Shortener {
    #[sea_orm(iden = "shortener")]
    Table,
    Url,
    Digest,
    Date,
    Collide,
}
