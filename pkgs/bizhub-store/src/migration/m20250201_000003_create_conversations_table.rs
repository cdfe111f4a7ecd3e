use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Conversations {
    Table,
    Id,
    Participant1Id,
    Participant2Id,
    BusinessId,
    ParticipantLow,
    ParticipantHigh,
    BusinessKey,
    LastMessageAt,
    CreatedAt,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250201_000003_create_conversations_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Conversations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Conversations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Conversations::Participant1Id)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::Participant2Id)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Conversations::BusinessId).string())
                    .col(
                        ColumnDef::new(Conversations::ParticipantLow)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::ParticipantHigh)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::BusinessKey)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Conversations::LastMessageAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Conversations::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One conversation per unordered pair and business
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_conversations_pair_business")
                    .table(Conversations::Table)
                    .col(Conversations::ParticipantLow)
                    .col(Conversations::ParticipantHigh)
                    .col(Conversations::BusinessKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_conversations_last_message_at")
                    .table(Conversations::Table)
                    .col(Conversations::LastMessageAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Conversations::Table).to_owned())
            .await
    }
}
