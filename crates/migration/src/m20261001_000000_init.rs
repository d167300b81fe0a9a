//! Initial schema migration.
//!
//! - `expenses`: one row per expense record, scoped by owner and (month, year)
//! - `salary_documents`: one JSON document per owner holding the nested
//!   `year -> month -> amount` salary map

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    OwnerId,
    Label,
    Amount,
    OccurredAt,
    Month,
    Year,
    CreatedAt,
}

#[derive(Iden)]
enum SalaryDocuments {
    Table,
    OwnerId,
    Document,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::OwnerId).string().not_null())
                    .col(ColumnDef::new(Expenses::Label).string().not_null())
                    .col(ColumnDef::new(Expenses::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Expenses::Month).integer())
                    .col(ColumnDef::new(Expenses::Year).integer())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-owner_id-year-month")
                    .table(Expenses::Table)
                    .col(Expenses::OwnerId)
                    .col(Expenses::Year)
                    .col(Expenses::Month)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Salary documents
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SalaryDocuments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalaryDocuments::OwnerId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SalaryDocuments::Document).text().not_null())
                    .col(
                        ColumnDef::new(SalaryDocuments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SalaryDocuments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        Ok(())
    }
}
