//! Initial schema migration - creates all tables from scratch.
//!
//! The complete schema for Prorata:
//!
//! - `parcels`: read-only parcel reference (area, community, owner)
//! - `common_expenses`: community-wide billable items
//! - `parcel_obligations`: per-parcel prorated shares with their own state
//! - `payments`: append-only payment records

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Parcels {
    Table,
    Id,
    Area,
    CommunityId,
    OwnerId,
}

#[derive(Iden)]
enum CommonExpenses {
    Table,
    Id,
    Concept,
    TotalAmountCents,
    DueDate,
    Kind,
    Status,
    CommunityId,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum ParcelObligations {
    Table,
    ExpenseId,
    ParcelId,
    AmountCents,
    Status,
    DueDate,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    ExpenseId,
    ParcelId,
    AmountCents,
    PaidAt,
    TransactionId,
    ReceiptCode,
    UserId,
    Method,
    Description,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Parcels
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Parcels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Parcels::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Parcels::Area).big_integer().not_null())
                    .col(ColumnDef::new(Parcels::CommunityId).string().not_null())
                    .col(ColumnDef::new(Parcels::OwnerId).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parcels-community_id")
                    .table(Parcels::Table)
                    .col(Parcels::CommunityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parcels-owner_id")
                    .table(Parcels::Table)
                    .col(Parcels::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Common expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CommonExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommonExpenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CommonExpenses::Concept).string().not_null())
                    .col(
                        ColumnDef::new(CommonExpenses::TotalAmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommonExpenses::DueDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CommonExpenses::Kind).string().not_null())
                    .col(ColumnDef::new(CommonExpenses::Status).string().not_null())
                    .col(
                        ColumnDef::new(CommonExpenses::CommunityId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommonExpenses::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommonExpenses::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-common_expenses-community_id-due_date")
                    .table(CommonExpenses::Table)
                    .col(CommonExpenses::CommunityId)
                    .col(CommonExpenses::DueDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Parcel obligations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ParcelObligations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ParcelObligations::ExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParcelObligations::ParcelId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParcelObligations::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParcelObligations::Status)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ParcelObligations::DueDate)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ParcelObligations::ExpenseId)
                            .col(ParcelObligations::ParcelId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-parcel_obligations-expense_id")
                            .from(ParcelObligations::Table, ParcelObligations::ExpenseId)
                            .to(CommonExpenses::Table, CommonExpenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-parcel_obligations-parcel_id")
                            .from(ParcelObligations::Table, ParcelObligations::ParcelId)
                            .to(Parcels::Table, Parcels::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parcel_obligations-parcel_id-status")
                    .table(ParcelObligations::Table)
                    .col(ParcelObligations::ParcelId)
                    .col(ParcelObligations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-parcel_obligations-status-due_date")
                    .table(ParcelObligations::Table)
                    .col(ParcelObligations::Status)
                    .col(ParcelObligations::DueDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::ExpenseId).string().not_null())
                    .col(ColumnDef::new(Payments::ParcelId).string().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::PaidAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Payments::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::ReceiptCode).string().not_null())
                    .col(ColumnDef::new(Payments::UserId).string().not_null())
                    .col(ColumnDef::new(Payments::Method).string().not_null())
                    .col(ColumnDef::new(Payments::Description).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-expense_id")
                            .from(Payments::Table, Payments::ExpenseId)
                            .to(CommonExpenses::Table, CommonExpenses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-user_id-paid_at")
                    .table(Payments::Table)
                    .col(Payments::UserId)
                    .col(Payments::PaidAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-transaction_id")
                    .table(Payments::Table)
                    .col(Payments::TransactionId)
                    .to_owned(),
            )
            .await?;

        // Bulk payments share one receipt code across their rows, so the
        // index is not unique; uniqueness per payment event is enforced by
        // the processor's regenerate-and-retry check.
        manager
            .create_index(
                Index::create()
                    .name("idx-payments-receipt_code")
                    .table(Payments::Table)
                    .col(Payments::ReceiptCode)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ParcelObligations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CommonExpenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parcels::Table).to_owned())
            .await?;
        Ok(())
    }
}
