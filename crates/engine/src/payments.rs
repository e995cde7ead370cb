//! Payment records.
//!
//! A `Payment` is append-only: once inserted it is terminal and immutable.
//! Bulk payments share one `transaction_id`/`receipt_code` across their
//! per-obligation rows.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub parcel_id: Uuid,
    pub amount_cents: i64,
    pub paid_at: DateTime<Utc>,
    /// Opaque gateway transaction reference (128-bit hex token).
    pub transaction_id: String,
    /// Human-facing receipt code, `GC-<time>-<random>`.
    pub receipt_code: String,
    pub user_id: String,
    pub method: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub parcel_id: String,
    pub amount_cents: i64,
    pub paid_at: DateTimeUtc,
    pub transaction_id: String,
    pub receipt_code: String,
    pub user_id: String,
    pub method: String,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            expense_id: ActiveValue::Set(payment.expense_id.to_string()),
            parcel_id: ActiveValue::Set(payment.parcel_id.to_string()),
            amount_cents: ActiveValue::Set(payment.amount_cents),
            paid_at: ActiveValue::Set(payment.paid_at),
            transaction_id: ActiveValue::Set(payment.transaction_id.clone()),
            receipt_code: ActiveValue::Set(payment.receipt_code.clone()),
            user_id: ActiveValue::Set(payment.user_id.clone()),
            method: ActiveValue::Set(payment.method.clone()),
            description: ActiveValue::Set(payment.description.clone()),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("payment not exists".to_string()))?,
            expense_id: Uuid::parse_str(&model.expense_id)
                .map_err(|_| EngineError::NotFound("payment not exists".to_string()))?,
            parcel_id: Uuid::parse_str(&model.parcel_id)
                .map_err(|_| EngineError::NotFound("payment not exists".to_string()))?,
            amount_cents: model.amount_cents,
            paid_at: model.paid_at,
            transaction_id: model.transaction_id,
            receipt_code: model.receipt_code,
            user_id: model.user_id,
            method: model.method,
            description: model.description,
        })
    }
}
