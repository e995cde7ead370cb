//! Community-wide expense primitives.
//!
//! A `CommonExpense` is a billable item issued by an administrator and
//! split across the parcels of one community. Its status only advances
//! forward; it closes when every obligation is paid or when an
//! administrator writes the remainder off.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseKind {
    OrdinaryFee,
    ExtraordinaryFee,
    Fine,
    Other,
}

impl ExpenseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrdinaryFee => "ordinary_fee",
            Self::ExtraordinaryFee => "extraordinary_fee",
            Self::Fine => "fine",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for ExpenseKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ordinary_fee" => Ok(Self::OrdinaryFee),
            "extraordinary_fee" => Ok(Self::ExtraordinaryFee),
            "fine" => Ok(Self::Fine),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid expense kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    Pending,
    Active,
    Closed,
}

impl ExpenseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    /// Whether a transition to `next` moves forward in the lifecycle.
    ///
    /// Pending → Active → Closed; a same-status write is a no-op, anything
    /// backwards is rejected by the catalog.
    pub fn can_advance_to(self, next: ExpenseStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Pending, Self::Closed)
                | (Self::Active, Self::Closed)
        )
    }
}

impl TryFrom<&str> for ExpenseStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            other => Err(EngineError::Validation(format!(
                "invalid expense status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonExpense {
    pub id: Uuid,
    pub concept: String,
    pub total_amount_cents: i64,
    pub due_date: DateTime<Utc>,
    pub kind: ExpenseKind,
    pub status: ExpenseStatus,
    pub community_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl CommonExpense {
    pub fn new(
        concept: String,
        total_amount_cents: i64,
        due_date: DateTime<Utc>,
        kind: ExpenseKind,
        community_id: String,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if total_amount_cents <= 0 {
            return Err(EngineError::Validation(
                "total_amount_cents must be > 0".to_string(),
            ));
        }
        let concept = concept.trim().to_string();
        if concept.is_empty() {
            return Err(EngineError::Validation(
                "concept must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            concept,
            total_amount_cents,
            due_date,
            kind,
            status: ExpenseStatus::Pending,
            community_id,
            created_by,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "common_expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub concept: String,
    pub total_amount_cents: i64,
    pub due_date: DateTimeUtc,
    pub kind: String,
    pub status: String,
    pub community_id: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::obligations::Entity")]
    Obligations,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::obligations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obligations.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CommonExpense> for ActiveModel {
    fn from(expense: &CommonExpense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            concept: ActiveValue::Set(expense.concept.clone()),
            total_amount_cents: ActiveValue::Set(expense.total_amount_cents),
            due_date: ActiveValue::Set(expense.due_date),
            kind: ActiveValue::Set(expense.kind.as_str().to_string()),
            status: ActiveValue::Set(expense.status.as_str().to_string()),
            community_id: ActiveValue::Set(expense.community_id.clone()),
            created_by: ActiveValue::Set(expense.created_by.clone()),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl TryFrom<Model> for CommonExpense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("expense not exists".to_string()))?,
            concept: model.concept,
            total_amount_cents: model.total_amount_cents,
            due_date: model.due_date,
            kind: ExpenseKind::try_from(model.kind.as_str())?,
            status: ExpenseStatus::try_from(model.status.as_str())?,
            community_id: model.community_id,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}
