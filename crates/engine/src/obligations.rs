//! The per-parcel ledger entry and its state machine.
//!
//! A `ParcelObligation` is one parcel's prorated share of a
//! [`CommonExpense`](super::CommonExpense), identified by the composite key
//! `(expense_id, parcel_id)`.
//!
//! States: Pending → Late (time-based, written by exactly one procedure),
//! Pending/Late → Paid (payment processor only), Pending/Late → Closed
//! (administrative write-off). Paid and Closed are terminal.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Pending,
    Late,
    Paid,
    Closed,
}

impl ObligationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Late => "late",
            Self::Paid => "paid",
            Self::Closed => "closed",
        }
    }

    /// Payable states: the only ones a payment may leave from.
    pub fn is_payable(self) -> bool {
        matches!(self, Self::Pending | Self::Late)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Closed)
    }

    pub fn can_transition_to(self, next: ObligationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Late)
                | (Self::Pending, Self::Paid)
                | (Self::Pending, Self::Closed)
                | (Self::Late, Self::Paid)
                | (Self::Late, Self::Closed)
        )
    }
}

impl TryFrom<&str> for ObligationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "late" => Ok(Self::Late),
            "paid" => Ok(Self::Paid),
            "closed" => Ok(Self::Closed),
            other => Err(EngineError::Validation(format!(
                "invalid obligation status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelObligation {
    pub expense_id: Uuid,
    pub parcel_id: Uuid,
    pub amount_cents: i64,
    pub status: ObligationStatus,
    pub due_date: DateTime<Utc>,
}

impl ParcelObligation {
    pub fn new(
        expense_id: Uuid,
        parcel_id: Uuid,
        amount_cents: i64,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            expense_id,
            parcel_id,
            amount_cents,
            status: ObligationStatus::Pending,
            due_date,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "parcel_obligations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub parcel_id: String,
    pub amount_cents: i64,
    pub status: String,
    pub due_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
    #[sea_orm(
        belongs_to = "super::parcels::Entity",
        from = "Column::ParcelId",
        to = "super::parcels::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Parcels,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::parcels::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parcels.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ParcelObligation> for ActiveModel {
    fn from(obligation: &ParcelObligation) -> Self {
        Self {
            expense_id: ActiveValue::Set(obligation.expense_id.to_string()),
            parcel_id: ActiveValue::Set(obligation.parcel_id.to_string()),
            amount_cents: ActiveValue::Set(obligation.amount_cents),
            status: ActiveValue::Set(obligation.status.as_str().to_string()),
            due_date: ActiveValue::Set(obligation.due_date),
        }
    }
}

impl TryFrom<Model> for ParcelObligation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            expense_id: Uuid::parse_str(&model.expense_id)
                .map_err(|_| EngineError::NotFound("obligation not exists".to_string()))?,
            parcel_id: Uuid::parse_str(&model.parcel_id)
                .map_err(|_| EngineError::NotFound("obligation not exists".to_string()))?,
            amount_cents: model.amount_cents,
            status: ObligationStatus::try_from(model.status.as_str())?,
            due_date: model.due_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payable_states() {
        assert!(ObligationStatus::Pending.is_payable());
        assert!(ObligationStatus::Late.is_payable());
        assert!(!ObligationStatus::Paid.is_payable());
        assert!(!ObligationStatus::Closed.is_payable());
    }

    #[test]
    fn paid_and_closed_are_terminal() {
        for status in [ObligationStatus::Paid, ObligationStatus::Closed] {
            assert!(status.is_terminal());
            for next in [
                ObligationStatus::Pending,
                ObligationStatus::Late,
                ObligationStatus::Paid,
                ObligationStatus::Closed,
            ] {
                assert!(!status.can_transition_to(next));
            }
        }
    }

    #[test]
    fn late_comes_only_from_pending() {
        assert!(ObligationStatus::Pending.can_transition_to(ObligationStatus::Late));
        assert!(!ObligationStatus::Late.can_transition_to(ObligationStatus::Late));
        assert!(!ObligationStatus::Paid.can_transition_to(ObligationStatus::Late));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ObligationStatus::Pending,
            ObligationStatus::Late,
            ObligationStatus::Paid,
            ObligationStatus::Closed,
        ] {
            assert_eq!(ObligationStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(ObligationStatus::try_from("overdue").is_err());
    }
}
