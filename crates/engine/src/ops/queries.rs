//! Read-only views over the ledger.
//!
//! These queries exist to validate the ledger from the outside: the
//! distribution of one expense, and a user's open and settled positions.
//! Lateness is never recomputed here; the persisted status is the truth.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CommonExpense, EngineError, ResultEngine,
    expenses::{self, ExpenseKind},
    obligations::{self, ObligationStatus, ParcelObligation},
    payments::{self, Payment},
};

use super::{Actor, Engine, with_tx};

/// Obligations of one expense plus ledger aggregates.
#[derive(Clone, Debug)]
pub struct DistributionSummary {
    pub expense: CommonExpense,
    pub obligations: Vec<ParcelObligation>,
    pub paid_count: u64,
    pub pending_count: u64,
    pub amount_paid_cents: i64,
    pub amount_pending_cents: i64,
}

/// One open obligation from the caller's point of view.
#[derive(Clone, Debug)]
pub struct PendingObligation {
    pub expense_id: Uuid,
    pub parcel_id: Uuid,
    pub concept: String,
    pub kind: ExpenseKind,
    pub amount_cents: i64,
    pub status: ObligationStatus,
    pub due_date: chrono::DateTime<Utc>,
}

/// Count/amount pair for a reporting window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeriodTotal {
    pub count: u64,
    pub amount_cents: i64,
}

/// Payment history plus the trailing-90-day aggregate.
#[derive(Clone, Debug)]
pub struct CompletedPayments {
    pub payments: Vec<Payment>,
    pub last_90_days: PeriodTotal,
}

impl Engine {
    /// Obligations and aggregates for one expense of the actor's community.
    pub async fn distribution(
        &self,
        actor: &Actor,
        expense_id: Uuid,
    ) -> ResultEngine<DistributionSummary> {
        with_tx!(self, |db_tx| {
            let expense_model = self
                .require_expense_in_community(&db_tx, actor, expense_id)
                .await?;
            let expense = CommonExpense::try_from(expense_model)?;

            let models: Vec<obligations::Model> = obligations::Entity::find()
                .filter(obligations::Column::ExpenseId.eq(expense_id.to_string()))
                .order_by_asc(obligations::Column::ParcelId)
                .all(&db_tx)
                .await?;

            let mut summary = DistributionSummary {
                expense,
                obligations: Vec::with_capacity(models.len()),
                paid_count: 0,
                pending_count: 0,
                amount_paid_cents: 0,
                amount_pending_cents: 0,
            };

            for model in models {
                let obligation = ParcelObligation::try_from(model)?;
                match obligation.status {
                    ObligationStatus::Paid => {
                        summary.paid_count += 1;
                        summary.amount_paid_cents += obligation.amount_cents;
                    }
                    ObligationStatus::Pending | ObligationStatus::Late => {
                        summary.pending_count += 1;
                        summary.amount_pending_cents += obligation.amount_cents;
                    }
                    // Written off: part of neither aggregate.
                    ObligationStatus::Closed => {}
                }
                summary.obligations.push(obligation);
            }

            Ok(summary)
        })
    }

    /// Open (`pending`/`late`) obligations across the actor's parcels,
    /// earliest due first.
    pub async fn pending_for_user(&self, actor: &Actor) -> ResultEngine<Vec<PendingObligation>> {
        with_tx!(self, |db_tx| {
            let parcels = self.parcels_owned_by(&db_tx, actor).await?;
            let parcel_ids: Vec<String> = parcels.iter().map(|p| p.id.clone()).collect();
            if parcel_ids.is_empty() {
                return Ok(Vec::new());
            }

            let models: Vec<obligations::Model> = obligations::Entity::find()
                .filter(obligations::Column::ParcelId.is_in(parcel_ids))
                .filter(obligations::Column::Status.is_in([
                    ObligationStatus::Pending.as_str(),
                    ObligationStatus::Late.as_str(),
                ]))
                .order_by_asc(obligations::Column::DueDate)
                .order_by_asc(obligations::Column::ExpenseId)
                .all(&db_tx)
                .await?;

            let expense_ids: Vec<String> = models
                .iter()
                .map(|m| m.expense_id.clone())
                .collect::<std::collections::HashSet<_>>()
                .into_iter()
                .collect();
            let expense_models: Vec<expenses::Model> = expenses::Entity::find()
                .filter(expenses::Column::Id.is_in(expense_ids))
                .all(&db_tx)
                .await?;
            let mut concepts: HashMap<String, (String, ExpenseKind)> = HashMap::new();
            for model in expense_models {
                let kind = ExpenseKind::try_from(model.kind.as_str())?;
                concepts.insert(model.id.clone(), (model.concept, kind));
            }

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let (concept, kind) = concepts
                    .get(&model.expense_id)
                    .cloned()
                    .ok_or_else(|| EngineError::NotFound("expense not exists".to_string()))?;
                let obligation = ParcelObligation::try_from(model)?;
                out.push(PendingObligation {
                    expense_id: obligation.expense_id,
                    parcel_id: obligation.parcel_id,
                    concept,
                    kind,
                    amount_cents: obligation.amount_cents,
                    status: obligation.status,
                    due_date: obligation.due_date,
                });
            }
            Ok(out)
        })
    }

    /// Payment history of the actor, newest first, with a trailing-90-day
    /// aggregate.
    pub async fn completed_for_user(&self, actor: &Actor) -> ResultEngine<CompletedPayments> {
        with_tx!(self, |db_tx| {
            let models: Vec<payments::Model> = payments::Entity::find()
                .filter(payments::Column::UserId.eq(actor.user_id.clone()))
                .order_by_desc(payments::Column::PaidAt)
                .all(&db_tx)
                .await?;

            let cutoff = Utc::now() - Duration::days(90);
            let mut history = Vec::with_capacity(models.len());
            let mut last_90_days = PeriodTotal::default();

            for model in models {
                let payment = Payment::try_from(model)?;
                if payment.paid_at >= cutoff {
                    last_90_days.count += 1;
                    last_90_days.amount_cents += payment.amount_cents;
                }
                history.push(payment);
            }

            Ok(CompletedPayments {
                payments: history,
                last_90_days,
            })
        })
    }
}
