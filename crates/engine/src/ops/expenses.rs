//! Expense catalog: create and edit community-wide expenses.
//!
//! Creation inserts the expense row and its prorated obligations in one
//! transaction. Editing handles the two mutations with side effects:
//! changing the total recomputes the still-mutable obligations, and
//! closing the expense writes the unpaid remainder off.

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{
    CommonExpense, EngineError, NewExpense, ResultEngine,
    commands::ExpenseEdit,
    expenses,
    obligations::{self, ObligationStatus, ParcelObligation},
    proration::{DistributionMethod, ParcelShare, ParcelWeight, prorate},
};

use super::{Actor, Engine, with_tx};

/// Outcome of a catalog create.
#[derive(Clone, Debug)]
pub struct CreatedExpense {
    pub expense: CommonExpense,
    pub shares: Vec<ParcelShare>,
    /// True when the requested distribution method fell back to `Equal`.
    pub proration_fell_back: bool,
}

impl Engine {
    /// Creates a `CommonExpense` (status `pending`) and its obligation rows
    /// atomically.
    ///
    /// Administrators only. Without an explicit parcel set, every parcel of
    /// the actor's community is billed; an empty resolution is a
    /// [`EngineError::NotFound`].
    pub async fn create_expense(
        &self,
        actor: &Actor,
        cmd: NewExpense,
    ) -> ResultEngine<CreatedExpense> {
        self.require_admin(actor)?;

        with_tx!(self, |db_tx| {
            self.create_expense_in_tx(&db_tx, actor, cmd).await
        })
    }

    async fn create_expense_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        cmd: NewExpense,
    ) -> ResultEngine<CreatedExpense> {
        let weights = self.resolve_weights(db_tx, actor, cmd.parcels).await?;

        let expense = CommonExpense::new(
            cmd.concept,
            cmd.total_amount_cents,
            cmd.due_date,
            cmd.kind,
            actor.community_id.clone(),
            actor.user_id.clone(),
            Utc::now(),
        )?;

        let proration = prorate(expense.total_amount_cents, &weights, &cmd.method)?;

        expenses::ActiveModel::from(&expense).insert(db_tx).await?;
        for share in &proration.shares {
            let obligation = ParcelObligation::new(
                expense.id,
                share.parcel_id,
                share.amount_cents,
                expense.due_date,
            );
            obligations::ActiveModel::from(&obligation).insert(db_tx).await?;
        }

        Ok(CreatedExpense {
            expense,
            shares: proration.shares,
            proration_fell_back: proration.fell_back,
        })
    }

    async fn resolve_weights(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        explicit: Option<Vec<Uuid>>,
    ) -> ResultEngine<Vec<ParcelWeight>> {
        let models = if let Some(ids) = explicit
            && !ids.is_empty()
        {
            self.parcels_in_community(db_tx, &actor.community_id, &ids)
                .await?
        } else {
            self.parcels_of_community(db_tx, &actor.community_id)
                .await?
        };
        if models.is_empty() {
            return Err(EngineError::NotFound(
                "community has no parcels".to_string(),
            ));
        }

        let mut weights = Vec::with_capacity(models.len());
        for model in models {
            let parcel_id = Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("parcel not exists".to_string()))?;
            weights.push(ParcelWeight {
                parcel_id,
                area: model.area,
            });
        }
        Ok(weights)
    }

    /// Applies a partial edit to an expense.
    ///
    /// A `status: Closed` edit force-transitions every non-paid obligation
    /// to `closed` (written off, not collected). A total change recomputes
    /// the still-mutable obligations with an equal split of the new total;
    /// paid amounts are never touched.
    pub async fn edit_expense(
        &self,
        actor: &Actor,
        expense_id: Uuid,
        edit: ExpenseEdit,
    ) -> ResultEngine<CommonExpense> {
        self.require_admin(actor)?;
        if edit.is_empty() {
            return Err(EngineError::Validation("nothing to update".to_string()));
        }

        with_tx!(self, |db_tx| {
            self.edit_expense_in_tx(&db_tx, actor, expense_id, edit).await
        })
    }

    async fn edit_expense_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        expense_id: Uuid,
        edit: ExpenseEdit,
    ) -> ResultEngine<CommonExpense> {
        let model = self
            .require_expense_in_community(db_tx, actor, expense_id)
            .await?;
        let mut expense = CommonExpense::try_from(model)?;

        if expense.status == crate::ExpenseStatus::Closed {
            return Err(EngineError::Conflict("expense is closed".to_string()));
        }

        if let Some(status) = edit.status
            && status != expense.status
            && !expense.status.can_advance_to(status)
        {
            return Err(EngineError::Conflict(format!(
                "cannot move expense from {} to {}",
                expense.status.as_str(),
                status.as_str()
            )));
        }

        if let Some(concept) = edit.concept {
            let concept = concept.trim().to_string();
            if concept.is_empty() {
                return Err(EngineError::Validation(
                    "concept must not be empty".to_string(),
                ));
            }
            expense.concept = concept;
        }
        if let Some(due_date) = edit.due_date {
            expense.due_date = due_date;
        }
        if let Some(kind) = edit.kind {
            expense.kind = kind;
        }

        if let Some(total) = edit.total_amount_cents
            && total != expense.total_amount_cents
        {
            if total <= 0 {
                return Err(EngineError::Validation(
                    "total_amount_cents must be > 0".to_string(),
                ));
            }
            expense.total_amount_cents = total;
            self.recompute_mutable_obligations(db_tx, expense.id, total)
                .await?;
        }

        if let Some(status) = edit.status
            && status != expense.status
        {
            expense.status = status;
            if status == crate::ExpenseStatus::Closed {
                self.force_close_obligations(db_tx, expense.id).await?;
            }
        }

        let active = expenses::ActiveModel {
            id: ActiveValue::Set(expense.id.to_string()),
            concept: ActiveValue::Set(expense.concept.clone()),
            total_amount_cents: ActiveValue::Set(expense.total_amount_cents),
            due_date: ActiveValue::Set(expense.due_date),
            kind: ActiveValue::Set(expense.kind.as_str().to_string()),
            status: ActiveValue::Set(expense.status.as_str().to_string()),
            ..Default::default()
        };
        active.update(db_tx).await?;

        Ok(expense)
    }

    /// Equal split of the new total over the obligations still open to
    /// change. Paid (and closed) obligations keep their original amount;
    /// their frozen sum is intentionally not rebalanced into the new total.
    async fn recompute_mutable_obligations(
        &self,
        db_tx: &DatabaseTransaction,
        expense_id: Uuid,
        new_total_cents: i64,
    ) -> ResultEngine<()> {
        let mutable: Vec<obligations::Model> = obligations::Entity::find()
            .filter(obligations::Column::ExpenseId.eq(expense_id.to_string()))
            .filter(obligations::Column::Status.is_in([
                ObligationStatus::Pending.as_str(),
                ObligationStatus::Late.as_str(),
            ]))
            .order_by_asc(obligations::Column::ParcelId)
            .all(db_tx)
            .await?;

        if mutable.is_empty() {
            return Ok(());
        }

        let weights: Vec<ParcelWeight> = mutable
            .iter()
            .map(|m| {
                Uuid::parse_str(&m.parcel_id)
                    .map(|parcel_id| ParcelWeight { parcel_id, area: 0 })
                    .map_err(|_| EngineError::NotFound("parcel not exists".to_string()))
            })
            .collect::<ResultEngine<_>>()?;

        let proration = prorate(new_total_cents, &weights, &DistributionMethod::Equal)?;

        for share in proration.shares {
            let active = obligations::ActiveModel {
                expense_id: ActiveValue::Set(expense_id.to_string()),
                parcel_id: ActiveValue::Set(share.parcel_id.to_string()),
                amount_cents: ActiveValue::Set(share.amount_cents),
                ..Default::default()
            };
            active.update(db_tx).await?;
        }

        Ok(())
    }

    async fn force_close_obligations(
        &self,
        db_tx: &DatabaseTransaction,
        expense_id: Uuid,
    ) -> ResultEngine<()> {
        obligations::Entity::update_many()
            .col_expr(
                obligations::Column::Status,
                Expr::value(ObligationStatus::Closed.as_str()),
            )
            .filter(obligations::Column::ExpenseId.eq(expense_id.to_string()))
            .filter(obligations::Column::Status.is_in([
                ObligationStatus::Pending.as_str(),
                ObligationStatus::Late.as_str(),
            ]))
            .exec(db_tx)
            .await?;
        Ok(())
    }
}
