//! Payment processor: validates and records payments, single or bulk.
//!
//! Every payment runs inside one transaction: the obligation is claimed by
//! a status-conditional update (its row count is the at-most-once guard),
//! the gateway authorizes the charge, the payment row is inserted and the
//! expense is auto-closed when its last obligation turns paid. Any failure
//! rolls the whole sequence back.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    commands::{BulkPaymentCmd, PaymentCmd},
    expenses::{self, ExpenseStatus},
    gateway::receipt_code,
    obligations::{self, ObligationStatus},
    payments::{self, Payment},
};

use super::{Actor, Engine, with_tx};

/// Attempts before giving up on a colliding receipt code.
const RECEIPT_CODE_ATTEMPTS: usize = 5;

/// Confirmation returned for a recorded payment (single or bulk).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub transaction_id: String,
    pub receipt_code: String,
    pub amount_cents: i64,
    pub paid_at: DateTime<Utc>,
    /// Number of obligations settled (1 for a single payment).
    pub paid_count: u64,
}

impl Engine {
    /// Records a payment for one obligation.
    ///
    /// The obligation must exist in the actor's scope, be `pending` or
    /// `late`, and the amount must match its prorated share exactly.
    /// Paying a paid or closed obligation is a [`EngineError::Conflict`].
    pub async fn record_payment(
        &self,
        actor: &Actor,
        cmd: PaymentCmd,
    ) -> ResultEngine<PaymentReceipt> {
        with_tx!(self, |db_tx| {
            self.record_payment_in_tx(&db_tx, actor, cmd).await
        })
    }

    async fn record_payment_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        cmd: PaymentCmd,
    ) -> ResultEngine<PaymentReceipt> {
        self.require_parcel_in_scope(db_tx, actor, cmd.parcel_id)
            .await?;
        let expense_model = self
            .require_expense_in_community(db_tx, actor, cmd.expense_id)
            .await?;

        let obligation_model = obligations::Entity::find_by_id((
            cmd.expense_id.to_string(),
            cmd.parcel_id.to_string(),
        ))
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::NotFound("obligation not exists".to_string()))?;

        let status = ObligationStatus::try_from(obligation_model.status.as_str())?;
        if !status.is_payable() {
            return Err(EngineError::Conflict(format!(
                "obligation is already {}",
                status.as_str()
            )));
        }
        if cmd.amount_cents != obligation_model.amount_cents {
            return Err(EngineError::Validation(format!(
                "amount_cents must match the prorated amount ({})",
                obligation_model.amount_cents
            )));
        }

        self.claim_obligation(db_tx, cmd.expense_id, cmd.parcel_id)
            .await?;

        let reference = format!("expense {} / parcel {}", cmd.expense_id, cmd.parcel_id);
        let authorization = self.gateway.authorize(cmd.amount_cents, &reference).await?;

        let paid_at = Utc::now();
        let code = self.unique_receipt_code(db_tx, paid_at).await?;

        let payment = Payment {
            id: Uuid::new_v4(),
            expense_id: cmd.expense_id,
            parcel_id: cmd.parcel_id,
            amount_cents: cmd.amount_cents,
            paid_at,
            transaction_id: authorization.transaction_id.clone(),
            receipt_code: code.clone(),
            user_id: actor.user_id.clone(),
            method: cmd.method,
            description: cmd.description,
        };
        payments::ActiveModel::from(&payment).insert(db_tx).await?;

        self.settle_expense_status(db_tx, &expense_model).await?;

        Ok(PaymentReceipt {
            transaction_id: authorization.transaction_id,
            receipt_code: code,
            amount_cents: payment.amount_cents,
            paid_at,
            paid_count: 1,
        })
    }

    /// Pays every `pending`/`late` obligation across the parcels owned by
    /// the actor, all-or-nothing, under one aggregated transaction token
    /// and receipt code.
    pub async fn pay_all(
        &self,
        actor: &Actor,
        cmd: BulkPaymentCmd,
    ) -> ResultEngine<PaymentReceipt> {
        with_tx!(self, |db_tx| {
            self.pay_all_in_tx(&db_tx, actor, cmd).await
        })
    }

    async fn pay_all_in_tx(
        &self,
        db_tx: &DatabaseTransaction,
        actor: &Actor,
        cmd: BulkPaymentCmd,
    ) -> ResultEngine<PaymentReceipt> {
        let parcels = self.parcels_owned_by(db_tx, actor).await?;
        let parcel_ids: Vec<String> = parcels.iter().map(|p| p.id.clone()).collect();
        if parcel_ids.is_empty() {
            return Err(EngineError::NotFound(
                "no pending obligations".to_string(),
            ));
        }

        let targets: Vec<obligations::Model> = obligations::Entity::find()
            .filter(obligations::Column::ParcelId.is_in(parcel_ids))
            .filter(obligations::Column::Status.is_in([
                ObligationStatus::Pending.as_str(),
                ObligationStatus::Late.as_str(),
            ]))
            .order_by_asc(obligations::Column::ExpenseId)
            .order_by_asc(obligations::Column::ParcelId)
            .all(db_tx)
            .await?;

        if targets.is_empty() {
            return Err(EngineError::NotFound(
                "no pending obligations".to_string(),
            ));
        }

        let total_cents: i64 = targets.iter().map(|t| t.amount_cents).sum();
        let reference = format!("bulk payment for {}", actor.user_id);
        let authorization = self.gateway.authorize(total_cents, &reference).await?;

        let paid_at = Utc::now();
        let code = self.unique_receipt_code(db_tx, paid_at).await?;

        let mut expense_ids: Vec<String> = Vec::new();
        for target in &targets {
            let expense_id = Uuid::parse_str(&target.expense_id)
                .map_err(|_| EngineError::NotFound("expense not exists".to_string()))?;
            let parcel_id = Uuid::parse_str(&target.parcel_id)
                .map_err(|_| EngineError::NotFound("parcel not exists".to_string()))?;

            self.claim_obligation(db_tx, expense_id, parcel_id).await?;

            let payment = Payment {
                id: Uuid::new_v4(),
                expense_id,
                parcel_id,
                amount_cents: target.amount_cents,
                paid_at,
                transaction_id: authorization.transaction_id.clone(),
                receipt_code: code.clone(),
                user_id: actor.user_id.clone(),
                method: cmd.method.clone(),
                description: cmd.description.clone(),
            };
            payments::ActiveModel::from(&payment).insert(db_tx).await?;

            if !expense_ids.contains(&target.expense_id) {
                expense_ids.push(target.expense_id.clone());
            }
        }

        for expense_id in expense_ids {
            let expense_model = expenses::Entity::find_by_id(expense_id)
                .one(db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("expense not exists".to_string()))?;
            self.settle_expense_status(db_tx, &expense_model).await?;
        }

        Ok(PaymentReceipt {
            transaction_id: authorization.transaction_id,
            receipt_code: code,
            amount_cents: total_cents,
            paid_at,
            paid_count: targets.len() as u64,
        })
    }

    /// The one authoritative Late transition: an idempotent bulk update
    /// moving overdue `pending` obligations to `late`. Administrators
    /// only; returns the number of rows touched.
    pub async fn refresh_late_statuses(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<u64> {
        self.require_admin(actor)?;
        let result = with_tx!(self, |db_tx| {
            obligations::Entity::update_many()
                .col_expr(
                    obligations::Column::Status,
                    Expr::value(ObligationStatus::Late.as_str()),
                )
                .filter(obligations::Column::Status.eq(ObligationStatus::Pending.as_str()))
                .filter(obligations::Column::DueDate.lt(now))
                .exec(&db_tx)
                .await
                .map_err(EngineError::from)
        })?;
        Ok(result.rows_affected)
    }

    /// Claims one obligation for payment with a status-conditional update.
    ///
    /// The row count is the concurrency guard: two racing payments on the
    /// same obligation cannot both observe an affected row.
    async fn claim_obligation(
        &self,
        db_tx: &DatabaseTransaction,
        expense_id: Uuid,
        parcel_id: Uuid,
    ) -> ResultEngine<()> {
        let result = obligations::Entity::update_many()
            .col_expr(
                obligations::Column::Status,
                Expr::value(ObligationStatus::Paid.as_str()),
            )
            .filter(obligations::Column::ExpenseId.eq(expense_id.to_string()))
            .filter(obligations::Column::ParcelId.eq(parcel_id.to_string()))
            .filter(obligations::Column::Status.is_in([
                ObligationStatus::Pending.as_str(),
                ObligationStatus::Late.as_str(),
            ]))
            .exec(db_tx)
            .await?;

        if result.rows_affected != 1 {
            return Err(EngineError::Conflict(
                "obligation was already settled".to_string(),
            ));
        }
        Ok(())
    }

    /// Generates a receipt code not yet present in the payments table,
    /// regenerating on collision instead of surfacing it.
    async fn unique_receipt_code(
        &self,
        db_tx: &DatabaseTransaction,
        now: DateTime<Utc>,
    ) -> ResultEngine<String> {
        for _ in 0..RECEIPT_CODE_ATTEMPTS {
            let code = receipt_code(now);
            let taken = payments::Entity::find()
                .filter(payments::Column::ReceiptCode.eq(code.clone()))
                .one(db_tx)
                .await?
                .is_some();
            if !taken {
                return Ok(code);
            }
        }
        Err(EngineError::Conflict(
            "could not allocate a unique receipt code".to_string(),
        ))
    }

    /// Advances the expense after a payment: `pending` → `active` on the
    /// first one, and → `closed` once no unpaid obligation remains.
    async fn settle_expense_status(
        &self,
        db_tx: &DatabaseTransaction,
        expense_model: &expenses::Model,
    ) -> ResultEngine<()> {
        let remaining = obligations::Entity::find()
            .filter(obligations::Column::ExpenseId.eq(expense_model.id.clone()))
            .filter(obligations::Column::Status.ne(ObligationStatus::Paid.as_str()))
            .count(db_tx)
            .await?;

        let current = ExpenseStatus::try_from(expense_model.status.as_str())?;
        let next = if remaining == 0 {
            Some(ExpenseStatus::Closed)
        } else if current == ExpenseStatus::Pending {
            Some(ExpenseStatus::Active)
        } else {
            None
        };

        if let Some(next) = next
            && next != current
        {
            let active = expenses::ActiveModel {
                id: ActiveValue::Set(expense_model.id.clone()),
                status: ActiveValue::Set(next.as_str().to_string()),
                ..Default::default()
            };
            active.update(db_tx).await?;
        }
        Ok(())
    }
}
