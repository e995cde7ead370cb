use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{ActiveValue, Database, DatabaseConnection, EntityTrait};
use uuid::Uuid;

use engine::{
    Actor, BulkPaymentCmd, DistributionMethod, Engine, EngineError, ExpenseEdit, ExpenseKind,
    ExpenseStatus, GatewayAuthorization, NewExpense, ObligationStatus, PaymentCmd, PaymentGateway,
    Role,
};
use migration::MigratorTrait;

/// Gateway that declines every charge.
struct DecliningGateway;

#[async_trait::async_trait]
impl PaymentGateway for DecliningGateway {
    async fn authorize(
        &self,
        _amount_cents: i64,
        _reference: &str,
    ) -> Result<GatewayAuthorization, EngineError> {
        Err(EngineError::Conflict("card declined".to_string()))
    }
}

async fn engine_with_parcels(areas: &[i64]) -> (Engine, DatabaseConnection, Vec<Uuid>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let mut parcel_ids = Vec::new();
    for (i, area) in areas.iter().enumerate() {
        let id = Uuid::new_v4();
        let parcel = engine::parcels::ActiveModel {
            id: ActiveValue::Set(id.to_string()),
            area: ActiveValue::Set(*area),
            community_id: ActiveValue::Set("c1".to_string()),
            owner_id: ActiveValue::Set(format!("resident-{i}")),
        };
        engine::parcels::Entity::insert(parcel)
            .exec(&db)
            .await
            .unwrap();
        parcel_ids.push(id);
    }

    let engine = Engine::builder().database(db.clone()).build().unwrap();
    (engine, db, parcel_ids)
}

fn admin() -> Actor {
    Actor {
        user_id: "admin".to_string(),
        role: Role::Admin,
        community_id: "c1".to_string(),
    }
}

fn resident(i: usize) -> Actor {
    Actor {
        user_id: format!("resident-{i}"),
        role: Role::Resident,
        community_id: "c1".to_string(),
    }
}

fn expense_cmd(total_cents: i64, method: DistributionMethod) -> NewExpense {
    NewExpense {
        concept: "Stairwell cleaning".to_string(),
        total_amount_cents: total_cents,
        due_date: Utc::now() + Duration::days(30),
        kind: ExpenseKind::OrdinaryFee,
        parcels: None,
        method,
    }
}

fn shares_by_parcel(created: &engine::CreatedExpense) -> HashMap<Uuid, i64> {
    created
        .shares
        .iter()
        .map(|s| (s.parcel_id, s.amount_cents))
        .collect()
}

#[tokio::test]
async fn equal_split_bills_every_parcel_the_same() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 100, 100]).await;

    let created = engine
        .create_expense(&admin(), expense_cmd(300_000, DistributionMethod::Equal))
        .await
        .unwrap();

    assert_eq!(created.expense.status, ExpenseStatus::Pending);
    assert!(!created.proration_fell_back);
    let shares = shares_by_parcel(&created);
    for parcel_id in &parcel_ids {
        assert_eq!(shares[parcel_id], 100_000);
    }

    let summary = engine
        .distribution(&admin(), created.expense.id)
        .await
        .unwrap();
    assert_eq!(summary.pending_count, 3);
    assert_eq!(summary.amount_pending_cents, 300_000);
    assert_eq!(summary.amount_paid_cents, 0);
}

#[tokio::test]
async fn surface_split_weights_by_area() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 200, 300]).await;

    let created = engine
        .create_expense(&admin(), expense_cmd(300_000, DistributionMethod::BySurface))
        .await
        .unwrap();

    let shares = shares_by_parcel(&created);
    assert_eq!(shares[&parcel_ids[0]], 50_000);
    assert_eq!(shares[&parcel_ids[1]], 100_000);
    assert_eq!(shares[&parcel_ids[2]], 150_000);
}

#[tokio::test]
async fn indivisible_total_still_sums_exactly() {
    let (engine, _db, _) = engine_with_parcels(&[100, 100, 100]).await;

    let created = engine
        .create_expense(&admin(), expense_cmd(100, DistributionMethod::Equal))
        .await
        .unwrap();

    let mut amounts: Vec<i64> = created.shares.iter().map(|s| s.amount_cents).collect();
    amounts.sort_unstable();
    assert_eq!(amounts.iter().sum::<i64>(), 100);
    assert_eq!(amounts, vec![33, 33, 34]);
}

#[tokio::test]
async fn bad_custom_distribution_falls_back_to_equal() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 100]).await;

    let custom = DistributionMethod::Custom(vec![engine::CustomShare {
        parcel_id: parcel_ids[0],
        // Does not cover the full total.
        amount_cents: 1_000,
    }]);
    let created = engine
        .create_expense(&admin(), expense_cmd(10_000, custom))
        .await
        .unwrap();

    assert!(created.proration_fell_back);
    let shares = shares_by_parcel(&created);
    assert_eq!(shares[&parcel_ids[0]], 5_000);
    assert_eq!(shares[&parcel_ids[1]], 5_000);
}

#[tokio::test]
async fn explicit_parcel_subset_limits_the_billing() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 100, 100]).await;

    let mut cmd = expense_cmd(10_000, DistributionMethod::Equal);
    cmd.parcels = Some(vec![parcel_ids[0], parcel_ids[1]]);
    let created = engine.create_expense(&admin(), cmd).await.unwrap();

    assert_eq!(created.shares.len(), 2);
    let shares = shares_by_parcel(&created);
    assert!(!shares.contains_key(&parcel_ids[2]));
}

#[tokio::test]
async fn residents_cannot_create_expenses() {
    let (engine, _db, _) = engine_with_parcels(&[100]).await;

    let err = engine
        .create_expense(&resident(0), expense_cmd(10_000, DistributionMethod::Equal))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn payment_activates_expense_and_issues_receipt() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(20_000, DistributionMethod::Equal))
        .await
        .unwrap();

    let receipt = engine
        .record_payment(
            &resident(0),
            PaymentCmd {
                expense_id: created.expense.id,
                parcel_id: parcel_ids[0],
                amount_cents: 10_000,
                method: "card".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.amount_cents, 10_000);
    assert_eq!(receipt.paid_count, 1);
    assert!(receipt.receipt_code.starts_with("GC-"));
    assert_eq!(receipt.receipt_code.split('-').count(), 3);
    assert_eq!(receipt.transaction_id.len(), 32);

    let summary = engine
        .distribution(&admin(), created.expense.id)
        .await
        .unwrap();
    assert_eq!(summary.expense.status, ExpenseStatus::Active);
    assert_eq!(summary.paid_count, 1);
    assert_eq!(summary.amount_paid_cents, 10_000);
    assert_eq!(summary.amount_pending_cents, 10_000);
}

#[tokio::test]
async fn double_payment_conflicts_and_keeps_one_row() {
    let (engine, db, parcel_ids) = engine_with_parcels(&[100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(10_000, DistributionMethod::Equal))
        .await
        .unwrap();

    let cmd = PaymentCmd {
        expense_id: created.expense.id,
        parcel_id: parcel_ids[0],
        amount_cents: 10_000,
        method: "card".to_string(),
        description: None,
    };
    engine
        .record_payment(&resident(0), cmd.clone())
        .await
        .unwrap();

    let err = engine.record_payment(&resident(0), cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let rows = engine::payments::Entity::find().all(&db).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn mismatched_amount_is_rejected() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(10_000, DistributionMethod::Equal))
        .await
        .unwrap();

    let err = engine
        .record_payment(
            &resident(0),
            PaymentCmd {
                expense_id: created.expense.id,
                parcel_id: parcel_ids[0],
                amount_cents: 9_999,
                method: "card".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn residents_cannot_pay_for_foreign_parcels() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(20_000, DistributionMethod::Equal))
        .await
        .unwrap();

    let err = engine
        .record_payment(
            &resident(1),
            PaymentCmd {
                expense_id: created.expense.id,
                parcel_id: parcel_ids[0],
                amount_cents: 10_000,
                method: "card".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn last_payment_closes_the_expense() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(20_000, DistributionMethod::Equal))
        .await
        .unwrap();

    for (i, parcel_id) in parcel_ids.iter().enumerate() {
        engine
            .record_payment(
                &resident(i),
                PaymentCmd {
                    expense_id: created.expense.id,
                    parcel_id: *parcel_id,
                    amount_cents: 10_000,
                    method: "card".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
    }

    let summary = engine
        .distribution(&admin(), created.expense.id)
        .await
        .unwrap();
    assert_eq!(summary.expense.status, ExpenseStatus::Closed);
    assert_eq!(summary.pending_count, 0);
    assert_eq!(summary.amount_paid_cents, 20_000);
}

#[tokio::test]
async fn pay_all_settles_every_open_obligation_at_once() {
    let (engine, _db, _) = engine_with_parcels(&[100]).await;
    engine
        .create_expense(&admin(), expense_cmd(10_000, DistributionMethod::Equal))
        .await
        .unwrap();
    engine
        .create_expense(&admin(), expense_cmd(4_000, DistributionMethod::Equal))
        .await
        .unwrap();

    let receipt = engine
        .pay_all(
            &resident(0),
            BulkPaymentCmd {
                method: "transfer".to_string(),
                description: Some("monthly sweep".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(receipt.paid_count, 2);
    assert_eq!(receipt.amount_cents, 14_000);

    let completed = engine.completed_for_user(&resident(0)).await.unwrap();
    assert_eq!(completed.payments.len(), 2);
    let codes: Vec<&str> = completed
        .payments
        .iter()
        .map(|p| p.receipt_code.as_str())
        .collect();
    assert_eq!(codes[0], codes[1]);

    let err = engine
        .pay_all(
            &resident(0),
            BulkPaymentCmd {
                method: "transfer".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn declined_charge_rolls_back_the_payment() {
    let (engine, db, parcel_ids) = engine_with_parcels(&[100, 100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(20_000, DistributionMethod::Equal))
        .await
        .unwrap();

    let declining = Engine::builder()
        .database(db.clone())
        .gateway(Arc::new(DecliningGateway))
        .build()
        .unwrap();

    let cmd = PaymentCmd {
        expense_id: created.expense.id,
        parcel_id: parcel_ids[0],
        amount_cents: 10_000,
        method: "card".to_string(),
        description: None,
    };
    let err = declining
        .record_payment(&resident(0), cmd.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // The obligation was claimed before the charge; the decline must undo it.
    let rows = engine::payments::Entity::find().all(&db).await.unwrap();
    assert!(rows.is_empty());
    let summary = engine
        .distribution(&admin(), created.expense.id)
        .await
        .unwrap();
    assert_eq!(summary.expense.status, ExpenseStatus::Pending);
    assert_eq!(summary.pending_count, 2);
    assert_eq!(summary.amount_paid_cents, 0);

    engine.record_payment(&resident(0), cmd).await.unwrap();
}

#[tokio::test]
async fn declined_charge_keeps_pay_all_atomic() {
    let (engine, db, _) = engine_with_parcels(&[100]).await;
    engine
        .create_expense(&admin(), expense_cmd(10_000, DistributionMethod::Equal))
        .await
        .unwrap();
    engine
        .create_expense(&admin(), expense_cmd(4_000, DistributionMethod::Equal))
        .await
        .unwrap();

    let declining = Engine::builder()
        .database(db.clone())
        .gateway(Arc::new(DecliningGateway))
        .build()
        .unwrap();

    let err = declining
        .pay_all(
            &resident(0),
            BulkPaymentCmd {
                method: "transfer".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let rows = engine::payments::Entity::find().all(&db).await.unwrap();
    assert!(rows.is_empty());
    let pending = engine.pending_for_user(&resident(0)).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(
        pending
            .iter()
            .all(|o| o.status == ObligationStatus::Pending)
    );

    let receipt = engine
        .pay_all(
            &resident(0),
            BulkPaymentCmd {
                method: "transfer".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.paid_count, 2);
}

#[tokio::test]
async fn refresh_late_statuses_is_idempotent() {
    let (engine, _db, _) = engine_with_parcels(&[100, 100]).await;
    let mut cmd = expense_cmd(20_000, DistributionMethod::Equal);
    cmd.due_date = Utc::now() - Duration::days(1);
    engine.create_expense(&admin(), cmd).await.unwrap();

    let marked = engine
        .refresh_late_statuses(&admin(), Utc::now())
        .await
        .unwrap();
    assert_eq!(marked, 2);

    let marked_again = engine
        .refresh_late_statuses(&admin(), Utc::now())
        .await
        .unwrap();
    assert_eq!(marked_again, 0);

    let pending = engine.pending_for_user(&resident(0)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, ObligationStatus::Late);
}

#[tokio::test]
async fn late_obligations_stay_payable() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100]).await;
    let mut cmd = expense_cmd(10_000, DistributionMethod::Equal);
    cmd.due_date = Utc::now() - Duration::days(1);
    let created = engine.create_expense(&admin(), cmd).await.unwrap();

    engine
        .refresh_late_statuses(&admin(), Utc::now())
        .await
        .unwrap();

    engine
        .record_payment(
            &resident(0),
            PaymentCmd {
                expense_id: created.expense.id,
                parcel_id: parcel_ids[0],
                amount_cents: 10_000,
                method: "card".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn editing_the_total_recomputes_only_unpaid_shares() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 100, 100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(300_000, DistributionMethod::Equal))
        .await
        .unwrap();

    engine
        .record_payment(
            &resident(0),
            PaymentCmd {
                expense_id: created.expense.id,
                parcel_id: parcel_ids[0],
                amount_cents: 100_000,
                method: "card".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    engine
        .edit_expense(
            &admin(),
            created.expense.id,
            ExpenseEdit {
                total_amount_cents: Some(400_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let summary = engine
        .distribution(&admin(), created.expense.id)
        .await
        .unwrap();
    assert_eq!(summary.amount_paid_cents, 100_000);
    assert_eq!(summary.amount_pending_cents, 400_000);
    for obligation in &summary.obligations {
        if obligation.parcel_id == parcel_ids[0] {
            assert_eq!(obligation.status, ObligationStatus::Paid);
            assert_eq!(obligation.amount_cents, 100_000);
        } else {
            assert_eq!(obligation.amount_cents, 200_000);
        }
    }
}

#[tokio::test]
async fn closing_an_expense_writes_open_obligations_off() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100, 100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(20_000, DistributionMethod::Equal))
        .await
        .unwrap();

    engine
        .edit_expense(
            &admin(),
            created.expense.id,
            ExpenseEdit {
                status: Some(ExpenseStatus::Closed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let summary = engine
        .distribution(&admin(), created.expense.id)
        .await
        .unwrap();
    assert_eq!(summary.expense.status, ExpenseStatus::Closed);
    assert_eq!(summary.pending_count, 0);
    assert_eq!(summary.amount_pending_cents, 0);
    assert!(
        summary
            .obligations
            .iter()
            .all(|o| o.status == ObligationStatus::Closed)
    );

    let err = engine
        .record_payment(
            &resident(0),
            PaymentCmd {
                expense_id: created.expense.id,
                parcel_id: parcel_ids[0],
                amount_cents: 10_000,
                method: "card".to_string(),
                description: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn closed_expenses_reject_further_edits() {
    let (engine, _db, _) = engine_with_parcels(&[100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(10_000, DistributionMethod::Equal))
        .await
        .unwrap();

    engine
        .edit_expense(
            &admin(),
            created.expense.id,
            ExpenseEdit {
                status: Some(ExpenseStatus::Closed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = engine
        .edit_expense(
            &admin(),
            created.expense.id,
            ExpenseEdit {
                concept: Some("New name".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn empty_edit_is_rejected() {
    let (engine, _db, _) = engine_with_parcels(&[100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(10_000, DistributionMethod::Equal))
        .await
        .unwrap();

    let err = engine
        .edit_expense(&admin(), created.expense.id, ExpenseEdit::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn pending_view_is_sorted_by_due_date() {
    let (engine, _db, _) = engine_with_parcels(&[100]).await;

    let mut later = expense_cmd(10_000, DistributionMethod::Equal);
    later.concept = "Later".to_string();
    later.due_date = Utc::now() + Duration::days(60);
    engine.create_expense(&admin(), later).await.unwrap();

    let mut sooner = expense_cmd(4_000, DistributionMethod::Equal);
    sooner.concept = "Sooner".to_string();
    sooner.due_date = Utc::now() + Duration::days(5);
    engine.create_expense(&admin(), sooner).await.unwrap();

    let pending = engine.pending_for_user(&resident(0)).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].concept, "Sooner");
    assert_eq!(pending[1].concept, "Later");
}

#[tokio::test]
async fn completed_view_reports_the_trailing_window() {
    let (engine, _db, parcel_ids) = engine_with_parcels(&[100]).await;
    let created = engine
        .create_expense(&admin(), expense_cmd(10_000, DistributionMethod::Equal))
        .await
        .unwrap();

    engine
        .record_payment(
            &resident(0),
            PaymentCmd {
                expense_id: created.expense.id,
                parcel_id: parcel_ids[0],
                amount_cents: 10_000,
                method: "card".to_string(),
                description: Some("january".to_string()),
            },
        )
        .await
        .unwrap();

    let completed = engine.completed_for_user(&resident(0)).await.unwrap();
    assert_eq!(completed.payments.len(), 1);
    assert_eq!(completed.last_90_days.count, 1);
    assert_eq!(completed.last_90_days.amount_cents, 10_000);

    let other = engine.completed_for_user(&resident(1)).await.unwrap();
    assert!(other.payments.is_empty());
    assert_eq!(other.last_90_days, engine::PeriodTotal::default());
}

#[tokio::test]
async fn residents_cannot_refresh_late_statuses() {
    let (engine, _db, _) = engine_with_parcels(&[100]).await;

    let err = engine
        .refresh_late_statuses(&resident(0), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
