//! Read-only reporting endpoints.

use api_types::{
    ApiResponse,
    query::{
        CompletedResponse, DistributionResponse, ObligationStatus, ObligationView, PaymentView,
        PendingResponse, PendingView, PeriodTotal,
    },
};
use axum::{Extension, Json, extract::{Path, State}};
use engine::Actor;
use uuid::Uuid;

use crate::{ServerError, expenses, server::ServerState};

fn obligation_status_view(status: engine::ObligationStatus) -> ObligationStatus {
    match status {
        engine::ObligationStatus::Pending => ObligationStatus::Pending,
        engine::ObligationStatus::Late => ObligationStatus::Late,
        engine::ObligationStatus::Paid => ObligationStatus::Paid,
        engine::ObligationStatus::Closed => ObligationStatus::Closed,
    }
}

/// Handle requests for one expense's obligations and aggregates.
pub async fn distribution(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DistributionResponse>>, ServerError> {
    let summary = state.engine.distribution(&actor, expense_id).await?;

    Ok(Json(ApiResponse::ok(
        "distribution",
        DistributionResponse {
            expense: expenses::expense_view(summary.expense),
            obligations: summary
                .obligations
                .into_iter()
                .map(|obligation| ObligationView {
                    expense_id: obligation.expense_id,
                    parcel_id: obligation.parcel_id,
                    amount_cents: obligation.amount_cents,
                    status: obligation_status_view(obligation.status),
                    due_date: obligation.due_date,
                })
                .collect(),
            paid_count: summary.paid_count,
            pending_count: summary.pending_count,
            amount_paid_cents: summary.amount_paid_cents,
            amount_pending_cents: summary.amount_pending_cents,
        },
    )))
}

/// Handle requests for the caller's outstanding obligations.
pub async fn pending(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<PendingResponse>>, ServerError> {
    let obligations = state.engine.pending_for_user(&actor).await?;

    Ok(Json(ApiResponse::ok(
        "pending obligations",
        PendingResponse {
            obligations: obligations
                .into_iter()
                .map(|pending| PendingView {
                    expense_id: pending.expense_id,
                    parcel_id: pending.parcel_id,
                    concept: pending.concept,
                    kind: expenses::kind_view(pending.kind),
                    amount_cents: pending.amount_cents,
                    status: obligation_status_view(pending.status),
                    due_date: pending.due_date,
                })
                .collect(),
        },
    )))
}

/// Handle requests for the caller's payment history.
pub async fn completed(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<CompletedResponse>>, ServerError> {
    let completed = state.engine.completed_for_user(&actor).await?;

    Ok(Json(ApiResponse::ok(
        "completed payments",
        CompletedResponse {
            payments: completed
                .payments
                .into_iter()
                .map(|payment| PaymentView {
                    id: payment.id,
                    expense_id: payment.expense_id,
                    parcel_id: payment.parcel_id,
                    amount_cents: payment.amount_cents,
                    paid_at: payment.paid_at,
                    transaction_id: payment.transaction_id,
                    receipt_code: payment.receipt_code,
                    method: payment.method,
                    description: payment.description,
                })
                .collect(),
            last_90_days: PeriodTotal {
                count: completed.last_90_days.count,
                amount_cents: completed.last_90_days.amount_cents,
            },
        },
    )))
}
