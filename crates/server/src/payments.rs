//! Payment endpoints.

use api_types::{
    ApiResponse,
    payment::{LateRefresh, PayAll, PaymentNew, Receipt},
};
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use engine::Actor;

use crate::{ServerError, server::ServerState};

fn receipt_view(receipt: engine::PaymentReceipt) -> Receipt {
    Receipt {
        transaction_id: receipt.transaction_id,
        receipt_code: receipt.receipt_code,
        amount_cents: receipt.amount_cents,
        paid_at: receipt.paid_at,
        paid_count: receipt.paid_count,
    }
}

/// Handle requests for paying one obligation.
pub async fn pay(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<PaymentNew>,
) -> Result<Json<ApiResponse<Receipt>>, ServerError> {
    let cmd = engine::PaymentCmd {
        expense_id: payload.expense_id,
        parcel_id: payload.parcel_id,
        amount_cents: payload.amount_cents,
        method: payload.method,
        description: payload.description,
    };

    let receipt = state.engine.record_payment(&actor, cmd).await?;

    Ok(Json(ApiResponse::ok(
        "payment recorded",
        receipt_view(receipt),
    )))
}

/// Handle requests for paying every open obligation of the caller at once.
pub async fn pay_all(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<PayAll>,
) -> Result<Json<ApiResponse<Receipt>>, ServerError> {
    let cmd = engine::BulkPaymentCmd {
        method: payload.method,
        description: payload.description,
    };

    let receipt = state.engine.pay_all(&actor, cmd).await?;

    Ok(Json(ApiResponse::ok(
        "payments recorded",
        receipt_view(receipt),
    )))
}

/// Handle requests for sweeping overdue obligations to `late`.
pub async fn refresh_late(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<LateRefresh>>, ServerError> {
    let marked_late = state
        .engine
        .refresh_late_statuses(&actor, Utc::now())
        .await?;

    Ok(Json(ApiResponse::ok(
        "late statuses refreshed",
        LateRefresh { marked_late },
    )))
}
