//! Expense catalog endpoints.

use api_types::{
    ApiResponse,
    expense::{
        DistributionMethod, ExpenseCreated, ExpenseEdit, ExpenseKind, ExpenseNew, ExpenseStatus,
        ExpenseView, ParcelShareView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::Actor;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

pub(crate) fn kind_to_engine(kind: ExpenseKind) -> engine::ExpenseKind {
    match kind {
        ExpenseKind::OrdinaryFee => engine::ExpenseKind::OrdinaryFee,
        ExpenseKind::ExtraordinaryFee => engine::ExpenseKind::ExtraordinaryFee,
        ExpenseKind::Fine => engine::ExpenseKind::Fine,
        ExpenseKind::Other => engine::ExpenseKind::Other,
    }
}

pub(crate) fn kind_view(kind: engine::ExpenseKind) -> ExpenseKind {
    match kind {
        engine::ExpenseKind::OrdinaryFee => ExpenseKind::OrdinaryFee,
        engine::ExpenseKind::ExtraordinaryFee => ExpenseKind::ExtraordinaryFee,
        engine::ExpenseKind::Fine => ExpenseKind::Fine,
        engine::ExpenseKind::Other => ExpenseKind::Other,
    }
}

pub(crate) fn status_to_engine(status: ExpenseStatus) -> engine::ExpenseStatus {
    match status {
        ExpenseStatus::Pending => engine::ExpenseStatus::Pending,
        ExpenseStatus::Active => engine::ExpenseStatus::Active,
        ExpenseStatus::Closed => engine::ExpenseStatus::Closed,
    }
}

pub(crate) fn status_view(status: engine::ExpenseStatus) -> ExpenseStatus {
    match status {
        engine::ExpenseStatus::Pending => ExpenseStatus::Pending,
        engine::ExpenseStatus::Active => ExpenseStatus::Active,
        engine::ExpenseStatus::Closed => ExpenseStatus::Closed,
    }
}

fn method_to_engine(method: DistributionMethod) -> engine::DistributionMethod {
    match method {
        DistributionMethod::Equal => engine::DistributionMethod::Equal,
        DistributionMethod::BySurface => engine::DistributionMethod::BySurface,
        DistributionMethod::Custom(shares) => engine::DistributionMethod::Custom(
            shares
                .into_iter()
                .map(|share| engine::CustomShare {
                    parcel_id: share.parcel_id,
                    amount_cents: share.amount_cents,
                })
                .collect(),
        ),
    }
}

pub(crate) fn expense_view(expense: engine::CommonExpense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        concept: expense.concept,
        total_amount_cents: expense.total_amount_cents,
        due_date: expense.due_date,
        kind: kind_view(expense.kind),
        status: status_view(expense.status),
        community_id: expense.community_id,
        created_by: expense.created_by,
        created_at: expense.created_at,
    }
}

/// Handle requests for creating a new expense with its prorated shares.
pub async fn create(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseCreated>>), ServerError> {
    let cmd = engine::NewExpense {
        concept: payload.concept,
        total_amount_cents: payload.total_amount_cents,
        due_date: payload.due_date,
        kind: payload
            .kind
            .map_or(engine::ExpenseKind::OrdinaryFee, kind_to_engine),
        parcels: payload.parcel_ids,
        method: payload
            .distribution
            .map(method_to_engine)
            .unwrap_or_default(),
    };

    let created = state.engine.create_expense(&actor, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "expense created",
            ExpenseCreated {
                expense: expense_view(created.expense),
                shares: created
                    .shares
                    .into_iter()
                    .map(|share| ParcelShareView {
                        parcel_id: share.parcel_id,
                        amount_cents: share.amount_cents,
                    })
                    .collect(),
                distribution_fell_back: created.proration_fell_back,
            },
        )),
    ))
}

/// Handle requests for partially updating an expense.
pub async fn edit(
    Extension(actor): Extension<Actor>,
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseEdit>,
) -> Result<Json<ApiResponse<ExpenseView>>, ServerError> {
    let edit = engine::ExpenseEdit {
        concept: payload.concept,
        due_date: payload.due_date,
        kind: payload.kind.map(kind_to_engine),
        total_amount_cents: payload.total_amount_cents,
        status: payload.status.map(status_to_engine),
    };

    let expense = state.engine.edit_expense(&actor, expense_id, edit).await?;

    Ok(Json(ApiResponse::ok(
        "expense updated",
        expense_view(expense),
    )))
}
