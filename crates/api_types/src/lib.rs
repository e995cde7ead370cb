use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uniform response envelope returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

pub mod expense {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ExpenseKind {
        #[default]
        OrdinaryFee,
        ExtraordinaryFee,
        Fine,
        Other,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ExpenseStatus {
        Pending,
        Active,
        Closed,
    }

    /// How an expense total is split across parcels.
    ///
    /// `custom` carries explicit per-parcel amounts; the server falls back to
    /// an equal split when they do not add up to the total.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case", tag = "method", content = "shares")]
    pub enum DistributionMethod {
        #[default]
        Equal,
        BySurface,
        Custom(Vec<CustomShare>),
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CustomShare {
        pub parcel_id: Uuid,
        pub amount_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub concept: String,
        pub total_amount_cents: i64,
        /// RFC3339 timestamp.
        pub due_date: DateTime<Utc>,
        pub kind: Option<ExpenseKind>,
        /// If absent, the expense is spread over every parcel in the
        /// caller's community.
        pub parcel_ids: Option<Vec<Uuid>>,
        pub distribution: Option<DistributionMethod>,
    }

    /// Partial update; absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseEdit {
        pub concept: Option<String>,
        pub due_date: Option<DateTime<Utc>>,
        pub kind: Option<ExpenseKind>,
        pub total_amount_cents: Option<i64>,
        pub status: Option<ExpenseStatus>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ParcelShareView {
        pub parcel_id: Uuid,
        pub amount_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub expense: ExpenseView,
        pub shares: Vec<ParcelShareView>,
        /// True when a custom distribution was rejected and the server
        /// fell back to an equal split.
        pub distribution_fell_back: bool,
    }
}

pub mod payment {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub expense_id: Uuid,
        pub parcel_id: Uuid,
        pub amount_cents: i64,
        pub method: String,
        pub description: Option<String>,
    }

    /// Pays every outstanding obligation of the caller's parcels at once.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PayAll {
        pub method: String,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Receipt {
        pub transaction_id: String,
        pub receipt_code: String,
        pub amount_cents: i64,
        pub paid_at: DateTime<Utc>,
        /// Number of obligations settled by this payment event.
        pub paid_count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LateRefresh {
        /// Obligations moved from pending to late.
        pub marked_late: u64,
    }
}

pub mod query {
    use super::*;
    use super::expense::{ExpenseKind, ExpenseView};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ObligationStatus {
        Pending,
        Late,
        Paid,
        Closed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ObligationView {
        pub expense_id: Uuid,
        pub parcel_id: Uuid,
        pub amount_cents: i64,
        pub status: ObligationStatus,
        pub due_date: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DistributionResponse {
        pub expense: ExpenseView,
        pub obligations: Vec<ObligationView>,
        pub paid_count: u64,
        pub pending_count: u64,
        pub amount_paid_cents: i64,
        pub amount_pending_cents: i64,
    }

    /// An outstanding obligation joined with its expense header.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PendingView {
        pub expense_id: Uuid,
        pub parcel_id: Uuid,
        pub concept: String,
        pub kind: ExpenseKind,
        pub amount_cents: i64,
        pub status: ObligationStatus,
        pub due_date: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PendingResponse {
        pub obligations: Vec<PendingView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub expense_id: Uuid,
        pub parcel_id: Uuid,
        pub amount_cents: i64,
        pub paid_at: DateTime<Utc>,
        pub transaction_id: String,
        pub receipt_code: String,
        pub method: String,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PeriodTotal {
        pub count: u64,
        pub amount_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CompletedResponse {
        pub payments: Vec<PaymentView>,
        pub last_90_days: PeriodTotal,
    }
}
