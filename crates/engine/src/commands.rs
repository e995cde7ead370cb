//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expense create/edit,
//! payment recording), keeping call sites readable and avoiding long
//! argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    expenses::{ExpenseKind, ExpenseStatus},
    proration::DistributionMethod,
};

/// Create a community-wide expense.
#[derive(Clone, Debug)]
pub struct NewExpense {
    pub concept: String,
    pub total_amount_cents: i64,
    pub due_date: DateTime<Utc>,
    pub kind: ExpenseKind,
    /// Explicit parcel set; `None` resolves to every parcel of the
    /// actor's community. Surface areas are read from the parcel records.
    pub parcels: Option<Vec<Uuid>>,
    pub method: DistributionMethod,
}

/// Partial update of an existing expense.
///
/// `total_amount_cents` triggers a recompute of the still-mutable
/// obligations; `status: Closed` writes the remainder off.
#[derive(Clone, Debug, Default)]
pub struct ExpenseEdit {
    pub concept: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub kind: Option<ExpenseKind>,
    pub total_amount_cents: Option<i64>,
    pub status: Option<ExpenseStatus>,
}

impl ExpenseEdit {
    pub fn is_empty(&self) -> bool {
        self.concept.is_none()
            && self.due_date.is_none()
            && self.kind.is_none()
            && self.total_amount_cents.is_none()
            && self.status.is_none()
    }
}

/// Record a single payment against one obligation.
#[derive(Clone, Debug)]
pub struct PaymentCmd {
    pub expense_id: Uuid,
    pub parcel_id: Uuid,
    pub amount_cents: i64,
    pub method: String,
    pub description: Option<String>,
}

/// Pay every open obligation across the caller's parcels.
#[derive(Clone, Debug)]
pub struct BulkPaymentCmd {
    pub method: String,
    pub description: Option<String>,
}
