//! Shared-cost billing core for a parcel community.
//!
//! Administrators issue community-wide expenses; the engine prorates each
//! one across member parcels, tracks every parcel's obligation through its
//! lifecycle and records payments through a gateway collaborator. All
//! multi-row mutations run inside one database transaction.

pub use commands::{BulkPaymentCmd, ExpenseEdit, NewExpense, PaymentCmd};
pub use error::EngineError;
pub use expenses::{CommonExpense, ExpenseKind, ExpenseStatus};
pub use gateway::{GatewayAuthorization, PaymentGateway, SimulatedGateway, receipt_code};
pub use obligations::{ObligationStatus, ParcelObligation};
pub use ops::{
    Actor, CompletedPayments, CreatedExpense, DistributionSummary, Engine, EngineBuilder,
    PaymentReceipt, PendingObligation, PeriodTotal, Role,
};
pub use parcels::Parcel;
pub use payments::Payment;
pub use proration::{
    CustomShare, DistributionMethod, ParcelShare, ParcelWeight, Proration, prorate,
};

mod commands;
mod error;
pub mod expenses;
mod gateway;
pub mod obligations;
mod ops;
pub mod parcels;
pub mod payments;
mod proration;

type ResultEngine<T> = Result<T, EngineError>;
