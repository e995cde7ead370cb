//! Card-payment gateway adapter.
//!
//! The engine treats the gateway as a black box that turns an amount into
//! an authorization carrying an opaque transaction reference. Only the
//! interface contract is consumed here; settlement lives elsewhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Prefix of every human-facing receipt code.
pub const RECEIPT_PREFIX: &str = "GC";

/// Length of the random receipt fragment.
const RECEIPT_RANDOM_LEN: usize = 6;

/// A granted authorization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayAuthorization {
    /// Opaque transaction reference, at least 128 bits of entropy.
    pub transaction_id: String,
}

/// The payment-gateway contract.
///
/// Implementations must be cheap to share across request handlers.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorizes a charge and returns the gateway's transaction reference.
    ///
    /// `reference` is a short human-readable tag for the charge (used by
    /// real gateways for statements); the simulation ignores it.
    async fn authorize(
        &self,
        amount_cents: i64,
        reference: &str,
    ) -> ResultEngine<GatewayAuthorization>;
}

/// Simulated gateway: always authorizes, issuing a v4-UUID-backed token.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimulatedGateway;

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(
        &self,
        amount_cents: i64,
        _reference: &str,
    ) -> ResultEngine<GatewayAuthorization> {
        if amount_cents <= 0 {
            return Err(EngineError::Validation(
                "charge amount must be > 0".to_string(),
            ));
        }
        Ok(GatewayAuthorization {
            transaction_id: Uuid::new_v4().simple().to_string(),
        })
    }
}

/// Generates a receipt code: `GC-<hex unix-seconds>-<6 alphanumerics>`.
///
/// Codes are probabilistically unique; the payment processor still checks
/// for collisions inside the payment transaction and regenerates on a hit.
pub fn receipt_code(now: DateTime<Utc>) -> String {
    let random: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RECEIPT_RANDOM_LEN)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("{RECEIPT_PREFIX}-{:x}-{random}", now.timestamp())
}
