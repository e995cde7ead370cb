use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    EngineError, ResultEngine,
    gateway::{PaymentGateway, SimulatedGateway},
};

mod access;
mod expenses;
mod payments;
mod queries;

pub use expenses::CreatedExpense;
pub use payments::PaymentReceipt;
pub use queries::{CompletedPayments, DistributionSummary, PendingObligation, PeriodTotal};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Role carried by the verified identity triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Resident,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Resident => "resident",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin" => Ok(Self::Admin),
            "resident" => Ok(Self::Resident),
            other => Err(EngineError::Validation(format!("invalid role: {other}"))),
        }
    }
}

/// The verified `{user_id, role, community_id}` triple.
///
/// Supplied by the external auth layer on every mutating call; the engine
/// trusts it for scoping decisions and performs no credential checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub community_id: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The billing core: proration, ledger mutations, payment recording.
pub struct Engine {
    database: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    gateway: Option<Arc<dyn PaymentGateway>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the payment gateway (defaults to the simulation).
    pub fn gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> EngineBuilder {
        self.gateway = Some(gateway);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            gateway: self.gateway.unwrap_or_else(|| Arc::new(SimulatedGateway)),
        })
    }
}
