//! Kernel error taxonomy.
//!
//! Mirrors the shape of a `ValidationError { reason, message }` pair the way
//! order-management validation is reported elsewhere in this lineage, but
//! expressed with `thiserror` so every variant carries a `Display` impl and a
//! stable discriminant usable as the wire `reason_code`.

use thiserror::Error;

use crate::amount::AmountError;

/// The closed set of per-action rejection reasons (`reason_code` on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    InsufficientFunds,
    InvalidPrice,
    InvalidQuantity,
    OrderNotFound,
    OrderNotOwned,
    AgentBankrupt,
    RateLimited,
    InvalidAction,
    RunNotActive,
}

impl RejectionReason {
    pub const fn code(self) -> &'static str {
        match self {
            RejectionReason::InsufficientFunds => "INSUFFICIENT_FUNDS",
            RejectionReason::InvalidPrice => "INVALID_PRICE",
            RejectionReason::InvalidQuantity => "INVALID_QUANTITY",
            RejectionReason::OrderNotFound => "ORDER_NOT_FOUND",
            RejectionReason::OrderNotOwned => "ORDER_NOT_OWNED",
            RejectionReason::AgentBankrupt => "AGENT_BANKRUPT",
            RejectionReason::RateLimited => "RATE_LIMITED",
            RejectionReason::InvalidAction => "INVALID_ACTION",
            RejectionReason::RunNotActive => "RUN_NOT_ACTIVE",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A single rejected action: the closed reason plus a human-readable message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}: {message}")]
pub struct ActionRejection {
    pub reason: RejectionReason,
    pub message: String,
}

impl ActionRejection {
    pub fn new(reason: RejectionReason, message: impl Into<String>) -> Self {
        ActionRejection {
            reason,
            message: message.into(),
        }
    }
}

/// Errors that abort a call to the kernel entirely (as opposed to a rejected
/// per-action result). Internal variants are fatal to the run: once the
/// event chain has been observed inconsistent, or configuration fails to
/// validate, the run must not continue to accept actions.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("run is not in the 'running' state")]
    NotRunning,

    #[error("run has already been started")]
    AlreadyRunning,

    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}
