//! Core trait for the external payout rail
//!
//! The settlement workers only know the gateway through `PayoutGateway`, so
//! the simulated gateway used by the CLI and the scripted fake used by tests
//! plug in interchangeably.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{PayoutInstruction, PayoutReceipt, WithdrawalError};

/// Failure reported by a payout gateway
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Timeout, throttling, unavailable: worth another attempt
    #[error("transient: {0}")]
    Transient(String),

    /// Refused for good: retrying cannot help
    #[error("permanent: {0}")]
    Permanent(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transient(_))
    }

    /// The gateway's message without the classification prefix
    pub fn message(&self) -> &str {
        match self {
            GatewayError::Transient(message) | GatewayError::Permanent(message) => message,
        }
    }
}

impl From<GatewayError> for WithdrawalError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Transient(message) => WithdrawalError::transient_gateway_error(message),
            GatewayError::Permanent(message) => WithdrawalError::permanent_gateway_error(message),
        }
    }
}

/// External payout rail
///
/// Treated as unreliable. Implementations must be safe to call with the same
/// instruction more than once; `instruction.withdrawal_id` and
/// `instruction.idempotency_key` stay the same across retries.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    /// Execute one payout attempt
    async fn execute(&self, instruction: &PayoutInstruction) -> Result<PayoutReceipt, GatewayError>;
}
