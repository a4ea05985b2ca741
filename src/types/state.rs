//! Withdrawal lifecycle state machine
//!
//! ```text
//! PENDING ──► RESERVED ──► QUEUED ──► SETTLING ──► SETTLED
//!    │                        ▲          │
//!    │                        └──────────┤ (transient error, retry)
//!    ▼                                   ▼
//!  FAILED ◄──────────────────────────  FAILED
//! ```
//!
//! Every legal edge is listed in [`WithdrawalState::can_transition_to`]; anything
//! else is rejected with `InvalidState`.

use std::fmt;

use super::error::WithdrawalError;

/// Lifecycle state of a withdrawal intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WithdrawalState {
    /// Accepted and registered, funds not yet reserved
    Pending,
    /// Funds held on the ledger
    Reserved,
    /// Waiting in the account's settlement queue
    Queued,
    /// A worker is calling the payout gateway
    Settling,
    /// Payout confirmed, reservation committed (terminal)
    Settled,
    /// Rejected or abandoned, reservation released (terminal)
    Failed,
}

impl WithdrawalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Reserved => "RESERVED",
            Self::Queued => "QUEUED",
            Self::Settling => "SETTLING",
            Self::Settled => "SETTLED",
            Self::Failed => "FAILED",
        }
    }

    /// Check if this state has no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Failed)
    }

    /// Check whether `self -> next` is a legal edge
    pub fn can_transition_to(&self, next: WithdrawalState) -> bool {
        use WithdrawalState::*;

        matches!(
            (self, next),
            (Pending, Reserved)
                | (Pending, Failed)
                | (Reserved, Queued)
                | (Queued, Settling)
                | (Settling, Settled)
                | (Settling, Queued)
                | (Settling, Failed)
        )
    }

    /// Compute the state after moving to `next`
    ///
    /// Pure: callers apply the returned state only once every side effect of
    /// the transition has succeeded.
    ///
    /// # Returns
    ///
    /// * `Ok(next)` - If the edge is legal
    /// * `Err(WithdrawalError::InvalidState)` - If the edge is not part of the machine
    pub fn transition(self, next: WithdrawalState) -> Result<WithdrawalState, WithdrawalError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(WithdrawalError::invalid_transition(self, next))
        }
    }
}

impl fmt::Display for WithdrawalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
