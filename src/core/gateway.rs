//! Payout gateway implementations
//!
//! - `SimulatedGateway`: deterministic stand-in for a real rail, used by the
//!   CLI pipeline. Behaviour is driven by the destination descriptor.
//! - `ScriptedGateway`: fake that plays back a scripted sequence of outcomes
//!   and records every instruction it receives.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::traits::{GatewayError, PayoutGateway};
use crate::types::{PayoutInstruction, PayoutReceipt};

/// Destination prefix that makes the simulated rail refuse the payout
pub const REJECT_PREFIX: &str = "reject:";

/// Destination prefix that makes the first simulated attempt fail transiently
pub const FLAKY_PREFIX: &str = "flaky:";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deterministic simulated payout rail
///
/// | destination      | outcome                                   |
/// |------------------|-------------------------------------------|
/// | `reject:...`     | permanent error on every attempt          |
/// | `flaky:...`      | transient error on attempt 1, then success |
/// | anything else    | success                                   |
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    latency: Duration,
}

impl SimulatedGateway {
    /// Create a simulated gateway that sleeps `latency` per call
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl PayoutGateway for SimulatedGateway {
    async fn execute(&self, instruction: &PayoutInstruction) -> Result<PayoutReceipt, GatewayError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let destination = instruction.destination.as_str();
        if destination.starts_with(REJECT_PREFIX) {
            return Err(GatewayError::Permanent(format!(
                "destination {} refused",
                destination
            )));
        }
        if destination.starts_with(FLAKY_PREFIX) && instruction.attempt <= 1 {
            return Err(GatewayError::Transient(
                "rail temporarily unavailable".to_string(),
            ));
        }

        debug!(withdrawal_id = %instruction.withdrawal_id, attempt = instruction.attempt, "simulated payout confirmed");
        Ok(PayoutReceipt {
            reference: format!("sim-{}", instruction.withdrawal_id),
        })
    }
}

type Outcome = Result<PayoutReceipt, GatewayError>;

/// Scripted fake gateway
///
/// Each call pops the next outcome from the script registered for the
/// instruction's destination, then from the shared script, and finally
/// returns the fallback (success unless changed). Receipt references are
/// suffixed with the withdrawal id and attempt number.
#[derive(Debug)]
pub struct ScriptedGateway {
    shared: Mutex<VecDeque<Outcome>>,
    by_destination: Mutex<HashMap<String, VecDeque<Outcome>>>,
    fallback: Option<GatewayError>,
    delay: Duration,
    calls: Mutex<Vec<PayoutInstruction>>,
}

impl ScriptedGateway {
    /// Create a gateway that plays `script` in order, then succeeds
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        Self {
            shared: Mutex::new(script.into_iter().collect()),
            by_destination: Mutex::new(HashMap::new()),
            fallback: None,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Gateway that always succeeds
    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }

    /// Gateway that always returns `error`
    pub fn failing(error: GatewayError) -> Self {
        Self::succeeding().with_fallback(error)
    }

    /// Successful outcome with a placeholder reference
    pub fn ok() -> Outcome {
        Ok(PayoutReceipt {
            reference: "scripted".to_string(),
        })
    }

    pub fn transient(message: &str) -> Outcome {
        Err(GatewayError::Transient(message.to_string()))
    }

    pub fn permanent(message: &str) -> Outcome {
        Err(GatewayError::Permanent(message.to_string()))
    }

    /// Return `error` once every script is exhausted
    pub fn with_fallback(mut self, error: GatewayError) -> Self {
        self.fallback = Some(error);
        self
    }

    /// Sleep `delay` before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Register a script used only for instructions paying out to `destination`
    pub fn script_for(self, destination: &str, script: impl IntoIterator<Item = Outcome>) -> Self {
        lock(&self.by_destination)
            .entry(destination.to_string())
            .or_default()
            .extend(script);
        self
    }

    /// Instructions received so far, in call order
    pub fn calls(&self) -> Vec<PayoutInstruction> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn next_outcome(&self, instruction: &PayoutInstruction) -> Outcome {
        let scripted = lock(&self.by_destination)
            .get_mut(&instruction.destination)
            .and_then(VecDeque::pop_front);

        let outcome = scripted
            .or_else(|| lock(&self.shared).pop_front())
            .unwrap_or_else(|| match &self.fallback {
                Some(error) => Err(error.clone()),
                None => Self::ok(),
            });

        outcome.map(|receipt| PayoutReceipt {
            reference: format!("{}-{}-{}", receipt.reference, instruction.withdrawal_id, instruction.attempt),
        })
    }
}

#[async_trait]
impl PayoutGateway for ScriptedGateway {
    async fn execute(&self, instruction: &PayoutInstruction) -> Result<PayoutReceipt, GatewayError> {
        lock(&self.calls).push(instruction.clone());
        let outcome = self.next_outcome(instruction);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        outcome
    }
}
