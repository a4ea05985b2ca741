//! Per-account settlement queues with a round-robin ready list
//!
//! This module provides the `WithdrawalQueue` struct, which decides which
//! withdrawal a settlement worker works on next.
//!
//! # Design
//!
//! ```text
//! WithdrawalQueue
//!     ├── DashMap<AccountId, AccountQueue>   (FIFO of withdrawal ids + active flag)
//!     └── ready channel of AccountId          (round-robin list of accounts with work)
//! ```
//!
//! An account is *active* while it sits in the ready channel or has an attempt
//! in flight, and it is present in the channel at most once. A worker takes an
//! account from the channel, pops the head of its queue and runs exactly one
//! attempt. Afterwards the account goes to the back of the channel if it still
//! has work, so busy accounts cannot starve quiet ones.
//!
//! A withdrawal that needs a retry goes back to the *front* of its queue and
//! the account stays active (but outside the channel) until its backoff
//! expires, so later withdrawals on the same account cannot overtake it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, error};

use crate::types::{AccountId, WithdrawalId};

#[derive(Debug, Default)]
struct AccountQueue {
    pending: VecDeque<WithdrawalId>,
    active: bool,
}

/// Thread-safe withdrawal queue
#[derive(Debug)]
pub struct WithdrawalQueue {
    queues: DashMap<AccountId, AccountQueue>,
    ready_tx: mpsc::UnboundedSender<AccountId>,
    ready_rx: Mutex<mpsc::UnboundedReceiver<AccountId>>,

    /// Withdrawals enqueued and not yet completed
    outstanding: AtomicUsize,
    drained: Notify,
}

impl WithdrawalQueue {
    pub fn new() -> Self {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        Self {
            queues: DashMap::new(),
            ready_tx,
            ready_rx: Mutex::new(ready_rx),
            outstanding: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    /// Append a withdrawal to its account's queue
    ///
    /// The account queue is created on first use. Never blocks on I/O.
    pub fn enqueue(&self, account: &str, withdrawal_id: WithdrawalId) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);

        let mut queue = self.queues.entry(account.to_string()).or_default();
        queue.pending.push_back(withdrawal_id);
        if !queue.active {
            queue.active = true;
            self.signal(account);
        }
        debug!(account = %account, withdrawal_id = %withdrawal_id, depth = queue.pending.len(), "withdrawal enqueued");
    }

    /// Wait for the next account with work and take the head of its queue
    ///
    /// # Returns
    ///
    /// * `Some((account, withdrawal_id))` - The caller owns one attempt for this
    ///   withdrawal and must report back with `finish_attempt` or
    ///   `requeue_front`
    /// * `None` - The ready channel is closed
    pub async fn next_ready(&self) -> Option<(AccountId, WithdrawalId)> {
        loop {
            let account = self.ready_rx.lock().await.recv().await?;
            if let Some(withdrawal_id) = self.take_next(&account) {
                return Some((account, withdrawal_id));
            }
        }
    }

    /// Pop the head of an account's queue, deactivating the account when empty
    fn take_next(&self, account: &str) -> Option<WithdrawalId> {
        let mut queue = self.queues.get_mut(account)?;
        let next = queue.pending.pop_front();
        if next.is_none() {
            queue.active = false;
        }
        next
    }

    /// Put a withdrawal back at the front of its account's queue
    ///
    /// The account stays active and out of the ready list until
    /// [`WithdrawalQueue::reschedule`] is called.
    pub fn requeue_front(&self, account: &str, withdrawal_id: WithdrawalId) {
        let mut queue = self.queues.entry(account.to_string()).or_default();
        queue.pending.push_front(withdrawal_id);
        queue.active = true;
    }

    /// Return an account to the back of the ready list after a backoff
    pub fn reschedule(&self, account: &str) {
        self.signal(account);
    }

    /// Release an account after a finished attempt
    ///
    /// The account goes to the back of the ready list if it has more work.
    pub fn finish_attempt(&self, account: &str) {
        if let Some(mut queue) = self.queues.get_mut(account) {
            if queue.pending.is_empty() {
                queue.active = false;
            } else {
                self.signal(account);
            }
        }
    }

    /// Mark one enqueued withdrawal as terminal
    pub fn complete_one(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Resolve once every enqueued withdrawal has completed
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.outstanding.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Number of withdrawals waiting on an account (excluding one in flight)
    pub fn depth(&self, account: &str) -> usize {
        self.queues
            .get(account)
            .map(|queue| queue.pending.len())
            .unwrap_or(0)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    fn signal(&self, account: &str) {
        if self.ready_tx.send(account.to_string()).is_err() {
            error!(account = %account, "ready channel closed, account will not be scheduled");
        }
    }
}

impl Default for WithdrawalQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_per_account() {
        let queue = WithdrawalQueue::new();
        let first = WithdrawalId::new();
        let second = WithdrawalId::new();
        queue.enqueue("a", first);
        queue.enqueue("a", second);

        let (account, taken) = queue.next_ready().await.unwrap();
        assert_eq!(account, "a");
        assert_eq!(taken, first);
        queue.finish_attempt("a");

        let (_, taken) = queue.next_ready().await.unwrap();
        assert_eq!(taken, second);
    }

    #[tokio::test]
    async fn test_round_robin_across_accounts() {
        let queue = WithdrawalQueue::new();
        let a1 = WithdrawalId::new();
        let a2 = WithdrawalId::new();
        let b1 = WithdrawalId::new();
        queue.enqueue("a", a1);
        queue.enqueue("a", a2);
        queue.enqueue("b", b1);

        let mut order = Vec::new();
        for _ in 0..3 {
            let (account, id) = queue.next_ready().await.unwrap();
            order.push(id);
            queue.finish_attempt(&account);
        }

        assert_eq!(order, vec![a1, b1, a2]);
    }

    #[tokio::test]
    async fn test_account_in_flight_is_not_handed_out_twice() {
        let queue = WithdrawalQueue::new();
        queue.enqueue("a", WithdrawalId::new());
        queue.enqueue("a", WithdrawalId::new());

        let _in_flight = queue.next_ready().await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(20), queue.next_ready()).await;

        assert!(second.is_err());
        assert_eq!(queue.depth("a"), 1);
    }

    #[tokio::test]
    async fn test_requeue_front_keeps_position() {
        let queue = WithdrawalQueue::new();
        let first = WithdrawalId::new();
        let second = WithdrawalId::new();
        queue.enqueue("a", first);
        queue.enqueue("a", second);

        let (_, taken) = queue.next_ready().await.unwrap();
        queue.requeue_front("a", taken);
        queue.reschedule("a");

        let (_, retried) = queue.next_ready().await.unwrap();
        assert_eq!(retried, first);
    }

    #[tokio::test]
    async fn test_wait_drained() {
        let queue = Arc::new(WithdrawalQueue::new());
        queue.enqueue("a", WithdrawalId::new());
        queue.enqueue("b", WithdrawalId::new());

        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.wait_drained().await })
        };

        queue.complete_one();
        assert_eq!(queue.outstanding(), 1);
        queue.complete_one();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queue.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_wait_drained_returns_immediately_when_empty() {
        let queue = WithdrawalQueue::new();

        tokio::time::timeout(Duration::from_millis(100), queue.wait_drained())
            .await
            .unwrap();
    }
}
