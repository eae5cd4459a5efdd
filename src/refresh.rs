//! Single-flight coordination of token refreshes.
//!
//! The coordinator is either idle or refreshing. The first caller to
//! [`RefreshCoordinator::begin`] while idle gets a [`RefreshTicket`] and is
//! responsible for performing the refresh; everybody else gets a
//! [`RefreshWaiter`] that resolves to the leader's outcome.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Body of the `POST /api/auth/refresh` call.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The new access token.
    Refreshed(String),
    Failed,
}

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    inflight: Mutex<Option<broadcast::Sender<RefreshOutcome>>>,
}

#[derive(Debug)]
pub enum Turn<'a> {
    Lead(RefreshTicket<'a>),
    Wait(RefreshWaiter),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Refreshing for the first caller, a subscription for the rest.
    pub fn begin(&self) -> Turn<'_> {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        match inflight.as_ref() {
            Some(tx) => Turn::Wait(RefreshWaiter { rx: tx.subscribe() }),
            None => {
                let (tx, _) = broadcast::channel(1);
                *inflight = Some(tx);
                debug!("token refresh started");
                Turn::Lead(RefreshTicket {
                    coordinator: self,
                    settled: false,
                })
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn finish(&self, outcome: RefreshOutcome) {
        let tx = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            // No receivers is fine: nobody was waiting.
            let waiters = tx.send(outcome).unwrap_or(0);
            debug!(waiters, "token refresh settled");
        }
    }
}

/// Held by the one caller performing the refresh.
///
/// Dropping it without settling counts as a failed refresh.
#[derive(Debug)]
pub struct RefreshTicket<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshTicket<'_> {
    /// Refreshing -> Idle, waking every waiter with `outcome`.
    pub fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.coordinator.finish(outcome);
    }
}

impl Drop for RefreshTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.finish(RefreshOutcome::Failed);
        }
    }
}

#[derive(Debug)]
pub struct RefreshWaiter {
    rx: broadcast::Receiver<RefreshOutcome>,
}

impl RefreshWaiter {
    pub async fn outcome(mut self) -> RefreshOutcome {
        self.rx.recv().await.unwrap_or(RefreshOutcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_caller_waits_for_the_first() {
        let coordinator = RefreshCoordinator::new();
        let Turn::Lead(ticket) = coordinator.begin() else {
            panic!("first caller should lead");
        };
        assert!(coordinator.is_refreshing());

        let waiters: Vec<_> = (0..3)
            .map(|_| match coordinator.begin() {
                Turn::Wait(w) => w,
                Turn::Lead(_) => panic!("only one leader at a time"),
            })
            .collect();

        ticket.settle(RefreshOutcome::Refreshed("A2".into()));
        assert!(!coordinator.is_refreshing());

        for waiter in waiters {
            assert_eq!(waiter.outcome().await, RefreshOutcome::Refreshed("A2".into()));
        }
    }

    #[tokio::test]
    async fn idle_again_after_settling() {
        let coordinator = RefreshCoordinator::new();
        match coordinator.begin() {
            Turn::Lead(ticket) => ticket.settle(RefreshOutcome::Failed),
            Turn::Wait(_) => panic!("expected to lead"),
        }
        assert!(matches!(coordinator.begin(), Turn::Lead(_)));
    }

    #[tokio::test]
    async fn dropped_ticket_fails_waiters() {
        let coordinator = RefreshCoordinator::new();
        let ticket = coordinator.begin();
        let Turn::Wait(waiter) = coordinator.begin() else {
            panic!("expected to wait");
        };
        drop(ticket);
        assert!(!coordinator.is_refreshing());
        assert_eq!(waiter.outcome().await, RefreshOutcome::Failed);
    }

    #[tokio::test]
    async fn waiter_on_another_task() {
        let coordinator = RefreshCoordinator::new();
        let Turn::Lead(ticket) = coordinator.begin() else {
            panic!("expected to lead");
        };
        let Turn::Wait(waiter) = coordinator.begin() else {
            panic!("expected to wait");
        };
        let handle = tokio::spawn(waiter.outcome());
        tokio::task::yield_now().await;
        ticket.settle(RefreshOutcome::Refreshed("A9".into()));
        assert_eq!(handle.await.unwrap(), RefreshOutcome::Refreshed("A9".into()));
    }
}
