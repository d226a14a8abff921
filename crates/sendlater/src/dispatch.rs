//! Dispatch of claimed commitments.

use std::sync::Arc;

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::send::{ReceiptBus, SentReceipt, SmsSender};
use crate::signal::DispatchSignal;
use crate::store::{AlarmStore, ClaimedCommitment};

/// What happened to one dispatched commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The send was handed to the telephony layer.
    Sent,
    /// The telephony layer rejected the send.
    Failed,
    /// The signal was unusable (wrong routing tag or missing extras).
    Dropped,
}

/// Executes claimed commitments against the send capability.
///
/// Dispatch is infallible from the runtime's point of view: every failure
/// is caught here, converted to a log line, and recorded as the
/// commitment's outcome. Nothing propagates upward; an erroring dispatch
/// path would otherwise surface to the wake machinery as an unhandled
/// fault.
///
/// No outcome is reported to the caller that scheduled the action;
/// observability is the log plus the (unconsumed) receipt channel.
pub struct Dispatcher<S: AlarmStore> {
    store: S,
    sender: Arc<dyn SmsSender>,
    receipts: ReceiptBus,
    clock: Arc<dyn Clock>,
}

impl<S: AlarmStore> Dispatcher<S> {
    /// Create a dispatcher over the given store and send capability.
    pub fn new(
        store: S,
        sender: Arc<dyn SmsSender>,
        receipts: ReceiptBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sender,
            receipts,
            clock,
        }
    }

    /// Claim one due commitment and dispatch it.
    ///
    /// Returns `Ok(None)` when nothing is due. Store errors from the claim
    /// itself are returned so the caller can log them; dispatch failures are
    /// not errors (see [`dispatch`](Self::dispatch)).
    pub async fn poll_once(
        &self,
        worker_id: &str,
        lock_duration: Duration,
    ) -> Result<Option<DispatchOutcome>> {
        let claimed = self
            .store
            .claim_due(worker_id, self.clock.now(), lock_duration)
            .await?;

        let Some(claimed) = claimed else {
            return Ok(None);
        };

        Ok(Some(self.dispatch(&claimed).await))
    }

    /// Execute one claimed commitment.
    ///
    /// Re-dispatching the same commitment (duplicate delivery after a lease
    /// expiry) invokes the send again; there is no deduplication.
    pub async fn dispatch(&self, claimed: &ClaimedCommitment) -> DispatchOutcome {
        debug!(id = %claimed.id, fire_at = %claimed.fire_at, "Dispatching commitment");

        let signal: DispatchSignal = match serde_json::from_value(claimed.signal.clone()) {
            Ok(signal) => signal,
            Err(e) => {
                error!(id = %claimed.id, error = %e, "Unreadable dispatch signal, dropping");
                self.record_failed(claimed, &format!("unreadable dispatch signal: {e}"))
                    .await;
                return DispatchOutcome::Dropped;
            }
        };

        if !signal.is_scheduled_sms() {
            warn!(
                id = %claimed.id,
                action = %signal.action,
                "Unrecognized signal action, dropping"
            );
            self.record_failed(claimed, &format!("unrecognized signal action: {}", signal.action))
                .await;
            return DispatchOutcome::Dropped;
        }

        let (Some(target), Some(payload)) = (signal.phone_number(), signal.message()) else {
            error!(id = %claimed.id, "Missing phone number or message in signal extras");
            self.record_failed(claimed, "missing phone number or message in signal extras")
                .await;
            return DispatchOutcome::Dropped;
        };

        match self.sender.send(target, payload).await {
            Ok(()) => {
                debug!(id = %claimed.id, to = target, "Scheduled send handed off");
                if let Err(e) = self.store.mark_fired(claimed.id, self.clock.now()).await {
                    error!(id = %claimed.id, error = %e, "Failed to record fired outcome");
                }
                self.receipts.publish(SentReceipt {
                    action: Some(claimed.id),
                    target: target.to_owned(),
                    at: self.clock.now(),
                });
                DispatchOutcome::Sent
            }
            Err(e) => {
                // The scheduling caller has no channel to hear about this;
                // the log line and the Failed row are the only record.
                error!(id = %claimed.id, to = target, error = %e, "Scheduled send failed");
                self.record_failed(claimed, &e.to_string()).await;
                DispatchOutcome::Failed
            }
        }
    }

    async fn record_failed(&self, claimed: &ClaimedCommitment, reason: &str) {
        if let Err(e) = self
            .store
            .mark_failed(claimed.id, reason, self.clock.now())
            .await
        {
            error!(id = %claimed.id, error = %e, "Failed to record failed outcome");
        }
    }
}
