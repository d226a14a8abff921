//! The immediate-send capability and the sent-receipt channel.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::action::ActionId;

/// Handoff to the platform telephony layer.
///
/// `send` runs synchronously from the caller's perspective: it returns once
/// the message has been handed off (or rejected). There is no chunking of
/// long payloads and no wait for delivery confirmation.
///
/// Implementations should reject with
/// [`Error::SendFailure`](crate::Error::SendFailure) when the telephony
/// layer refuses the payload (including an empty or unroutable target), and
/// with [`Error::PermissionDenied`](crate::Error::PermissionDenied) when the
/// process lacks send authorization. The dispatcher treats both the same
/// way: log, record `Failed`, move on.
#[async_trait]
pub trait SmsSender: Send + Sync + 'static {
    /// Hand one message to the telephony layer.
    async fn send(&self, target: &str, payload: &str) -> crate::Result<()>;
}

#[async_trait]
impl<T: SmsSender + ?Sized> SmsSender for Arc<T> {
    async fn send(&self, target: &str, payload: &str) -> crate::Result<()> {
        (**self).send(target, payload).await
    }
}

/// Notification that a send was handed off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReceipt {
    /// The scheduled action that produced the send, if any.
    ///
    /// `None` for immediate sends, which have no commitment.
    pub action: Option<ActionId>,
    /// Destination address the send was handed to.
    pub target: String,
    /// When the handoff happened.
    pub at: OffsetDateTime,
}

/// Broadcast channel for [`SentReceipt`]s.
///
/// The channel is registered at construction time but nothing in the core
/// consumes it; receipts exist purely for external observers (and tests).
/// Publishing never fails and never blocks; with no subscribers the receipt
/// is discarded.
#[derive(Debug, Clone)]
pub struct ReceiptBus {
    tx: broadcast::Sender<SentReceipt>,
}

impl ReceiptBus {
    /// Create a bus retaining up to `capacity` unconsumed receipts per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future receipts.
    pub fn subscribe(&self) -> broadcast::Receiver<SentReceipt> {
        self.tx.subscribe()
    }

    /// Publish a receipt. Discarded if nobody is listening.
    pub fn publish(&self, receipt: SentReceipt) {
        let _ = self.tx.send(receipt);
    }
}

impl Default for ReceiptBus {
    fn default() -> Self {
        Self::new(64)
    }
}
