//! App-facing scheduling service.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::debug;

use crate::action::ActionId;
use crate::authz::{Authorization, AuthorizationOutcome, Capability, Granted};
use crate::clock::{Clock, SystemClock};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::runtime::{AlarmRuntime, RuntimeConfig};
use crate::scheduler::Scheduler;
use crate::send::{ReceiptBus, SentReceipt, SmsSender};
use crate::store::AlarmStore;

/// The single entrypoint for scheduling and sending, constructed once per
/// process and passed to callers explicitly.
///
/// All collaborators (store, sender, authorization, clock) are injected
/// through the [`builder`](Self::builder), so tests substitute fakes for
/// any of them.
///
/// # Example
///
/// ```ignore
/// let scheduler = SmsScheduler::builder(store, sender)
///     .authorization(authz)
///     .config(RuntimeConfig::default())
///     .build();
///
/// scheduler.schedule("555", "hello", fire_at).await?;
/// scheduler.runtime().run(shutdown_signal).await?;
/// ```
pub struct SmsScheduler<S: AlarmStore> {
    store: S,
    scheduler: Scheduler<S>,
    dispatcher: Arc<Dispatcher<S>>,
    sender: Arc<dyn SmsSender>,
    authz: Arc<dyn Authorization>,
    clock: Arc<dyn Clock>,
    receipts: ReceiptBus,
    config: RuntimeConfig,
}

impl<S: AlarmStore> SmsScheduler<S> {
    /// Create a builder over the given store and send capability.
    pub fn builder(store: S, sender: impl SmsSender) -> SmsSchedulerBuilder<S> {
        SmsSchedulerBuilder {
            store,
            sender: Arc::new(sender),
            authz: Arc::new(Granted),
            clock: Arc::new(SystemClock),
            config: RuntimeConfig::default(),
        }
    }

    /// Register a deferred send, returning its derived id.
    ///
    /// Runs the two-phase authorization protocol: when exact wake
    /// scheduling is refused, the authorization is asked to obtain it and
    /// the call resumes only on an affirmative outcome.
    ///
    /// # Errors
    ///
    /// [`Error::PermissionDenied`] when the capability stays denied after a
    /// request.
    pub async fn schedule(
        &self,
        target: &str,
        payload: &str,
        fire_at: OffsetDateTime,
    ) -> Result<ActionId> {
        match self.scheduler.schedule(target, payload, fire_at).await {
            Err(Error::PermissionDenied(capability)) => {
                debug!(%capability, "Scheduling blocked on authorization, requesting");
                match self.authz.request(capability).await {
                    AuthorizationOutcome::Granted => {
                        self.scheduler.schedule(target, payload, fire_at).await
                    }
                    AuthorizationOutcome::Denied => Err(Error::PermissionDenied(capability)),
                }
            }
            other => other,
        }
    }

    /// Send immediately, bypassing the commitment store.
    ///
    /// Runs the two-phase protocol for send authorization, then hands the
    /// message to the telephony layer. No chunking, no delivery wait.
    pub async fn send_now(&self, target: &str, payload: &str) -> Result<()> {
        if !self.authz.check(Capability::SendSms) {
            match self.authz.request(Capability::SendSms).await {
                AuthorizationOutcome::Granted => {}
                AuthorizationOutcome::Denied => {
                    return Err(Error::PermissionDenied(Capability::SendSms));
                }
            }
        }

        self.sender.send(target, payload).await?;
        self.receipts.publish(SentReceipt {
            action: None,
            target: target.to_owned(),
            at: self.clock.now(),
        });
        Ok(())
    }

    /// A human-readable description of the host platform.
    pub fn platform_version(&self) -> String {
        format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Subscribe to sent receipts.
    ///
    /// The core publishes to this channel and never consumes it.
    pub fn receipts(&self) -> tokio::sync::broadcast::Receiver<SentReceipt> {
        self.receipts.subscribe()
    }

    /// Build the alarm runtime that fires this service's commitments.
    pub fn runtime(&self) -> AlarmRuntime<S> {
        AlarmRuntime::new(
            self.store.clone(),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.authz),
            self.config.clone(),
        )
    }
}

/// Builder for [`SmsScheduler`].
///
/// Authorization defaults to [`Granted`], the clock to the system clock,
/// and the config to [`RuntimeConfig::default`].
pub struct SmsSchedulerBuilder<S: AlarmStore> {
    store: S,
    sender: Arc<dyn SmsSender>,
    authz: Arc<dyn Authorization>,
    clock: Arc<dyn Clock>,
    config: RuntimeConfig,
}

impl<S: AlarmStore> SmsSchedulerBuilder<S> {
    /// Set the authorization implementation.
    pub fn authorization(mut self, authz: Arc<dyn Authorization>) -> Self {
        self.authz = authz;
        self
    }

    /// Set the clock.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Set the runtime configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the service.
    pub fn build(self) -> SmsScheduler<S> {
        let receipts = ReceiptBus::default();
        let scheduler = Scheduler::new(
            self.store.clone(),
            Arc::clone(&self.authz),
            Arc::clone(&self.clock),
            self.config.allow_inexact,
        );
        let dispatcher = Arc::new(Dispatcher::new(
            self.store.clone(),
            Arc::clone(&self.sender),
            receipts.clone(),
            Arc::clone(&self.clock),
        ));

        SmsScheduler {
            store: self.store,
            scheduler,
            dispatcher,
            sender: self.sender,
            authz: self.authz,
            clock: self.clock,
            receipts,
            config: self.config,
        }
    }
}
