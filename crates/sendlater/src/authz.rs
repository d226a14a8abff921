//! Two-phase authorization protocol for platform capabilities.
//!
//! The core never opens permission dialogs. Instead it queries an
//! [`Authorization`] implementation (`check`) and, at a foreground boundary,
//! asks it to obtain the capability (`request`). The original call is
//! resumed only after an affirmative outcome; see
//! [`SmsScheduler::schedule`](crate::SmsScheduler::schedule).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

/// A platform capability the host environment may or may not grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Permission to hand a message to the telephony layer.
    SendSms,
    /// Permission to register exact-time wake commitments.
    ExactAlarm,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::SendSms => f.write_str("send-sms"),
            Capability::ExactAlarm => f.write_str("exact-alarm"),
        }
    }
}

/// Result of a capability request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The capability is now held; the original call may resume.
    Granted,
    /// The user or platform refused the capability.
    Denied,
}

/// Capability query and acquisition, implemented by the host environment.
///
/// `check` must be cheap and side-effect free. `request` may take arbitrarily
/// long (it typically blocks on user interaction) and is only meaningful from
/// a foreground context; the dispatcher never calls it.
#[async_trait]
pub trait Authorization: Send + Sync + 'static {
    /// Returns `true` if the capability is currently held.
    fn check(&self, capability: Capability) -> bool;

    /// Try to obtain the capability, e.g. by prompting the user.
    async fn request(&self, capability: Capability) -> AuthorizationOutcome;
}

/// Authorization that holds every capability.
///
/// The default for embedders that manage permissions out of band.
#[derive(Debug, Clone, Copy, Default)]
pub struct Granted;

#[async_trait]
impl Authorization for Granted {
    fn check(&self, _capability: Capability) -> bool {
        true
    }

    async fn request(&self, _capability: Capability) -> AuthorizationOutcome {
        AuthorizationOutcome::Granted
    }
}

/// Configurable authorization for tests and simulations.
///
/// Capabilities in the granted set pass `check`. Capabilities in the
/// grant-on-request set are denied by `check` until `request` is called for
/// them, after which they are granted, modelling the prompt-then-retry flow.
/// Everything else is denied outright.
#[derive(Debug, Default)]
pub struct StaticAuthorization {
    granted: Mutex<HashSet<Capability>>,
    grant_on_request: HashSet<Capability>,
}

impl StaticAuthorization {
    /// No capabilities held, none obtainable.
    pub fn denied() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start with the given capabilities already held.
    pub fn holding(capabilities: impl IntoIterator<Item = Capability>) -> Arc<Self> {
        Arc::new(Self {
            granted: Mutex::new(capabilities.into_iter().collect()),
            grant_on_request: HashSet::new(),
        })
    }

    /// Start with nothing held, but grant the given capabilities when
    /// requested.
    pub fn granting_on_request(capabilities: impl IntoIterator<Item = Capability>) -> Arc<Self> {
        Arc::new(Self {
            granted: Mutex::new(HashSet::new()),
            grant_on_request: capabilities.into_iter().collect(),
        })
    }
}

#[async_trait]
impl Authorization for StaticAuthorization {
    fn check(&self, capability: Capability) -> bool {
        self.granted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&capability)
    }

    async fn request(&self, capability: Capability) -> AuthorizationOutcome {
        if self.grant_on_request.contains(&capability) {
            self.granted
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(capability);
            AuthorizationOutcome::Granted
        } else {
            AuthorizationOutcome::Denied
        }
    }
}
