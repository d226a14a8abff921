//! Commitment registration.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::action::{ActionId, ScheduledAction};
use crate::authz::{Authorization, Capability};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::signal::DispatchSignal;
use crate::store::{AlarmStore, Commitment};

/// Registers wake commitments for deferred sends.
///
/// The scheduler does not validate its inputs: an empty target is accepted
/// (the telephony layer rejects it at fire time) and a past `fire_at` is
/// accepted (the commitment is due immediately). The only gate is the
/// exact-alarm authorization check.
///
/// Success means only that the commitment was written; there is no stronger
/// persistence acknowledgment.
pub struct Scheduler<S: AlarmStore> {
    store: S,
    authz: Arc<dyn Authorization>,
    clock: Arc<dyn Clock>,
    allow_inexact: bool,
}

impl<S: AlarmStore> Scheduler<S> {
    /// Create a scheduler over the given store and capabilities.
    pub fn new(
        store: S,
        authz: Arc<dyn Authorization>,
        clock: Arc<dyn Clock>,
        allow_inexact: bool,
    ) -> Self {
        Self {
            store,
            authz,
            clock,
            allow_inexact,
        }
    }

    /// Register a deferred send, returning its derived id.
    ///
    /// Scheduling a fire time whose id collides with an existing commitment
    /// replaces that commitment: two fire times congruent modulo
    /// [`MAX_ID`](crate::action::MAX_ID) cannot coexist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] when exact wake scheduling is
    /// unauthorized and inexact degradation is disabled. Callers holding a
    /// foreground context should run the request protocol on their
    /// [`Authorization`] and retry.
    pub async fn schedule(
        &self,
        target: &str,
        payload: &str,
        fire_at: OffsetDateTime,
    ) -> Result<ActionId> {
        if !self.authz.check(Capability::ExactAlarm) {
            if self.allow_inexact {
                warn!(
                    %fire_at,
                    "Exact wake scheduling unauthorized, degrading to inexact firing"
                );
            } else {
                return Err(Error::PermissionDenied(Capability::ExactAlarm));
            }
        }

        let action = ScheduledAction::new(target, payload, fire_at);
        let signal = DispatchSignal::scheduled_sms(target, payload, fire_at);

        let commitment = Commitment {
            id: action.id,
            fire_at,
            signal: serde_json::to_value(&signal)?,
            state: action.state,
            last_error: None,
            created_at: self.clock.now(),
        };
        self.store.put(commitment).await?;

        debug!(id = %action.id, to = target, %fire_at, "Commitment registered");
        Ok(action.id)
    }
}
