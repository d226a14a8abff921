//! Scheduled action types and identifier derivation.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Upper bound (exclusive) for derived action identifiers.
///
/// Matches the 32-bit signed range of the platform request codes the
/// identifier scheme descends from.
pub const MAX_ID: i64 = i32::MAX as i64;

/// Identifier of a scheduled action, derived deterministically from its
/// fire time.
///
/// The derivation is `fire_at_unix_millis mod MAX_ID`. Two fire times
/// congruent modulo [`MAX_ID`] therefore produce the *same* id, and
/// scheduling the second replaces the first's commitment ("update current"
/// semantics). This collision-prone mapping is a known weak point, kept
/// intentionally; see `DESIGN.md` for the alternative that was not taken.
///
/// # Example
///
/// ```
/// use sendlater::ActionId;
/// use time::OffsetDateTime;
///
/// let fire_at = OffsetDateTime::from_unix_timestamp(1_704_067_200).unwrap();
/// let id = ActionId::derive(fire_at);
/// assert_eq!(id, ActionId::derive(fire_at)); // deterministic
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(i64);

impl ActionId {
    /// Derive the id for an action firing at the given time.
    pub fn derive(fire_at: OffsetDateTime) -> Self {
        let millis = (fire_at.unix_timestamp_nanos() / 1_000_000) as i64;
        Self(millis.rem_euclid(MAX_ID))
    }

    /// Wrap a raw id value, e.g. one loaded from storage.
    pub fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Lifecycle state of a scheduled action.
///
/// Transitions are `Pending -> Fired` on a successful dispatch and
/// `Pending -> Failed` when the send is rejected or the signal payload is
/// unusable. There is no terminal cleanup: fired and failed entries remain
/// in the store until an id collision overwrites them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    /// Commitment registered, fire time not yet reached (or not yet claimed).
    Pending,
    /// Dispatch executed and the send was accepted.
    Fired,
    /// Dispatch executed but the send was rejected or the payload was unusable.
    Failed,
}

impl ActionState {
    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionState::Pending => "pending",
            ActionState::Fired => "fired",
            ActionState::Failed => "failed",
        }
    }

    /// Parse the storage representation. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ActionState::Pending),
            "fired" => Some(ActionState::Fired),
            "failed" => Some(ActionState::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending deferred send.
///
/// Created by the scheduler; the id is derived from the fire time at
/// construction. The target is not validated: an empty target is accepted
/// here and only rejected by the telephony layer at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Derived identifier (see [`ActionId::derive`]).
    pub id: ActionId,
    /// Destination address. Not validated.
    pub target: String,
    /// Message body.
    pub payload: String,
    /// Absolute wall-clock fire time. Past values become due immediately.
    pub fire_at: OffsetDateTime,
    /// Current lifecycle state.
    pub state: ActionState,
}

impl ScheduledAction {
    /// Create a pending action with a derived id.
    pub fn new(
        target: impl Into<String>,
        payload: impl Into<String>,
        fire_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: ActionId::derive(fire_at),
            target: target.into(),
            payload: payload.into(),
            fire_at,
            state: ActionState::Pending,
        }
    }
}
