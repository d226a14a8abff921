//! Dispatch signal envelope attached to wake commitments.
//!
//! A commitment carries its payload as a [`DispatchSignal`]: a routing tag,
//! a string extras map, and an opaque locator. The dispatcher validates the
//! tag and reads the extras; the locator exists only to keep commitment
//! identities distinct and is never parsed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Routing tag for scheduled SMS dispatch.
pub const ACTION_SEND_SCHEDULED_SMS: &str = "SEND_SCHEDULED_SMS";

/// Extras key holding the destination address.
pub const EXTRA_PHONE_NUMBER: &str = "EXTRA_PHONE_NUMBER";

/// Extras key holding the message body.
pub const EXTRA_MESSAGE: &str = "EXTRA_MESSAGE";

/// URI scheme of the commitment locator.
const LOCATOR_SCHEME: &str = "smsScheduler";

/// Serialized payload of one wake commitment.
///
/// # Example
///
/// ```
/// use sendlater::signal::{ACTION_SEND_SCHEDULED_SMS, DispatchSignal};
/// use time::OffsetDateTime;
///
/// let fire_at = OffsetDateTime::from_unix_timestamp(1_704_067_200).unwrap();
/// let signal = DispatchSignal::scheduled_sms("555", "hello", fire_at);
///
/// assert_eq!(signal.action, ACTION_SEND_SCHEDULED_SMS);
/// assert_eq!(signal.phone_number(), Some("555"));
/// assert_eq!(signal.message(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSignal {
    /// Routing tag. The dispatcher rejects anything other than
    /// [`ACTION_SEND_SCHEDULED_SMS`] with a logged warning.
    pub action: String,

    /// String extras keyed by [`EXTRA_PHONE_NUMBER`] and [`EXTRA_MESSAGE`].
    ///
    /// Kept as a map rather than named fields so a missing extra is
    /// representable: the dispatcher must handle absent keys by dropping
    /// the action, not by failing deserialization.
    pub extras: BTreeMap<String, String>,

    /// Opaque locator of the form `smsScheduler://{fire_at_millis}/{target}`.
    ///
    /// Only used for commitment identity. Never parsed.
    pub locator: String,
}

impl DispatchSignal {
    /// Build the signal for a scheduled SMS.
    pub fn scheduled_sms(
        target: impl Into<String>,
        payload: impl Into<String>,
        fire_at: OffsetDateTime,
    ) -> Self {
        let target = target.into();
        let millis = (fire_at.unix_timestamp_nanos() / 1_000_000) as i64;
        let locator = format!("{LOCATOR_SCHEME}://{millis}/{target}");

        let mut extras = BTreeMap::new();
        extras.insert(EXTRA_PHONE_NUMBER.to_owned(), target);
        extras.insert(EXTRA_MESSAGE.to_owned(), payload.into());

        Self {
            action: ACTION_SEND_SCHEDULED_SMS.to_owned(),
            extras,
            locator,
        }
    }

    /// Returns `true` if the routing tag identifies a scheduled SMS.
    pub fn is_scheduled_sms(&self) -> bool {
        self.action == ACTION_SEND_SCHEDULED_SMS
    }

    /// The destination address extra, if present.
    pub fn phone_number(&self) -> Option<&str> {
        self.extras.get(EXTRA_PHONE_NUMBER).map(String::as_str)
    }

    /// The message body extra, if present.
    pub fn message(&self) -> Option<&str> {
        self.extras.get(EXTRA_MESSAGE).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fire_at() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_704_067_200).unwrap()
    }

    #[test]
    fn scheduled_sms_signal_shape() {
        let signal = DispatchSignal::scheduled_sms("3030", "1", fire_at());

        assert!(signal.is_scheduled_sms());
        assert_eq!(signal.phone_number(), Some("3030"));
        assert_eq!(signal.message(), Some("1"));
    }

    #[test]
    fn locator_encodes_millis_and_target() {
        let signal = DispatchSignal::scheduled_sms("3030", "1", fire_at());
        assert_eq!(signal.locator, "smsScheduler://1704067200000/3030");
    }

    #[test]
    fn unknown_tag_is_representable() {
        let mut signal = DispatchSignal::scheduled_sms("3030", "1", fire_at());
        signal.action = "SOMETHING_ELSE".into();
        assert!(!signal.is_scheduled_sms());
    }

    #[test]
    fn missing_extras_survive_deserialization() {
        // A signal with no extras must deserialize cleanly; absence is
        // handled downstream by the dispatcher.
        let json = serde_json::json!({
            "action": ACTION_SEND_SCHEDULED_SMS,
            "extras": {},
            "locator": "smsScheduler://0/"
        });
        let signal: DispatchSignal = serde_json::from_value(json).unwrap();
        assert_eq!(signal.phone_number(), None);
        assert_eq!(signal.message(), None);
    }

    #[test]
    fn signal_serde_round_trip() {
        let signal = DispatchSignal::scheduled_sms("555", "hello", fire_at());
        let value = serde_json::to_value(&signal).unwrap();
        assert_eq!(value["action"], ACTION_SEND_SCHEDULED_SMS);
        assert_eq!(value["extras"][EXTRA_PHONE_NUMBER], "555");

        let back: DispatchSignal = serde_json::from_value(value).unwrap();
        assert_eq!(back, signal);
    }
}
