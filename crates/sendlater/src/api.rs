//! Method-call boundary for host applications.
//!
//! Mirrors a message-channel plugin surface: calls arrive as a method name
//! plus a JSON argument map, results go back as success, a structured
//! error, or not-implemented.
//!
//! Error propagation at this boundary is lossy: only argument validation
//! produces a structured error. Scheduling and send failures (permission
//! refused, store unavailable, telephony rejection) are converted to log
//! lines and the call still reports success, so the caller has no channel
//! to learn that a scheduled send will never happen. Embedders who need
//! real error reporting should call the typed [`SmsScheduler`] methods
//! instead.

use serde_json::Value;
use time::OffsetDateTime;
use tracing::error;

use crate::service::SmsScheduler;
use crate::store::AlarmStore;

/// Error code returned when required arguments are missing or malformed.
pub const ERROR_INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";

/// One call arriving over the method channel.
#[derive(Debug, Clone)]
pub struct MethodCall {
    /// Method name, e.g. `"scheduleSms"`.
    pub method: String,
    /// JSON argument map.
    pub args: Value,
}

impl MethodCall {
    /// Create a call.
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// Result of a method call.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutcome {
    /// The call succeeded with the given value (often `Value::Null`).
    Success(Value),
    /// The call failed with a structured error.
    Error {
        /// Machine-readable error code, e.g. [`ERROR_INVALID_ARGUMENTS`].
        code: String,
        /// Human-readable description.
        message: String,
    },
    /// The method name is not part of this surface.
    NotImplemented,
}

impl MethodOutcome {
    fn invalid_arguments(message: &str) -> Self {
        MethodOutcome::Error {
            code: ERROR_INVALID_ARGUMENTS.to_owned(),
            message: message.to_owned(),
        }
    }
}

impl<S: AlarmStore> SmsScheduler<S> {
    /// Route one method call.
    ///
    /// Supported methods:
    ///
    /// | Method               | Arguments                                  |
    /// |----------------------|--------------------------------------------|
    /// | `getPlatformVersion` | none                                       |
    /// | `scheduleSms`        | `phoneNumber`, `message`, `scheduledTime` (unix millis) |
    /// | `sendSms`            | `phoneNumber`, `message`                   |
    pub async fn handle_call(&self, call: &MethodCall) -> MethodOutcome {
        match call.method.as_str() {
            "getPlatformVersion" => MethodOutcome::Success(Value::String(self.platform_version())),

            "scheduleSms" => {
                let phone_number = call.args.get("phoneNumber").and_then(Value::as_str);
                let message = call.args.get("message").and_then(Value::as_str);
                let scheduled_time = call.args.get("scheduledTime").and_then(Value::as_i64);

                let (Some(phone_number), Some(message), Some(scheduled_time)) =
                    (phone_number, message, scheduled_time)
                else {
                    return MethodOutcome::invalid_arguments(
                        "Missing phoneNumber, message, or scheduledTime",
                    );
                };

                let Ok(fire_at) =
                    OffsetDateTime::from_unix_timestamp_nanos(scheduled_time as i128 * 1_000_000)
                else {
                    return MethodOutcome::invalid_arguments("scheduledTime out of range");
                };

                // Scheduling failures do not cross this boundary; the call
                // reports success regardless.
                if let Err(e) = self.schedule(phone_number, message, fire_at).await {
                    error!(to = phone_number, error = %e, "Failed to schedule SMS");
                }
                MethodOutcome::Success(Value::Null)
            }

            "sendSms" => {
                let phone_number = call.args.get("phoneNumber").and_then(Value::as_str);
                let message = call.args.get("message").and_then(Value::as_str);

                let (Some(phone_number), Some(message)) = (phone_number, message) else {
                    return MethodOutcome::invalid_arguments("Missing phoneNumber or message");
                };

                if let Err(e) = self.send_now(phone_number, message).await {
                    error!(to = phone_number, error = %e, "Failed to send SMS");
                }
                MethodOutcome::Success(Value::Null)
            }

            _ => MethodOutcome::NotImplemented,
        }
    }
}
