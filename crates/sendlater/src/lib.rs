//! Deferred SMS dispatch built on durable wake commitments.
//!
//! Sendlater exposes two operations to a host application: send an SMS
//! immediately, or schedule one for a future absolute time. The scheduled
//! path persists a wake commitment that survives process death; when the
//! time arrives a polling runtime re-enters a dispatcher that performs the
//! actual send.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        SmsScheduler (service)                        │
//! │                                                                      │
//! │  schedule(target, payload, fire_at)                                  │
//! │    1. Check exact-alarm authorization (request + resume if refused)  │
//! │    2. Derive id from fire time (fire_at_millis mod MAX_ID)           │
//! │    3. Persist commitment + dispatch signal (insert-or-replace)       │
//! └──────────────────────────────────────────────────────────────────────┘
//!                                   │
//!                            AlarmStore (durable)
//!                                   │
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        AlarmRuntime (worker)                         │
//! │                                                                      │
//! │  poll tick → claim one due commitment (lease) → Dispatcher           │
//! │    validate routing tag → read extras → SmsSender::send              │
//! │    record Fired/Failed; failures are logged, never propagated        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Semantics worth knowing
//!
//! - **Id collisions replace.** The id is derived from the fire time
//!   modulo [`MAX_ID`](action::MAX_ID); two congruent fire times map to one
//!   commitment slot and the later registration wins.
//! - **Past fire times are accepted** and dispatch near-immediately.
//! - **At-least-once.** A process death between send and outcome recording
//!   lets the claim lease expire and the commitment fires again. Nothing
//!   deduplicates.
//! - **Fire-and-forget.** Dispatch outcomes are recorded in the store and
//!   logged; the caller that scheduled the action is never notified.
//! - **No cancellation.** A registered commitment can only be replaced by
//!   scheduling its id again, never removed.
//!
//! # Example
//!
//! ```ignore
//! use sendlater::{MemoryStore, SmsScheduler};
//!
//! let scheduler = SmsScheduler::builder(MemoryStore::new(), TwilioSender::new(creds))
//!     .build();
//!
//! scheduler.schedule("555", "hello", fire_at).await?;
//! scheduler.runtime().run(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```
//!
//! # Feature Flags
//!
//! - `postgres` — Enables [`PgStore`] for commitments that must survive
//!   process restarts
//!
//! # Design Documentation
//!
//! See `DESIGN.md` for architectural decisions and known weak points.

pub mod action;
pub mod api;
mod authz;
mod clock;
mod dispatch;
mod error;
pub mod runtime;
mod scheduler;
mod send;
mod service;
pub mod signal;
mod store;

pub use action::{ActionId, ActionState, ScheduledAction};
pub use api::{ERROR_INVALID_ARGUMENTS, MethodCall, MethodOutcome};
pub use authz::{Authorization, AuthorizationOutcome, Capability, Granted, StaticAuthorization};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{Error, Result};
pub use runtime::{AlarmRuntime, RuntimeConfig};
pub use scheduler::Scheduler;
pub use send::{ReceiptBus, SentReceipt, SmsSender};
pub use service::{SmsScheduler, SmsSchedulerBuilder};
pub use signal::DispatchSignal;
#[cfg(feature = "postgres")]
pub use store::PgStore;
pub use store::{AlarmStore, ClaimedCommitment, Commitment, MemoryStore};
