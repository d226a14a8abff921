use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sendlater::{Error, SmsSender};
use time::OffsetDateTime;

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sendlater=debug")
        .try_init();
}

/// An instant `secs` after the epoch.
pub fn at(secs: i64) -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(secs)
}

/// Telephony fake that records handoffs and rejects empty targets, the way
/// the real layer does.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSender {
    async fn send(&self, target: &str, payload: &str) -> sendlater::Result<()> {
        if target.is_empty() {
            return Err(Error::send_failure(target, "empty destination address"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.to_owned(), payload.to_owned()));
        Ok(())
    }
}
