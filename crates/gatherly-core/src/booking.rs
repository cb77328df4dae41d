//! Booking system port
//!
//! The permanent event store lives in the excluded web application. This
//! crate only consumes its creation API: given a cleaned field dict, return
//! the new record id or fail. Materialization treats any error here as
//! retryable - the draft is left untouched.

use async_trait::async_trait;
use serde_json::Value;

/// Creation API of the external booking system
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// Create a permanent event record. Returns the new record id.
    async fn create(&self, fields: Value) -> anyhow::Result<i64>;
}

/// Test support: in-memory booking stubs used by unit and integration tests.
pub mod testing {
    use std::sync::atomic::{AtomicI64, Ordering};

    use parking_lot::Mutex;

    use super::*;

    /// Booking stub that records every create call.
    #[derive(Default)]
    pub struct RecordingBookingApi {
        next_id: AtomicI64,
        pub created: Mutex<Vec<Value>>,
        pub fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl BookingApi for RecordingBookingApi {
        async fn create(&self, fields: Value) -> anyhow::Result<i64> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("database error: constraint violation");
            }
            self.created.lock().push(fields);
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }
}
