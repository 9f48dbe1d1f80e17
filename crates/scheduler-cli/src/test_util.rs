//! Test-only helpers shared across this crate's unit tests.

use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serialize tests that mutate process environment variables.
///
/// `cargo test` runs unit tests in the same process, so two tests setting
/// conflicting `DATABASE_URL`/`BIND_ADDR` values concurrently would race.
pub fn lock_env() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|e| e.into_inner())
}
