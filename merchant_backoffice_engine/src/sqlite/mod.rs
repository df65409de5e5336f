pub mod db;
mod sqlite_impl;

pub use sqlite_impl::SqliteDatabase;

/// Upper bound on automatic retries of a write transaction that lost a lock race.
pub(crate) const MAX_WRITE_ATTEMPTS: u32 = 8;

/// Re-runs a write transaction while it fails with a retryable conflict, up to
/// [`MAX_WRITE_ATTEMPTS`] extra attempts with linear backoff. The final conflict error is
/// surfaced to the caller as-is so it can be distinguished from a hard failure.
macro_rules! retry_write {
    ($op:literal, $err:ty, $body:block) => {{
        let mut attempt = 0u32;
        loop {
            let result: ::std::result::Result<_, $err> = async { $body }.await;
            match result {
                Err(ref e) if e.is_retryable() && attempt < $crate::sqlite::MAX_WRITE_ATTEMPTS => {
                    attempt += 1;
                    log::warn!("🗃️ {} hit a write conflict. Retrying (attempt {attempt})", $op);
                    tokio::time::sleep(std::time::Duration::from_millis(u64::from(attempt) * 20)).await;
                },
                _ => break result,
            }
        }
    }};
}

pub(crate) use retry_write;
