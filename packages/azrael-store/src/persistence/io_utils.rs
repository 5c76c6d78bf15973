//! I/O helpers for persistence operations.

use std::io::ErrorKind;

use crate::error::StoreError;

fn is_transient(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

pub fn classify_io_error(error: std::io::Error, context: &str) -> StoreError {
    StoreError::IoError(format!("{context}: {error}"))
}

/// Retries an operation that may fail with a transient I/O error.
pub fn retry_io_operation<F, T>(
    operation: F,
    max_retries: u32,
    retry_delay_ms: u64,
    context: &str,
) -> Result<T, StoreError>
where
    F: Fn() -> std::io::Result<T>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempt += 1;
                if attempt > max_retries || !is_transient(&err) {
                    return Err(classify_io_error(err, context));
                }
                tracing::warn!(
                    context,
                    attempt,
                    max_retries,
                    error = %err,
                    "transient I/O error, retrying"
                );
                if retry_delay_ms > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(retry_delay_ms));
                }
            }
        }
    }
}
