//! A single process-wide runtime toggle, set once at startup from `-v`,
//! read on every resolved request.
//!
//! Generalized from the teacher's `BEDTOOLS_COMPATIBLE` atomic flag: there
//! the parser consults a global to pick output semantics; here the
//! pipeline consults a global to decide whether to emit an extra
//! per-request log line independent of the tracing filter (spec.md §4.9).

use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE_REQUEST_LOG: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn set_verbose_request_log(enabled: bool) {
    VERBOSE_REQUEST_LOG.store(enabled, Ordering::Release);
}

#[inline]
pub fn verbose_request_log() -> bool {
    VERBOSE_REQUEST_LOG.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // Process-wide static; run serially so concurrent test threads don't
    // observe each other's writes (matches the teacher's `serial_test` use
    // for its own global-flag tests).
    #[test]
    #[serial]
    fn verbose_request_log_defaults_to_off() {
        set_verbose_request_log(false);
        assert!(!verbose_request_log());
        set_verbose_request_log(true);
        assert!(verbose_request_log());
        set_verbose_request_log(false);
    }
}
