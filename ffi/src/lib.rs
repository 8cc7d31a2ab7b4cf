//! C-ABI boundary around `fanout-core`.
//!
//! # Overview
//! A host that cannot cheaply issue many network calls itself passes a JSON
//! array of request objects as a C string and gets back a C string holding
//! the JSON array of responses, one per request, in input order.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Only top-level failures (null or malformed input, encode failure,
//!   runtime startup) produce `{"error": "Error: <detail>"}`; a failed
//!   individual request is reported inside its own slot of the result array.
//! - Calls block the calling thread on a process-wide tokio runtime shared
//!   with every other call (see `runtime`).
//! - The caller owns every returned pointer and must release it with
//!   `fanout_free_string`.

mod reply;
mod runtime;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::catch_unwind;
use std::time::Duration;

use fanout_core::Deadline;

pub use runtime::LOG_ENV;

/// Run a batch of HTTP requests concurrently.
///
/// `input` is a NUL-terminated JSON array of request objects. The reply is a
/// JSON array of response objects in the same order, or
/// `{"error": "Error: <detail>"}` when the batch as a whole could not be run.
/// Never returns null. Free the reply with `fanout_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn fanout_proc(input: *const c_char) -> *mut c_char {
    catch_unwind(|| proc_batch(input, Deadline::none()))
        .unwrap_or_else(|_| reply::error("panic in fanout_proc"))
}

/// Like `fanout_proc`, but requests still outstanding `timeout_ms`
/// milliseconds after the call fail with a deadline error. `0` means no
/// deadline.
#[unsafe(no_mangle)]
pub extern "C" fn fanout_proc_with_timeout(input: *const c_char, timeout_ms: u64) -> *mut c_char {
    catch_unwind(|| {
        let deadline = match timeout_ms {
            0 => Deadline::none(),
            ms => Deadline::after(Duration::from_millis(ms)),
        };
        proc_batch(input, deadline)
    })
    .unwrap_or_else(|_| reply::error("panic in fanout_proc_with_timeout"))
}

/// Free a string returned by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn fanout_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

fn proc_batch(input: *const c_char, deadline: Deadline) -> *mut c_char {
    if input.is_null() {
        return reply::error("null argument: input");
    }
    let raw = unsafe { CStr::from_ptr(input) }.to_bytes();
    match run(raw, deadline) {
        Ok(encoded) => reply::from_json(encoded),
        Err(detail) => reply::error(&detail),
    }
}

fn run(raw: &[u8], deadline: Deadline) -> Result<Vec<u8>, String> {
    let shared = runtime::shared()?;
    shared
        .runtime
        .block_on(shared.executor.execute_with_deadline(raw, deadline))
        .map_err(|e| {
            tracing::error!(error = %e, "batch rejected");
            e.to_string()
        })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
