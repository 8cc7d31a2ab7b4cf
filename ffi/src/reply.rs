//! Reply strings handed back to the host.
//!
//! Every reply is a heap-allocated C string owned by the caller until it is
//! passed to `fanout_free_string`.

use std::ffi::CString;
use std::os::raw::c_char;

/// Wrap encoded results. Falls back to an error reply if the bytes contain an
/// interior NUL, which encoded JSON never does.
pub(crate) fn from_json(bytes: Vec<u8>) -> *mut c_char {
    match CString::new(bytes) {
        Ok(s) => s.into_raw(),
        Err(e) => error(&format!("result contains NUL byte at {}", e.nul_position())),
    }
}

/// `{"error": "Error: <detail>"}`.
pub(crate) fn error(detail: &str) -> *mut c_char {
    let body = serde_json::json!({ "error": format!("Error: {detail}") }).to_string();
    CString::new(body).unwrap_or_default().into_raw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    fn take(ptr: *mut c_char) -> String {
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        drop(unsafe { CString::from_raw(ptr) });
        s
    }

    #[test]
    fn error_reply_shape() {
        let reply: serde_json::Value = serde_json::from_str(&take(error("boom \"x\""))).unwrap();
        assert_eq!(reply["error"], "Error: boom \"x\"");
    }

    #[test]
    fn interior_nul_becomes_error() {
        let reply: serde_json::Value =
            serde_json::from_str(&take(from_json(b"[\0]".to_vec()))).unwrap();
        assert!(reply["error"].as_str().unwrap().contains("NUL"));
    }

    #[test]
    fn json_passes_through() {
        assert_eq!(take(from_json(b"[]".to_vec())), "[]");
    }
}
