//! Shared-library handler loaded by `dylib_handler_tests.rs`.
//!
//! Built with `rustc --crate-type cdylib`. `--cfg abi_mismatch`,
//! `--cfg no_handler` and `--cfg no_free` produce the broken variants.

use std::ffi::{c_char, CStr, CString};
use std::sync::atomic::{AtomicUsize, Ordering};

static FREED: AtomicUsize = AtomicUsize::new(0);

#[no_mangle]
pub extern "C" fn xfunction_handler_abi_version() -> u32 {
    if cfg!(abi_mismatch) {
        2
    } else {
        1
    }
}

/// Echoes the input back as `{"result":{"echo":<input>}}`, except for a few
/// string inputs that select a failure mode.
#[cfg(not(no_handler))]
#[no_mangle]
pub unsafe extern "C" fn handler(input: *const c_char) -> *mut c_char {
    let input = CStr::from_ptr(input).to_string_lossy().into_owned();
    let reply: Vec<u8> = match input.as_str() {
        "\"null\"" => return std::ptr::null_mut(),
        "\"invalid-utf8\"" => vec![0xff, 0xfe, 0xfd],
        "\"boom\"" => br#"{"error":"boom"}"#.to_vec(),
        "\"malformed\"" => b"{}".to_vec(),
        _ => format!(r#"{{"result":{{"echo":{}}}}}"#, input).into_bytes(),
    };
    match CString::new(reply) {
        Ok(text) => text.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

#[cfg(not(no_free))]
#[no_mangle]
pub unsafe extern "C" fn handler_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
        FREED.fetch_add(1, Ordering::SeqCst);
    }
}

#[no_mangle]
pub extern "C" fn fixture_freed_count() -> usize {
    FREED.load(Ordering::SeqCst)
}
