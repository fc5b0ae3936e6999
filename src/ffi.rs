// C ABI over the shared diagnostic log.

use std::collections::VecDeque;
use std::ffi::{c_char, CStr};
use std::ptr;

use tracing::warn;

use crate::error::SharedLogError;
use crate::SharedLog::{DiagnosticRecord, Scope, SharedRingLog};

// Error codes
const DMXP_SUCCESS: i32 = 0;
const DMXP_ERROR_NULL_POINTER: i32 = -1;
const DMXP_ERROR_INVALID_ARG: i32 = -2;
const DMXP_ERROR_CLOSED: i32 = -3;
const DMXP_ERROR_EMPTY: i32 = -5;
const DMXP_ERROR_INTERNAL: i32 = -6;

/// Handle to a diagnostic log attachment (opaque pointer)
pub struct DiagHandle {
    log: SharedRingLog,
    /// Records fetched but not yet handed to the caller, newest first.
    pending: VecDeque<DiagnosticRecord>,
}

fn code(err: &SharedLogError) -> i32 {
    match err {
        SharedLogError::Closed => DMXP_ERROR_CLOSED,
        _ => DMXP_ERROR_INTERNAL,
    }
}

/// Attach to the shared diagnostic ring.
///
/// # Arguments
/// * `global` - Use the machine-wide ring instead of the per-user one.
///
/// # Returns
/// * Pointer to `DiagHandle`, or NULL on failure.
#[no_mangle]
pub extern "C" fn dmxp_diag_open(global: bool) -> *mut DiagHandle {
    let scope = if global { Scope::Global } else { Scope::Local };
    match SharedRingLog::open(scope) {
        Ok(log) => Box::into_raw(Box::new(DiagHandle {
            log,
            pending: VecDeque::new(),
        })),
        Err(e) => {
            warn!(error = %e, "ffi: failed to open diagnostic log");
            ptr::null_mut()
        }
    }
}

/// Write a NUL-terminated UTF-8 string. Oversized text is truncated.
///
/// # Returns
/// * 0 on success, negative error code otherwise.
#[no_mangle]
pub extern "C" fn dmxp_diag_write(handle: *mut DiagHandle, text: *const c_char) -> i32 {
    if handle.is_null() || text.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let handle = unsafe { &*handle };
    let Ok(text) = unsafe { CStr::from_ptr(text) }.to_str() else {
        return DMXP_ERROR_INVALID_ARG;
    };
    match handle.log.write(text) {
        Ok(()) => DMXP_SUCCESS,
        Err(e) => code(&e),
    }
}

/// Copy the next unread record's text into `out_buf`, newest first.
///
/// # Arguments
/// * `out_len` - Input: size of buf, Output: size of the text.
///
/// # Returns
/// * 0 on success.
/// * DMXP_ERROR_EMPTY if nothing new was written.
/// * DMXP_ERROR_INVALID_ARG if the buffer is too small; the record stays queued.
#[no_mangle]
pub extern "C" fn dmxp_diag_receive(handle: *mut DiagHandle, out_buf: *mut u8, out_len: *mut usize) -> i32 {
    if handle.is_null() || out_len.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    let handle = unsafe { &mut *handle };
    let max_len = unsafe { *out_len };

    if handle.pending.is_empty() {
        match handle.log.read_new() {
            Ok(records) => handle.pending.extend(records),
            Err(e) => return code(&e),
        }
    }
    let Some(record) = handle.pending.front() else {
        return DMXP_ERROR_EMPTY;
    };

    let text = record.text.as_bytes();
    unsafe { *out_len = text.len() };
    if text.len() > max_len {
        return DMXP_ERROR_INVALID_ARG;
    }
    if !out_buf.is_null() {
        unsafe { ptr::copy_nonoverlapping(text.as_ptr(), out_buf, text.len()) };
    }
    handle.pending.pop_front();
    DMXP_SUCCESS
}

/// Open handles across all processes, or a negative error code.
#[no_mangle]
pub extern "C" fn dmxp_diag_instance_count(handle: *const DiagHandle) -> i32 {
    if handle.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    match unsafe { &*handle }.log.instance_count() {
        Ok(n) => n as i32,
        Err(e) => code(&e),
    }
}

/// Raw 16-bit message counter.
///
/// # Returns
/// * 0 on success with the counter in `out_count`.
#[no_mangle]
pub extern "C" fn dmxp_diag_message_count(handle: *const DiagHandle, out_count: *mut i16) -> i32 {
    if handle.is_null() || out_count.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    match unsafe { &*handle }.log.total_message_count() {
        Ok(n) => {
            unsafe { *out_count = n };
            DMXP_SUCCESS
        }
        Err(e) => code(&e),
    }
}

/// Detach without freeing the handle. Idempotent.
#[no_mangle]
pub extern "C" fn dmxp_diag_close(handle: *mut DiagHandle) -> i32 {
    if handle.is_null() {
        return DMXP_ERROR_NULL_POINTER;
    }
    match unsafe { &*handle }.log.close() {
        Ok(()) => DMXP_SUCCESS,
        Err(e) => code(&e),
    }
}

/// Free a handle, detaching first if still open.
#[no_mangle]
pub extern "C" fn dmxp_diag_free(handle: *mut DiagHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle);
        }
    }
}

/// Run every pending exit cleanup (for hosts that manage their own signals).
#[no_mangle]
pub extern "C" fn dmxp_diag_close_all() {
    crate::Core::close_all();
}
