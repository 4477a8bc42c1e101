//! C ABI over [`format_html`](crate::pipeline::format_html), for hosts that
//! embed the paginator as a shared or static library.
//!
//! Every entry point is `#[no_mangle] extern "C"`. Formatted HTML and report
//! JSON come back in heap buffers owned by this library; release them with
//! `printform_free_buffer` and `printform_free_string` (null is accepted and
//! ignored). Fallible calls return 0 on success:
//!
//! | code | meaning |
//! |---|---|
//! | 1 | a required pointer was null |
//! | 2 | the HTML bytes are not UTF-8 |
//! | 3 | the overrides JSON is not an object |
//!
//! The message for the most recent failure on the calling thread is available
//! from `printform_last_error`. The generated header lives at
//! `include/printform.h`.
//!
//! ```c
//! uint8_t *html_out; uint32_t html_out_len;
//! if (printform_format_html(src, src_len, &html_out, &html_out_len) == 0) {
//!     fwrite(html_out, 1, html_out_len, stdout);
//!     printform_free_buffer(html_out, html_out_len);
//! }
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use serde_json::{Map, Value};

use crate::config::ConfigLayers;
use crate::error::PrintFormError;
use crate::pipeline::format_html;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Hand `bytes` to the caller as a raw buffer.
unsafe fn write_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) {
    let len = bytes.len() as u32;
    let raw = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    *out_buf = raw;
    *out_len = len;
}

unsafe fn read_html<'a>(html_ptr: *const u8, html_len: u32) -> Result<&'a str, PrintFormError> {
    let bytes = slice::from_raw_parts(html_ptr, html_len as usize);
    Ok(std::str::from_utf8(bytes)?)
}

/// Parse the optional overrides JSON object. Null means no overrides.
unsafe fn read_overrides(overrides_json: *const c_char) -> Result<ConfigLayers, PrintFormError> {
    if overrides_json.is_null() {
        return Ok(ConfigLayers::new());
    }
    let text = CStr::from_ptr(overrides_json).to_str()?;
    let overrides: Map<String, Value> = serde_json::from_str(text)?;
    Ok(ConfigLayers::with_overrides(overrides))
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Paginates every `.printform` element in `html_len` bytes of UTF-8 HTML at
/// `html_ptr` using the default configuration. On success `*out_buf` and
/// `*out_len` describe the formatted document.
///
/// # Safety
/// `html_ptr` must be readable for `html_len` bytes and both out pointers
/// must be writable. The returned buffer belongs to the caller until it is
/// passed to `printform_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn printform_format_html(
    html_ptr: *const u8,
    html_len: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if html_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("required pointer argument is null");
        return 1;
    }
    let html = match read_html(html_ptr, html_len) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&e.to_string());
            return 2;
        }
    };
    let (formatted, _report) = format_html(html, &ConfigLayers::new());
    write_buffer(formatted.into_bytes(), out_buf, out_len);
    0
}

/// [`printform_format_html`] with caller overrides and a report.
///
/// `overrides_json` is a null-terminated JSON object of camelCase options, or
/// null for none. `*out_report` receives the report JSON as a C string, or
/// null if it could not be encoded.
///
/// # Safety
/// The pointer rules of [`printform_format_html`] apply. `overrides_json`,
/// when non-null, must be a valid C string. Free `*out_report` with
/// `printform_free_string`.
#[no_mangle]
pub unsafe extern "C" fn printform_format_html_ex(
    html_ptr: *const u8,
    html_len: u32,
    overrides_json: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
    out_report: *mut *mut c_char,
) -> c_int {
    if html_ptr.is_null() || out_buf.is_null() || out_len.is_null() || out_report.is_null() {
        set_last_error("required pointer argument is null");
        return 1;
    }
    let html = match read_html(html_ptr, html_len) {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&e.to_string());
            return 2;
        }
    };
    let layers = match read_overrides(overrides_json) {
        Ok(l) => l,
        Err(e) => {
            set_last_error(&e.to_string());
            return 3;
        }
    };

    let (formatted, report) = format_html(html, &layers);
    write_buffer(formatted.into_bytes(), out_buf, out_len);
    *out_report = match report.to_json().ok().and_then(|json| CString::new(json).ok()) {
        Some(cs) => cs.into_raw(),
        None => ptr::null_mut(),
    };
    0
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free an HTML buffer returned by `printform_format_html`.
///
/// # Safety
/// `buf` must have been returned by a previous `printform_format_html` (or
/// `_ex`) call, and `len` must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn printform_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a report string returned by `printform_format_html_ex`.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn printform_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `printform_*` call on the
/// same thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn printform_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn printform_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &[u8] =
        br#"<div class="printform"><div class="prowitem" style="height:40px">row</div></div>"#;

    fn last_error() -> String {
        let p = printform_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string()
    }

    #[test]
    fn ffi_format_html() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            printform_format_html(FORM.as_ptr(), FORM.len() as u32, &mut out_buf, &mut out_len)
        };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        let html = std::str::from_utf8(bytes).unwrap();
        assert!(html.contains("printform_formatter_processed"));
        assert!(html.contains("prowitem_processed"));

        unsafe { printform_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe { printform_format_html(ptr::null(), 0, &mut out_buf, &mut out_len) };

        assert_eq!(rc, 1);
        assert_eq!(last_error(), "required pointer argument is null");
    }

    #[test]
    fn ffi_invalid_utf8() {
        let bad = [0x3c, 0xff, 0xfe];
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe { printform_format_html(bad.as_ptr(), 3, &mut out_buf, &mut out_len) };

        assert_eq!(rc, 2);
        assert!(out_buf.is_null());
    }

    #[test]
    fn ffi_version() {
        let v = printform_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn ffi_format_html_ex_reports_overrides() {
        let overrides = CString::new(r#"{"papersizeHeight": 600, "nUp": 2}"#).unwrap();
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let mut report_ptr: *mut c_char = ptr::null_mut();

        let rc = unsafe {
            printform_format_html_ex(
                FORM.as_ptr(),
                FORM.len() as u32,
                overrides.as_ptr(),
                &mut out_buf,
                &mut out_len,
                &mut report_ptr,
            )
        };

        assert_eq!(rc, 0);
        assert!(!report_ptr.is_null());
        let json = unsafe { CStr::from_ptr(report_ptr) }.to_str().unwrap();
        assert!(json.contains("\"papersize_height\": 600.0"), "unexpected report: {json}");
        assert!(json.contains("\"n_up\": 2"));
        unsafe {
            printform_free_string(report_ptr);
            printform_free_buffer(out_buf, out_len);
        }
    }

    #[test]
    fn ffi_format_html_ex_rejects_bad_overrides() {
        let overrides = CString::new("[1, 2]").unwrap();
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let mut report_ptr: *mut c_char = ptr::null_mut();

        let rc = unsafe {
            printform_format_html_ex(
                FORM.as_ptr(),
                FORM.len() as u32,
                overrides.as_ptr(),
                &mut out_buf,
                &mut out_len,
                &mut report_ptr,
            )
        };

        assert_eq!(rc, 3);
        assert!(last_error().starts_with("invalid configuration"), "{}", last_error());
    }
}
