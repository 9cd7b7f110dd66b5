//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names. Inputs are UTF-8 JSON: settings objects or
//! request bodies in the same camelCase shape the pipeline accepts.
//!
//! ## Memory management
//! - Buffers returned by `mforge_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `mforge_free_buffer` / `mforge_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int`: `0` success, `1` null pointer,
//!   `2` invalid UTF-8, `3` rejected input, `4` rendering or I/O failure.
//! - Error details can be retrieved via `mforge_last_error`.
//!
//! ## Thread safety
//! - `mforge_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::PathBuf;
use std::ptr;
use std::slice;
use std::sync::Arc;

use serde::Serialize;

use crate::columns::ColumnWarning;
use crate::document::{build_layout, LayoutDocument, RenderDirective};
use crate::error::Error;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::render::{render_with_timeouts, PdfRenderer, RenderTimeouts};
use crate::settings::ManuscriptSettings;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn fail(err: &Error) -> c_int {
    set_last_error(&err.to_string());
    if err.is_client_error() || matches!(err, Error::Serialization(_)) {
        3
    } else {
        4
    }
}

/// Borrow `len` bytes at `ptr` as UTF-8.
///
/// # Safety
/// `ptr` must point to `len` readable bytes that outlive the returned slice.
unsafe fn input_str<'a>(ptr: *const u8, len: u32) -> Result<&'a str, c_int> {
    let bytes = slice::from_raw_parts(ptr, len as usize);
    std::str::from_utf8(bytes).map_err(|e| {
        set_last_error(&format!("Invalid UTF-8: {e}"));
        2
    })
}

fn parse_settings(json: &str) -> Result<ManuscriptSettings, c_int> {
    serde_json::from_str(json).map_err(|e| fail(&Error::from(e)))
}

/// # Safety
/// `out` must be a valid pointer.
unsafe fn write_string(out: *mut *mut c_char, s: String) -> c_int {
    match CString::new(s) {
        Ok(cs) => {
            *out = cs.into_raw();
            0
        }
        Err(_) => {
            *out = ptr::null_mut();
            set_last_error("output contained a null byte");
            4
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutReport<'a> {
    document: &'a LayoutDocument,
    directive: &'a RenderDirective,
    estimated_pages: u32,
    warnings: &'a [ColumnWarning],
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Validate settings and compute the layout only. Returns JSON with
/// `document`, `directive`, `estimatedPages` and `warnings`.
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `out_json` must be a valid pointer; free `*out_json` with
///   `mforge_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mforge_compute_layout(
    json_ptr: *const u8,
    json_len: u32,
    out_json: *mut *mut c_char,
) -> c_int {
    if json_ptr.is_null() || out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let json = match input_str(json_ptr, json_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let settings = match parse_settings(json) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let layout = match build_layout(&settings) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };
    let report = LayoutReport {
        document: &layout.document,
        directive: &layout.directive,
        estimated_pages: layout.estimated_pages,
        warnings: &layout.warnings,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(s) => write_string(out_json, s),
        Err(e) => fail(&Error::from(e)),
    }
}

/// Lay out and render settings to PDF bytes with the bundled renderer,
/// without writing a file.
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `mforge_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn mforge_render_pdf(
    json_ptr: *const u8,
    json_len: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let json = match input_str(json_ptr, json_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let settings = match parse_settings(json) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let result = build_layout(&settings).and_then(|layout| {
        render_with_timeouts(
            Arc::new(PdfRenderer::default()),
            layout.document,
            layout.directive,
            RenderTimeouts::default(),
        )
    });
    match result {
        Ok(pdf_bytes) => {
            let len = pdf_bytes.len() as u32;
            let buf = pdf_bytes.into_boxed_slice();
            *out_buf = Box::into_raw(buf) as *mut u8;
            *out_len = len;
            0
        }
        Err(e) => fail(&e),
    }
}

/// Handle a full generation request (`{ settings, outputFilename? }`) and
/// return the response JSON. The PDF is stored under `output_dir`, or
/// `generated-pdfs` when `output_dir` is null.
///
/// Returns `0` whenever a response was produced; check its `success` field.
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `output_dir`, if non-null, must be a valid null-terminated UTF-8 string.
/// - Free `*out_json` with `mforge_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mforge_generate(
    json_ptr: *const u8,
    json_len: u32,
    output_dir: *const c_char,
    out_json: *mut *mut c_char,
) -> c_int {
    if json_ptr.is_null() || out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let json = match input_str(json_ptr, json_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let mut config = PipelineConfig::default();
    if !output_dir.is_null() {
        match CStr::from_ptr(output_dir).to_str() {
            Ok(dir) => config.output_dir = PathBuf::from(dir),
            Err(e) => {
                set_last_error(&format!("Invalid UTF-8: {e}"));
                return 2;
            }
        }
    }
    let pipeline = match Pipeline::with_pdf_renderer(config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };
    write_string(out_json, pipeline.handle_json(json))
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `mforge_render_pdf`.
///
/// # Safety
/// `buf` must have been returned by a previous `mforge_render_pdf` call, and
/// `len` must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn mforge_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a JSON string returned by an `mforge_*` function.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn mforge_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next failing `mforge_*` call on
/// the same thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn mforge_last_error() -> *const c_char {
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
pub extern "C" fn mforge_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn last_error() -> String {
        let p = mforge_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string()
    }

    #[test]
    fn ffi_render_pdf() {
        let json = br#"{"content":"Hello FFI 12"}"#;
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;

        let rc = unsafe {
            mforge_render_pdf(json.as_ptr(), json.len() as u32, &mut out_buf, &mut out_len)
        };

        assert_eq!(rc, 0, "Expected success");
        assert!(!out_buf.is_null());
        let bytes = unsafe { slice::from_raw_parts(out_buf, out_len as usize) };
        assert_eq!(&bytes[0..5], b"%PDF-");
        unsafe { mforge_free_buffer(out_buf, out_len) };
    }

    #[test]
    fn ffi_compute_layout() {
        let json = r#"{"content":"今日は5月3日です。","orientation":"landscape"}"#;
        let mut json_ptr: *mut c_char = ptr::null_mut();

        let rc = unsafe { mforge_compute_layout(json.as_ptr(), json.len() as u32, &mut json_ptr) };

        assert_eq!(rc, 0);
        let out = unsafe { CStr::from_ptr(json_ptr) }.to_str().unwrap();
        assert!(out.contains(r#""estimatedPages": 1"#));
        assert!(out.contains(r#""pageWidthMm": 297.0"#));
        assert!(out.contains(r#""kind": "combined""#));
        unsafe { mforge_free_string(json_ptr) };
    }

    #[test]
    fn ffi_validation_error() {
        let json = br#"{"content":"x","columns":5}"#;
        let mut json_ptr: *mut c_char = ptr::null_mut();
        let rc = unsafe { mforge_compute_layout(json.as_ptr(), json.len() as u32, &mut json_ptr) };
        assert_eq!(rc, 3);
        assert!(last_error().contains("columns"));
    }

    #[test]
    fn ffi_null_input() {
        let mut out_buf: *mut u8 = ptr::null_mut();
        let mut out_len: u32 = 0;
        let rc = unsafe { mforge_render_pdf(ptr::null(), 0, &mut out_buf, &mut out_len) };
        assert_eq!(rc, 1);
    }

    #[test]
    fn ffi_generate_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dir_c = CString::new(dir.path().to_str().unwrap()).unwrap();
        let json = r#"{"settings":{"content":"本文"},"outputFilename":"ffi.pdf"}"#.as_bytes();
        let mut json_ptr: *mut c_char = ptr::null_mut();

        let rc = unsafe {
            mforge_generate(json.as_ptr(), json.len() as u32, dir_c.as_ptr(), &mut json_ptr)
        };

        assert_eq!(rc, 0);
        let out = unsafe { CStr::from_ptr(json_ptr) }.to_str().unwrap();
        assert!(out.contains(r#""success":true"#), "{out}");
        assert!(dir.path().join("ffi.pdf").exists());
        unsafe { mforge_free_string(json_ptr) };
    }

    #[test]
    fn ffi_version() {
        let version = unsafe { CStr::from_ptr(mforge_version()) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
