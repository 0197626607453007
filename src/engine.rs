//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Execution trigger: submits a plan to an engine and owns the result handle.

use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::ffi;
use crate::frame::Frame;
use crate::wire;

// ---------------------------------------------------------------------------
// Public API types
// ---------------------------------------------------------------------------

/// Failure class reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Plan,
    Column,
    Type,
    Schema,
    Io,
    Sql,
    Oom,
    Handle,
    Internal,
}

impl EngineErrorKind {
    pub fn from_code(code: ffi::sl_status_t) -> Self {
        match code {
            ffi::SL_ERR_PLAN => EngineErrorKind::Plan,
            ffi::SL_ERR_COLUMN => EngineErrorKind::Column,
            ffi::SL_ERR_TYPE => EngineErrorKind::Type,
            ffi::SL_ERR_SCHEMA => EngineErrorKind::Schema,
            ffi::SL_ERR_IO => EngineErrorKind::Io,
            ffi::SL_ERR_SQL => EngineErrorKind::Sql,
            ffi::SL_ERR_OOM => EngineErrorKind::Oom,
            ffi::SL_ERR_HANDLE => EngineErrorKind::Handle,
            _ => EngineErrorKind::Internal,
        }
    }

    pub fn code(self) -> ffi::sl_status_t {
        match self {
            EngineErrorKind::Plan => ffi::SL_ERR_PLAN,
            EngineErrorKind::Column => ffi::SL_ERR_COLUMN,
            EngineErrorKind::Type => ffi::SL_ERR_TYPE,
            EngineErrorKind::Schema => ffi::SL_ERR_SCHEMA,
            EngineErrorKind::Io => ffi::SL_ERR_IO,
            EngineErrorKind::Sql => ffi::SL_ERR_SQL,
            EngineErrorKind::Oom => ffi::SL_ERR_OOM,
            EngineErrorKind::Handle => ffi::SL_ERR_HANDLE,
            EngineErrorKind::Internal => ffi::SL_ERR_INTERNAL,
        }
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineErrorKind::Plan => "invalid plan",
            EngineErrorKind::Column => "column not found",
            EngineErrorKind::Type => "type error",
            EngineErrorKind::Schema => "schema error",
            EngineErrorKind::Io => "I/O error",
            EngineErrorKind::Sql => "SQL error",
            EngineErrorKind::Oom => "out of memory",
            EngineErrorKind::Handle => "invalid result handle",
            EngineErrorKind::Internal => "internal engine error",
        };
        f.write_str(s)
    }
}

/// Errors from plan construction (deferred until collect) or from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    EmptyRecords,
    EmptyFirstRecord,
    EmptyColumns,
    LengthMismatch { expected: usize, found: usize },
    KeyMismatch { left: usize, right: usize },
    InvalidInput(String),
    Engine { kind: EngineErrorKind, message: String },
    NullHandle,
}

impl Error {
    fn from_status(status: ffi::sl_status_t, err: &ffi::sl_error_t) -> Self {
        Error::Engine {
            kind: EngineErrorKind::from_code(status),
            message: err.message(),
        }
    }

    /// Engine failure class, if this error came from the engine.
    pub fn engine_kind(&self) -> Option<EngineErrorKind> {
        match self {
            Error::Engine { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyRecords => f.write_str("from_records: records cannot be empty"),
            Error::EmptyFirstRecord => f.write_str("from_records: first record is empty"),
            Error::EmptyColumns => f.write_str("from_columns: columns cannot be empty"),
            Error::LengthMismatch { expected, found } => write!(
                f,
                "from_columns: all columns must have same length (got {expected} and {found})"
            ),
            Error::KeyMismatch { left, right } => write!(
                f,
                "join: left_on has {left} keys but right_on has {right}"
            ),
            Error::InvalidInput(msg) => f.write_str(msg),
            Error::Engine { kind, message } if message.is_empty() => write!(f, "{kind}"),
            Error::Engine { kind, message } => write!(f, "{kind}: {message}"),
            Error::NullHandle => f.write_str("result handle is null or already released"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

fn check(status: ffi::sl_status_t, err: &ffi::sl_error_t) -> Result<()> {
    if status == ffi::SL_OK {
        Ok(())
    } else {
        Err(Error::from_status(status, err))
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct EngineGuard {
    vtable: ffi::sl_engine_t,
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        // Runs after the last Engine and Collected are gone, so no handle
        // can outlive the context.
        if let Some(destroy) = self.vtable.destroy {
            unsafe { destroy(self.vtable.ctx) }
        }
    }
}

/// An execution engine reached through its C vtable.
///
/// Cloning shares the engine context. Every [`Collected`] keeps it alive too;
/// `destroy` runs once the last of them is dropped. `Rc` keeps both types
/// `!Send + !Sync`.
#[derive(Clone)]
pub struct Engine {
    guard: Rc<EngineGuard>,
}

impl Engine {
    /// Wrap an engine vtable.
    ///
    /// # Safety
    /// Every function pointer in `vtable` must be callable with `vtable.ctx`
    /// until `destroy` (if any) has been called, and must honor the contracts
    /// documented in [`ffi`].
    pub unsafe fn from_raw(vtable: ffi::sl_engine_t) -> Self {
        Engine {
            guard: Rc::new(EngineGuard { vtable }),
        }
    }

    /// Submit `frame`'s plan once and return the materialized result.
    ///
    /// A frame carrying a deferred error fails without reaching the engine.
    /// The frame is never modified, so it can be inspected or resubmitted
    /// after a failure.
    pub fn collect(&self, frame: &Frame) -> Result<Collected> {
        let ops = frame.operations()?;
        let start = Instant::now();
        debug!(n_ops = ops.len(), "collect: submitting plan");

        let vt = &self.guard.vtable;
        let mut handle = ffi::SL_NULL_HANDLE;
        let mut err = ffi::sl_error_t::zeroed();
        let status = {
            let encoded = wire::encode(ops);
            // SAFETY: `encoded` (and the operations it borrows) outlives the
            // call; `from_raw` guarantees the vtable is valid.
            unsafe { (vt.collect)(vt.ctx, encoded.as_raw(), &mut handle, &mut err) }
        };

        if status != ffi::SL_OK {
            if handle != ffi::SL_NULL_HANDLE {
                warn!(handle, status, "collect: engine failed but returned a handle, releasing");
                // SAFETY: handle came from this engine and is released once.
                unsafe { (vt.release)(vt.ctx, handle) };
            }
            let e = Error::from_status(status, &err);
            debug!(
                error = %e,
                elapsed_us = start.elapsed().as_micros() as u64,
                "collect: failed"
            );
            return Err(e);
        }
        if handle == ffi::SL_NULL_HANDLE {
            return Err(Error::NullHandle);
        }

        debug!(
            handle,
            elapsed_us = start.elapsed().as_micros() as u64,
            "collect: done"
        );
        Ok(Collected {
            handle,
            engine: self.guard.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Collected — RAII result handle
// ---------------------------------------------------------------------------

/// A materialized result held by the engine. Released exactly once, either
/// by [`Collected::release`] or on drop.
pub struct Collected {
    handle: ffi::sl_handle_t,
    engine: Rc<EngineGuard>,
}

impl Collected {
    /// Raw handle, `SL_NULL_HANDLE` once released.
    pub fn as_raw(&self) -> ffi::sl_handle_t {
        self.handle
    }

    pub fn is_released(&self) -> bool {
        self.handle == ffi::SL_NULL_HANDLE
    }

    fn live(&self) -> Result<ffi::sl_handle_t> {
        if self.is_released() {
            Err(Error::NullHandle)
        } else {
            Ok(self.handle)
        }
    }

    fn dim(&self, f: ffi::sl_dim_fn) -> Result<u64> {
        let handle = self.live()?;
        let vt = &self.engine.vtable;
        let mut out = 0u64;
        let mut err = ffi::sl_error_t::zeroed();
        // SAFETY: live handle owned by this engine.
        let status = unsafe { f(vt.ctx, handle, &mut out, &mut err) };
        check(status, &err)?;
        Ok(out)
    }

    /// Number of rows.
    pub fn height(&self) -> Result<u64> {
        self.dim(self.engine.vtable.height)
    }

    /// Number of columns.
    pub fn width(&self) -> Result<u64> {
        self.dim(self.engine.vtable.width)
    }

    /// `(height, width)`
    pub fn shape(&self) -> Result<(u64, u64)> {
        Ok((self.height()?, self.width()?))
    }

    /// Textual table as produced by the engine's renderer.
    pub fn render(&self) -> Result<String> {
        let handle = self.live()?;
        let vt = &self.engine.vtable;
        let mut out = ffi::sl_str_t::empty();
        let mut err = ffi::sl_error_t::zeroed();
        // SAFETY: live handle owned by this engine.
        let status = unsafe { (vt.render)(vt.ctx, handle, &mut out, &mut err) };
        check(status, &err)?;
        if out.len == 0 {
            return Ok(String::new());
        }
        if out.ptr.is_null() {
            return Err(Error::Engine {
                kind: EngineErrorKind::Internal,
                message: "render returned a null buffer".to_owned(),
            });
        }
        // SAFETY: the engine keeps the buffer valid until the next render or
        // release of this handle; it is copied out immediately.
        let bytes = unsafe { std::slice::from_raw_parts(out.ptr as *const u8, out.len) };
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Release the engine-side result. Later calls are no-ops.
    pub fn release(&mut self) {
        if self.is_released() {
            return;
        }
        let vt = &self.engine.vtable;
        // SAFETY: live handle, nulled right after so it is released once.
        unsafe { (vt.release)(vt.ctx, self.handle) };
        self.handle = ffi::SL_NULL_HANDLE;
    }
}

impl fmt::Display for Collected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(text) => f.write_str(&text),
            Err(e) => write!(f, "<unrenderable result: {e}>"),
        }
    }
}

impl fmt::Debug for Collected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collected")
            .field("handle", &self.handle)
            .finish()
    }
}

impl Drop for Collected {
    fn drop(&mut self) {
        self.release();
    }
}
