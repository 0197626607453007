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

// Raw C ABI shared with execution engines.
// Mirrors include/sluice/sl.h: every struct here is read by the engine while
// a plan is being collected and must keep its exact layout.
#![allow(non_camel_case_types, non_upper_case_globals)]

use std::os::raw::{c_char, c_double, c_void};

// ===== Value Tags =====

pub const SL_VALUE_INT: u8 = 0;
pub const SL_VALUE_FLOAT: u8 = 1;
pub const SL_VALUE_STR: u8 = 2;
pub const SL_VALUE_BOOL: u8 = 3;
pub const SL_VALUE_NULL: u8 = 4;

// ===== Data Types (cast targets, CSV overrides) =====

pub const SL_DTYPE_INT64: u8 = 0;
pub const SL_DTYPE_FLOAT64: u8 = 1;
pub const SL_DTYPE_UTF8: u8 = 2;
pub const SL_DTYPE_BOOL: u8 = 3;

// ===== Opcode Constants =====

// Sources
pub const OP_READ_CSV: u16 = 1;
pub const OP_FROM_MEMORY: u16 = 2;
pub const OP_QUERY: u16 = 3;

// Row-set transforms
pub const OP_SELECT: u16 = 10;
pub const OP_FILTER: u16 = 11;
pub const OP_WITH_COLUMNS: u16 = 12;
pub const OP_GROUP_BY: u16 = 13;
pub const OP_SORT: u16 = 14;
pub const OP_LIMIT: u16 = 15;
pub const OP_COUNT: u16 = 16;

// Multi-input
pub const OP_JOIN: u16 = 20;
pub const OP_CONCAT: u16 = 21;

// ===== Expression Node Kinds =====

pub const EXPR_COLUMN: u8 = 0;
pub const EXPR_LITERAL: u8 = 1;
pub const EXPR_UNARY: u8 = 2;
pub const EXPR_BINARY: u8 = 3;
pub const EXPR_CAST: u8 = 4;
pub const EXPR_STR: u8 = 5;
pub const EXPR_AGG: u8 = 6;
pub const EXPR_OFFSET: u8 = 7;
pub const EXPR_WINDOW: u8 = 8;
pub const EXPR_ALIAS: u8 = 9;
pub const EXPR_RAW: u8 = 10;

// Unary
pub const UNARY_NOT: u8 = 0;
pub const UNARY_NEG: u8 = 1;
pub const UNARY_IS_NULL: u8 = 2;
pub const UNARY_IS_NOT_NULL: u8 = 3;

// Binary
pub const BIN_ADD: u8 = 0;
pub const BIN_SUB: u8 = 1;
pub const BIN_MUL: u8 = 2;
pub const BIN_DIV: u8 = 3;
pub const BIN_MOD: u8 = 4;
pub const BIN_EQ: u8 = 5;
pub const BIN_NE: u8 = 6;
pub const BIN_GT: u8 = 7;
pub const BIN_GE: u8 = 8;
pub const BIN_LT: u8 = 9;
pub const BIN_LE: u8 = 10;
pub const BIN_AND: u8 = 11;
pub const BIN_OR: u8 = 12;

// String transforms
pub const STR_LEN: u8 = 0;
pub const STR_LEN_BYTES: u8 = 1;
pub const STR_UPPER: u8 = 2;
pub const STR_LOWER: u8 = 3;
pub const STR_CONTAINS: u8 = 4;
pub const STR_SLICE: u8 = 5;
pub const STR_REPLACE: u8 = 6;
pub const STR_SPLIT: u8 = 7;
pub const STR_REVERSE: u8 = 8;
pub const STR_HEAD: u8 = 9;
pub const STR_TAIL: u8 = 10;
pub const STR_PAD_START: u8 = 11;
pub const STR_PAD_END: u8 = 12;
pub const STR_ZFILL: u8 = 13;
pub const STR_STRIP_PREFIX: u8 = 14;
pub const STR_STRIP_SUFFIX: u8 = 15;
pub const STR_STRIP_CHARS: u8 = 16;
pub const STR_STRIP_CHARS_START: u8 = 17;
pub const STR_STRIP_CHARS_END: u8 = 18;

// Aggregates
pub const AGG_SUM: u8 = 0;
pub const AGG_MEAN: u8 = 1;
pub const AGG_MIN: u8 = 2;
pub const AGG_MAX: u8 = 3;
pub const AGG_COUNT: u8 = 4;
pub const AGG_FIRST: u8 = 5;
pub const AGG_LAST: u8 = 6;

// Offset functions
pub const OFFSET_LAG: u8 = 0;
pub const OFFSET_LEAD: u8 = 1;

// ===== Selector Entry Tags =====

pub const ENTRY_NAME: u8 = 0;
pub const ENTRY_EXPR: u8 = 1;
pub const ENTRY_RAW: u8 = 2;

// ===== Join Types =====

pub const JOIN_INNER: u8 = 0;
pub const JOIN_LEFT: u8 = 1;
pub const JOIN_OUTER: u8 = 2;
pub const JOIN_CROSS: u8 = 3;

// ===== Status Codes =====

pub type sl_status_t = i32;

pub const SL_OK: sl_status_t = 0;
pub const SL_ERR_PLAN: sl_status_t = 1;
pub const SL_ERR_COLUMN: sl_status_t = 2;
pub const SL_ERR_TYPE: sl_status_t = 3;
pub const SL_ERR_SCHEMA: sl_status_t = 4;
pub const SL_ERR_IO: sl_status_t = 5;
pub const SL_ERR_SQL: sl_status_t = 6;
pub const SL_ERR_OOM: sl_status_t = 7;
pub const SL_ERR_HANDLE: sl_status_t = 8;
pub const SL_ERR_INTERNAL: sl_status_t = 9;

// ===== Result Handles =====

pub type sl_handle_t = u64;

pub const SL_NULL_HANDLE: sl_handle_t = 0;

// ===== Strings =====

/// Borrowed UTF-8 bytes. Not NUL-terminated; `ptr` may be null when `len == 0`.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_str_t {
    pub ptr: *const c_char,
    pub len: usize,
}

impl sl_str_t {
    pub const fn empty() -> Self {
        sl_str_t {
            ptr: std::ptr::null(),
            len: 0,
        }
    }

    /// Borrow `s` for the lifetime of the owning buffer. The caller keeps `s`
    /// alive for as long as the engine may read it.
    pub fn borrowed(s: &str) -> Self {
        sl_str_t {
            ptr: s.as_ptr() as *const c_char,
            len: s.len(),
        }
    }
}

// ===== Scalar Cell =====

/// One typed cell. Only the field selected by `tag` is meaningful; the
/// others are zeroed.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_value_t {
    pub tag: u8,
    pub int_value: i64,
    pub float_value: c_double,
    pub str_value: sl_str_t,
    pub bool_value: bool,
}

impl sl_value_t {
    pub const fn null() -> Self {
        sl_value_t {
            tag: SL_VALUE_NULL,
            int_value: 0,
            float_value: 0.0,
            str_value: sl_str_t::empty(),
            bool_value: false,
        }
    }
}

// ===== In-memory Column =====

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_column_t {
    pub name: sl_str_t,
    pub values: *const sl_value_t,
    pub len: usize,
}

// ===== Expression Node =====

/// A node of an expression tree. Field usage per `kind`:
///
/// - `EXPR_COLUMN`: `name`
/// - `EXPR_LITERAL`: `value`
/// - `EXPR_UNARY` / `EXPR_BINARY` / `EXPR_AGG`: `op`, `children`
/// - `EXPR_CAST`: `op` holds an `SL_DTYPE_*`, `children[0]`
/// - `EXPR_STR`: `op`, `children[0]`, string args in `name`/`arg`,
///   integer args in `n`/`m`, pad fill in `fill`, literal flag in `flag`
/// - `EXPR_OFFSET`: `op` (lag/lead), `n` rows, `children[0]`
/// - `EXPR_WINDOW`: `children[0]`, `partition_by`, `order_by`
/// - `EXPR_ALIAS`: `name`, `children[0]`
/// - `EXPR_RAW`: `name` holds the fragment text
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_expr_t {
    pub kind: u8,
    pub op: u8,
    pub flag: bool,
    pub fill: u32,
    pub name: sl_str_t,
    pub arg: sl_str_t,
    pub value: sl_value_t,
    pub n: i64,
    pub m: i64,
    pub children: *const sl_expr_t,
    pub n_children: usize,
    pub partition_by: *const sl_str_t,
    pub n_partition_by: usize,
    pub order_by: *const sl_str_t,
    pub n_order_by: usize,
}

impl sl_expr_t {
    pub const fn new(kind: u8) -> Self {
        sl_expr_t {
            kind,
            op: 0,
            flag: false,
            fill: 0,
            name: sl_str_t::empty(),
            arg: sl_str_t::empty(),
            value: sl_value_t::null(),
            n: 0,
            m: 0,
            children: std::ptr::null(),
            n_children: 0,
            partition_by: std::ptr::null(),
            n_partition_by: 0,
            order_by: std::ptr::null(),
            n_order_by: 0,
        }
    }
}

// ===== Selector Entry =====

/// A select/with-columns/group/agg/filter entry. `text` is used by
/// `ENTRY_NAME` and `ENTRY_RAW`, `expr` by `ENTRY_EXPR`.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_entry_t {
    pub tag: u8,
    pub text: sl_str_t,
    pub expr: *const sl_expr_t,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_sort_field_t {
    pub column: sl_str_t,
    pub descending: bool,
}

// ===== Plan =====

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_plan_t {
    pub ops: *const sl_op_t,
    pub n_ops: usize,
}

/// One operation record. `args` points to the `sl_*_args_t` matching
/// `opcode`, or is null for `OP_COUNT`.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_op_t {
    pub opcode: u16,
    pub args: *const c_void,
}

// ===== Per-opcode Arguments =====

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_read_csv_args_t {
    pub path: sl_str_t,
    pub delimiter: u8,
    pub has_header: bool,
    pub dtypes: *const u8,
    pub n_dtypes: usize,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_from_memory_args_t {
    pub columns: *const sl_column_t,
    pub n_columns: usize,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_query_args_t {
    pub sql: sl_str_t,
}

/// Shared by `OP_SELECT`, `OP_WITH_COLUMNS` and `OP_FILTER` (one entry).
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_entries_args_t {
    pub entries: *const sl_entry_t,
    pub n_entries: usize,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_group_by_args_t {
    pub keys: *const sl_entry_t,
    pub n_keys: usize,
    pub aggs: *const sl_entry_t,
    pub n_aggs: usize,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_sort_args_t {
    pub fields: *const sl_sort_field_t,
    pub n_fields: usize,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_limit_args_t {
    pub n: u64,
}

/// `left_on` and `right_on` both hold `n_keys` names; both are empty for
/// `JOIN_CROSS`.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_join_args_t {
    pub other: sl_plan_t,
    pub left_on: *const sl_str_t,
    pub right_on: *const sl_str_t,
    pub n_keys: usize,
    pub join_type: u8,
    pub suffix: sl_str_t,
    pub coalesce: bool,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct sl_concat_args_t {
    pub other: sl_plan_t,
}

// ===== Errors =====

pub const SL_ERROR_MSG_CAP: usize = 512;

/// Caller-allocated error slot. The engine writes a NUL-terminated message.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct sl_error_t {
    pub code: sl_status_t,
    pub message: [c_char; SL_ERROR_MSG_CAP],
}

impl sl_error_t {
    pub const fn zeroed() -> Self {
        sl_error_t {
            code: SL_OK,
            message: [0; SL_ERROR_MSG_CAP],
        }
    }

    /// Fill the slot, truncating `msg` to fit (at a char boundary).
    pub fn set(&mut self, code: sl_status_t, msg: &str) {
        self.code = code;
        let mut end = msg.len().min(SL_ERROR_MSG_CAP - 1);
        while !msg.is_char_boundary(end) {
            end -= 1;
        }
        for (dst, src) in self.message.iter_mut().zip(msg.as_bytes()[..end].iter()) {
            *dst = *src as c_char;
        }
        self.message[end] = 0;
    }

    /// Message bytes up to the first NUL, lossily decoded.
    pub fn message(&self) -> String {
        let bytes: Vec<u8> = self
            .message
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

// ===== Engine VTable =====

pub type sl_collect_fn = unsafe extern "C" fn(
    ctx: *mut c_void,
    plan: *const sl_plan_t,
    out: *mut sl_handle_t,
    err: *mut sl_error_t,
) -> sl_status_t;

pub type sl_dim_fn = unsafe extern "C" fn(
    ctx: *mut c_void,
    handle: sl_handle_t,
    out: *mut u64,
    err: *mut sl_error_t,
) -> sl_status_t;

/// The rendered text stays valid until the handle is released or rendered again.
pub type sl_render_fn = unsafe extern "C" fn(
    ctx: *mut c_void,
    handle: sl_handle_t,
    out: *mut sl_str_t,
    err: *mut sl_error_t,
) -> sl_status_t;

pub type sl_release_fn = unsafe extern "C" fn(ctx: *mut c_void, handle: sl_handle_t);

pub type sl_destroy_fn = unsafe extern "C" fn(ctx: *mut c_void);

/// Entry points exported by an execution engine. `ctx` is passed back
/// verbatim to every call.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct sl_engine_t {
    pub ctx: *mut c_void,
    pub collect: sl_collect_fn,
    pub height: sl_dim_fn,
    pub width: sl_dim_fn,
    pub render: sl_render_fn,
    pub release: sl_release_fn,
    pub destroy: Option<sl_destroy_fn>,
}

// ===== Compile-time layout assertions =====

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(std::mem::size_of::<sl_str_t>() == 16);
    assert!(std::mem::size_of::<sl_value_t>() == 48);
    assert!(std::mem::size_of::<sl_column_t>() == 32);
    assert!(std::mem::size_of::<sl_entry_t>() == 32);
    assert!(std::mem::size_of::<sl_op_t>() == 16);
    assert!(std::mem::size_of::<sl_plan_t>() == 16);
};
