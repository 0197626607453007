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

//! Plan marshalling across the C ABI.
//!
//! [`encode`] lowers a list of operations into `ffi` records. Every array it
//! builds is pinned inside the returned [`EncodedPlan`]; strings are borrowed
//! from the source operations, which the plan's lifetime keeps alive.
//! [`decode_plan`] is the inverse, for engines implemented in Rust.

use std::any::Any;
use std::marker::PhantomData;
use std::os::raw::c_void;

use tracing::trace;

use crate::engine::{Error, Result};
use crate::expr::{AggOp, BinaryOp, Expr, Selector, StrOp, UnaryOp};
use crate::ffi;
use crate::frame::{Column, CsvOptions, Operation, SortField, SortOrder};
use crate::join::{JoinSpec, JoinType};
use crate::value::{DataType, Value};
use crate::window::{OffsetFunc, WindowSpec};

// ---------------------------------------------------------------------------
// EncodedPlan
// ---------------------------------------------------------------------------

/// A plan in wire form, valid while `'a` (the source operations) lives.
pub struct EncodedPlan<'a> {
    plan: Box<ffi::sl_plan_t>,
    // SAFETY: every pointer inside `plan` targets either a string owned by the
    // borrowed operations or the heap buffer of a Vec/Box held here. Moving a
    // Vec or Box into `pinned` moves only its handle, never its heap buffer,
    // so the addresses handed to the engine stay valid until this is dropped.
    pinned: Vec<Box<dyn Any>>,
    _ops: PhantomData<&'a [Operation]>,
}

impl EncodedPlan<'_> {
    /// Raw pointer access.
    pub fn as_raw(&self) -> *const ffi::sl_plan_t {
        &*self.plan
    }

    /// Number of pinned arrays and nodes backing the plan.
    pub fn pinned_buffers(&self) -> usize {
        self.pinned.len()
    }

    pub fn n_ops(&self) -> usize {
        self.plan.n_ops
    }
}

/// Lower `ops` into wire form. Encoding cannot fail: every operation that
/// reached a frame has a wire representation.
pub fn encode(ops: &[Operation]) -> EncodedPlan<'_> {
    let mut enc = Encoder { pinned: Vec::new() };
    let plan = enc.ops(ops);
    trace!(
        n_ops = ops.len(),
        pinned = enc.pinned.len(),
        "encoded plan"
    );
    EncodedPlan {
        plan: Box::new(plan),
        pinned: enc.pinned,
        _ops: PhantomData,
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

struct Encoder {
    pinned: Vec<Box<dyn Any>>,
}

fn s(text: &str) -> ffi::sl_str_t {
    ffi::sl_str_t::borrowed(text)
}

impl Encoder {
    fn pin_vec<T: 'static>(&mut self, v: Vec<T>) -> (*const T, usize) {
        if v.is_empty() {
            return (std::ptr::null(), 0);
        }
        let ptr = v.as_ptr();
        let len = v.len();
        self.pinned.push(Box::new(v));
        (ptr, len)
    }

    fn pin<T: 'static>(&mut self, v: T) -> *const T {
        let b = Box::new(v);
        let ptr: *const T = &*b;
        self.pinned.push(b);
        ptr
    }

    fn pin_args<T: 'static>(&mut self, v: T) -> *const c_void {
        self.pin(v) as *const c_void
    }

    fn names(&mut self, names: &[String]) -> (*const ffi::sl_str_t, usize) {
        let v: Vec<ffi::sl_str_t> = names.iter().map(|n| s(n)).collect();
        self.pin_vec(v)
    }

    fn ops(&mut self, ops: &[Operation]) -> ffi::sl_plan_t {
        let v: Vec<ffi::sl_op_t> = ops.iter().map(|op| self.op(op)).collect();
        let (ptr, n) = self.pin_vec(v);
        ffi::sl_plan_t { ops: ptr, n_ops: n }
    }

    fn op(&mut self, op: &Operation) -> ffi::sl_op_t {
        let (opcode, args) = match op {
            Operation::ReadCsv { path, options } => {
                let dtypes = options
                    .dtypes
                    .as_ref()
                    .map(|d| d.iter().map(|t| t.code()).collect::<Vec<u8>>())
                    .unwrap_or_default();
                let (dtypes, n_dtypes) = self.pin_vec(dtypes);
                let args = ffi::sl_read_csv_args_t {
                    path: s(path),
                    delimiter: options.delimiter,
                    has_header: options.has_header,
                    dtypes,
                    n_dtypes,
                };
                (ffi::OP_READ_CSV, self.pin_args(args))
            }
            Operation::FromMemory(columns) => {
                let cols: Vec<ffi::sl_column_t> = columns.iter().map(|c| self.column(c)).collect();
                let (columns, n_columns) = self.pin_vec(cols);
                let args = ffi::sl_from_memory_args_t { columns, n_columns };
                (ffi::OP_FROM_MEMORY, self.pin_args(args))
            }
            Operation::Query(text) => {
                let args = ffi::sl_query_args_t { sql: s(text) };
                (ffi::OP_QUERY, self.pin_args(args))
            }
            Operation::Select(items) => (ffi::OP_SELECT, self.entries_args(items)),
            Operation::WithColumns(items) => (ffi::OP_WITH_COLUMNS, self.entries_args(items)),
            Operation::Filter(pred) => {
                (ffi::OP_FILTER, self.entries_args(std::slice::from_ref(pred)))
            }
            Operation::GroupBy { keys, aggs } => {
                let (keys, n_keys) = self.entries(keys);
                let (aggs, n_aggs) = self.entries(aggs);
                let args = ffi::sl_group_by_args_t {
                    keys,
                    n_keys,
                    aggs,
                    n_aggs,
                };
                (ffi::OP_GROUP_BY, self.pin_args(args))
            }
            Operation::Sort(fields) => {
                let v: Vec<ffi::sl_sort_field_t> = fields
                    .iter()
                    .map(|f| ffi::sl_sort_field_t {
                        column: s(&f.column),
                        descending: f.is_descending(),
                    })
                    .collect();
                let (fields, n_fields) = self.pin_vec(v);
                let args = ffi::sl_sort_args_t { fields, n_fields };
                (ffi::OP_SORT, self.pin_args(args))
            }
            Operation::Limit(n) => (ffi::OP_LIMIT, self.pin_args(ffi::sl_limit_args_t { n: *n })),
            Operation::Count => (ffi::OP_COUNT, std::ptr::null()),
            Operation::Join { other, spec } => {
                let other = self.ops(other);
                let (left_on, n_keys) = self.names(&spec.left_on);
                let (right_on, _) = self.names(&spec.right_on);
                let args = ffi::sl_join_args_t {
                    other,
                    left_on,
                    right_on,
                    n_keys,
                    join_type: spec.how.code(),
                    suffix: s(&spec.suffix),
                    coalesce: spec.coalesce,
                };
                (ffi::OP_JOIN, self.pin_args(args))
            }
            Operation::Concat(other) => {
                let other = self.ops(other);
                (ffi::OP_CONCAT, self.pin_args(ffi::sl_concat_args_t { other }))
            }
        };
        ffi::sl_op_t { opcode, args }
    }

    fn column(&mut self, column: &Column) -> ffi::sl_column_t {
        let v: Vec<ffi::sl_value_t> = column.values.iter().map(value).collect();
        let (values, len) = self.pin_vec(v);
        ffi::sl_column_t {
            name: s(&column.name),
            values,
            len,
        }
    }

    fn entries_args(&mut self, items: &[Selector]) -> *const c_void {
        let (entries, n_entries) = self.entries(items);
        self.pin_args(ffi::sl_entries_args_t { entries, n_entries })
    }

    fn entries(&mut self, items: &[Selector]) -> (*const ffi::sl_entry_t, usize) {
        let v: Vec<ffi::sl_entry_t> = items.iter().map(|item| self.entry(item)).collect();
        self.pin_vec(v)
    }

    fn entry(&mut self, item: &Selector) -> ffi::sl_entry_t {
        let mut e = ffi::sl_entry_t {
            tag: item.tag(),
            text: ffi::sl_str_t::empty(),
            expr: std::ptr::null(),
        };
        match item {
            Selector::Name(text) | Selector::Raw(text) => e.text = s(text),
            Selector::Expr(expr) => {
                let node = self.expr(expr);
                e.expr = self.pin(node);
            }
        }
        e
    }

    fn expr(&mut self, expr: &Expr) -> ffi::sl_expr_t {
        let mut node = match expr {
            Expr::Column(name) => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_COLUMN);
                n.name = s(name);
                n
            }
            Expr::Literal(v) => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_LITERAL);
                n.value = value(v);
                n
            }
            Expr::Unary { op, .. } => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_UNARY);
                n.op = op.code();
                n
            }
            Expr::Binary { op, .. } => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_BINARY);
                n.op = op.code();
                n
            }
            Expr::Cast { to, .. } => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_CAST);
                n.op = to.code();
                n
            }
            Expr::Str { op, .. } => str_node(op),
            Expr::Agg { op, .. } => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_AGG);
                n.op = op.code();
                n
            }
            Expr::Offset { func, .. } => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_OFFSET);
                n.op = func.kind_code();
                n.n = func.param();
                n
            }
            Expr::Window { spec, .. } => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_WINDOW);
                (n.partition_by, n.n_partition_by) = self.names(&spec.partition_by);
                (n.order_by, n.n_order_by) = self.names(&spec.order_by);
                n
            }
            Expr::Alias { name, .. } => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_ALIAS);
                n.name = s(name);
                n
            }
            Expr::Raw(text) => {
                let mut n = ffi::sl_expr_t::new(ffi::EXPR_RAW);
                n.name = s(text);
                n
            }
        };
        let children: Vec<ffi::sl_expr_t> =
            expr.children().into_iter().map(|c| self.expr(c)).collect();
        (node.children, node.n_children) = self.pin_vec(children);
        node
    }
}

fn value(v: &Value) -> ffi::sl_value_t {
    let mut out = ffi::sl_value_t::null();
    out.tag = v.tag();
    match v {
        Value::Int(i) => out.int_value = *i,
        Value::Float(f) => out.float_value = *f,
        Value::Str(text) => out.str_value = s(text),
        Value::Bool(b) => out.bool_value = *b,
        Value::Null => {}
    }
    out
}

fn str_node(op: &StrOp) -> ffi::sl_expr_t {
    let mut n = ffi::sl_expr_t::new(ffi::EXPR_STR);
    n.op = op.code();
    match op {
        StrOp::Len | StrOp::LenBytes | StrOp::Upper | StrOp::Lower | StrOp::Reverse => {}
        StrOp::Contains(text)
        | StrOp::Split(text)
        | StrOp::StripPrefix(text)
        | StrOp::StripSuffix(text)
        | StrOp::StripChars(text)
        | StrOp::StripCharsStart(text)
        | StrOp::StripCharsEnd(text) => n.name = s(text),
        StrOp::Slice { offset, length } => {
            n.n = *offset;
            n.flag = length.is_some();
            n.m = length.map_or(0, i64::from);
        }
        StrOp::Replace {
            pattern,
            value,
            literal,
        } => {
            n.name = s(pattern);
            n.arg = s(value);
            n.flag = *literal;
        }
        StrOp::Head(k) | StrOp::Tail(k) => n.n = *k,
        StrOp::PadStart { width, fill } | StrOp::PadEnd { width, fill } => {
            n.n = i64::from(*width);
            n.fill = u32::from(*fill);
        }
        StrOp::Zfill(width) => n.n = i64::from(*width),
    }
    n
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn malformed(what: impl std::fmt::Display) -> Error {
    Error::InvalidInput(format!("malformed plan: {what}"))
}

/// # Safety
/// `ptr` must be null with `len == 0`, or point to `len` initialized `T`s
/// that outlive `'b`.
unsafe fn slice<'b, T>(ptr: *const T, len: usize) -> Result<&'b [T]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(malformed("null array with non-zero length"));
    }
    // SAFETY: non-null, caller guarantees `len` valid elements.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// # Safety
/// `s` must describe `len` readable bytes (or be empty).
unsafe fn string(s: ffi::sl_str_t) -> Result<String> {
    // SAFETY: forwarded from the caller.
    let bytes = unsafe { slice(s.ptr as *const u8, s.len)? };
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| malformed("string is not valid UTF-8"))
}

unsafe fn strings(ptr: *const ffi::sl_str_t, len: usize) -> Result<Vec<String>> {
    // SAFETY: forwarded from the caller.
    unsafe { slice(ptr, len)? }
        .iter()
        .map(|x| unsafe { string(*x) })
        .collect()
}

unsafe fn args<'b, T>(op: &ffi::sl_op_t) -> Result<&'b T> {
    if op.args.is_null() {
        return Err(malformed(format_args!("opcode {} without arguments", op.opcode)));
    }
    // SAFETY: the opcode selects the argument struct type.
    Ok(unsafe { &*(op.args as *const T) })
}

/// Rebuild operations from a wire plan.
///
/// # Safety
/// `plan` must point to a plan produced by [`encode`] (or laid out the same
/// way) whose buffers are alive for the duration of the call.
pub unsafe fn decode_plan(plan: *const ffi::sl_plan_t) -> Result<Vec<Operation>> {
    if plan.is_null() {
        return Err(malformed("null plan"));
    }
    // SAFETY: non-null, caller guarantees validity.
    unsafe { decode_ops(&*plan) }
}

unsafe fn decode_ops(plan: &ffi::sl_plan_t) -> Result<Vec<Operation>> {
    // SAFETY: forwarded from the caller.
    unsafe { slice(plan.ops, plan.n_ops)? }
        .iter()
        .map(|op| unsafe { decode_op(op) })
        .collect()
}

unsafe fn decode_op(op: &ffi::sl_op_t) -> Result<Operation> {
    // SAFETY: all reads below follow pointers laid out by the encoder; the
    // caller of `decode_plan` guarantees they are live.
    unsafe {
        Ok(match op.opcode {
            ffi::OP_READ_CSV => {
                let a = args::<ffi::sl_read_csv_args_t>(op)?;
                let dtypes = if a.n_dtypes == 0 {
                    None
                } else {
                    let codes = slice(a.dtypes, a.n_dtypes)?;
                    Some(
                        codes
                            .iter()
                            .map(|&c| {
                                DataType::from_code(c)
                                    .ok_or_else(|| malformed(format_args!("dtype code {c}")))
                            })
                            .collect::<Result<Vec<_>>>()?,
                    )
                };
                Operation::ReadCsv {
                    path: string(a.path)?,
                    options: CsvOptions {
                        delimiter: a.delimiter,
                        has_header: a.has_header,
                        dtypes,
                    },
                }
            }
            ffi::OP_FROM_MEMORY => {
                let a = args::<ffi::sl_from_memory_args_t>(op)?;
                let columns = slice(a.columns, a.n_columns)?
                    .iter()
                    .map(|c| {
                        let values = slice(c.values, c.len)?
                            .iter()
                            .map(|v| decode_value(v))
                            .collect::<Result<Vec<_>>>()?;
                        Ok(Column::new(string(c.name)?, values))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Operation::FromMemory(columns)
            }
            ffi::OP_QUERY => Operation::Query(string(args::<ffi::sl_query_args_t>(op)?.sql)?),
            ffi::OP_SELECT => Operation::Select(decode_entries_args(op)?),
            ffi::OP_WITH_COLUMNS => Operation::WithColumns(decode_entries_args(op)?),
            ffi::OP_FILTER => {
                let mut entries = decode_entries_args(op)?;
                if entries.len() != 1 {
                    return Err(malformed(format_args!(
                        "filter takes one predicate, got {}",
                        entries.len()
                    )));
                }
                Operation::Filter(entries.remove(0))
            }
            ffi::OP_GROUP_BY => {
                let a = args::<ffi::sl_group_by_args_t>(op)?;
                Operation::GroupBy {
                    keys: decode_entries(a.keys, a.n_keys)?,
                    aggs: decode_entries(a.aggs, a.n_aggs)?,
                }
            }
            ffi::OP_SORT => {
                let a = args::<ffi::sl_sort_args_t>(op)?;
                let fields = slice(a.fields, a.n_fields)?
                    .iter()
                    .map(|f| {
                        Ok(SortField {
                            column: string(f.column)?,
                            order: if f.descending {
                                SortOrder::Descending
                            } else {
                                SortOrder::Ascending
                            },
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Operation::Sort(fields)
            }
            ffi::OP_LIMIT => Operation::Limit(args::<ffi::sl_limit_args_t>(op)?.n),
            ffi::OP_COUNT => Operation::Count,
            ffi::OP_JOIN => {
                let a = args::<ffi::sl_join_args_t>(op)?;
                let how = JoinType::from_code(a.join_type)
                    .ok_or_else(|| malformed(format_args!("join type {}", a.join_type)))?;
                Operation::Join {
                    other: decode_ops(&a.other)?,
                    spec: JoinSpec {
                        left_on: strings(a.left_on, a.n_keys)?,
                        right_on: strings(a.right_on, a.n_keys)?,
                        how,
                        suffix: string(a.suffix)?,
                        coalesce: a.coalesce,
                    },
                }
            }
            ffi::OP_CONCAT => {
                Operation::Concat(decode_ops(&args::<ffi::sl_concat_args_t>(op)?.other)?)
            }
            other => return Err(malformed(format_args!("unknown opcode {other}"))),
        })
    }
}

unsafe fn decode_entries_args(op: &ffi::sl_op_t) -> Result<Vec<Selector>> {
    // SAFETY: forwarded from the caller.
    unsafe {
        let a = args::<ffi::sl_entries_args_t>(op)?;
        decode_entries(a.entries, a.n_entries)
    }
}

unsafe fn decode_entries(ptr: *const ffi::sl_entry_t, len: usize) -> Result<Vec<Selector>> {
    // SAFETY: forwarded from the caller.
    unsafe { slice(ptr, len)? }
        .iter()
        .map(|e| unsafe {
            match e.tag {
                ffi::ENTRY_NAME => Ok(Selector::Name(string(e.text)?)),
                ffi::ENTRY_RAW => Ok(Selector::Raw(string(e.text)?)),
                ffi::ENTRY_EXPR if !e.expr.is_null() => Ok(Selector::Expr(decode_expr(&*e.expr)?)),
                ffi::ENTRY_EXPR => Err(malformed("expression entry without a node")),
                tag => Err(malformed(format_args!("entry tag {tag}"))),
            }
        })
        .collect()
}

unsafe fn decode_value(v: &ffi::sl_value_t) -> Result<Value> {
    Ok(match v.tag {
        ffi::SL_VALUE_INT => Value::Int(v.int_value),
        ffi::SL_VALUE_FLOAT => Value::Float(v.float_value),
        // SAFETY: forwarded from the caller.
        ffi::SL_VALUE_STR => Value::Str(unsafe { string(v.str_value)? }),
        ffi::SL_VALUE_BOOL => Value::Bool(v.bool_value),
        ffi::SL_VALUE_NULL => Value::Null,
        tag => return Err(malformed(format_args!("value tag {tag}"))),
    })
}

unsafe fn decode_expr(node: &ffi::sl_expr_t) -> Result<Expr> {
    // SAFETY: forwarded from the caller.
    unsafe {
        let mut children = slice(node.children, node.n_children)?
            .iter()
            .map(|c| decode_expr(c))
            .collect::<Result<Vec<_>>>()?
            .into_iter();
        let mut child = || {
            children
                .next()
                .map(Box::new)
                .ok_or_else(|| malformed(format_args!("expr kind {} missing operand", node.kind)))
        };
        let bad_op = || malformed(format_args!("expr kind {} op {}", node.kind, node.op));

        Ok(match node.kind {
            ffi::EXPR_COLUMN => Expr::Column(string(node.name)?),
            ffi::EXPR_LITERAL => Expr::Literal(decode_value(&node.value)?),
            ffi::EXPR_RAW => Expr::Raw(string(node.name)?),
            ffi::EXPR_UNARY => Expr::Unary {
                op: UnaryOp::from_code(node.op).ok_or_else(bad_op)?,
                expr: child()?,
            },
            ffi::EXPR_BINARY => Expr::Binary {
                op: BinaryOp::from_code(node.op).ok_or_else(bad_op)?,
                left: child()?,
                right: child()?,
            },
            ffi::EXPR_CAST => Expr::Cast {
                to: DataType::from_code(node.op).ok_or_else(bad_op)?,
                expr: child()?,
            },
            ffi::EXPR_STR => Expr::Str {
                op: decode_str_op(node)?,
                expr: child()?,
            },
            ffi::EXPR_AGG => Expr::Agg {
                op: AggOp::from_code(node.op).ok_or_else(bad_op)?,
                expr: child()?,
            },
            ffi::EXPR_OFFSET => Expr::Offset {
                func: OffsetFunc::from_code(node.op, node.n).ok_or_else(bad_op)?,
                expr: child()?,
            },
            ffi::EXPR_WINDOW => Expr::Window {
                expr: child()?,
                spec: WindowSpec {
                    partition_by: strings(node.partition_by, node.n_partition_by)?,
                    order_by: strings(node.order_by, node.n_order_by)?,
                },
            },
            ffi::EXPR_ALIAS => Expr::Alias {
                expr: child()?,
                name: string(node.name)?,
            },
            kind => return Err(malformed(format_args!("expr kind {kind}"))),
        })
    }
}

unsafe fn decode_str_op(node: &ffi::sl_expr_t) -> Result<StrOp> {
    let width = || {
        u32::try_from(node.n).map_err(|_| malformed(format_args!("width {} out of range", node.n)))
    };
    let fill = || {
        char::from_u32(node.fill).ok_or_else(|| malformed(format_args!("fill {}", node.fill)))
    };
    // SAFETY: forwarded from the caller.
    let text = || unsafe { string(node.name) };

    Ok(match node.op {
        ffi::STR_LEN => StrOp::Len,
        ffi::STR_LEN_BYTES => StrOp::LenBytes,
        ffi::STR_UPPER => StrOp::Upper,
        ffi::STR_LOWER => StrOp::Lower,
        ffi::STR_REVERSE => StrOp::Reverse,
        ffi::STR_CONTAINS => StrOp::Contains(text()?),
        ffi::STR_SPLIT => StrOp::Split(text()?),
        ffi::STR_STRIP_PREFIX => StrOp::StripPrefix(text()?),
        ffi::STR_STRIP_SUFFIX => StrOp::StripSuffix(text()?),
        ffi::STR_STRIP_CHARS => StrOp::StripChars(text()?),
        ffi::STR_STRIP_CHARS_START => StrOp::StripCharsStart(text()?),
        ffi::STR_STRIP_CHARS_END => StrOp::StripCharsEnd(text()?),
        ffi::STR_SLICE => StrOp::Slice {
            offset: node.n,
            length: if node.flag {
                Some(u32::try_from(node.m).map_err(|_| {
                    malformed(format_args!("slice length {} out of range", node.m))
                })?)
            } else {
                None
            },
        },
        ffi::STR_REPLACE => StrOp::Replace {
            pattern: text()?,
            // SAFETY: forwarded from the caller.
            value: unsafe { string(node.arg)? },
            literal: node.flag,
        },
        ffi::STR_HEAD => StrOp::Head(node.n),
        ffi::STR_TAIL => StrOp::Tail(node.n),
        ffi::STR_PAD_START => StrOp::PadStart {
            width: width()?,
            fill: fill()?,
        },
        ffi::STR_PAD_END => StrOp::PadEnd {
            width: width()?,
            fill: fill()?,
        },
        ffi::STR_ZFILL => StrOp::Zfill(width()?),
        op => return Err(malformed(format_args!("string op {op}"))),
    })
}
