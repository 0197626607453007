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

//! Expression IR.
//!
//! `Expr` is a closed, immutable tree. Builder methods consume their receiver
//! and return a new node wrapping it; nothing here evaluates anything. Raw
//! fragments (`sql(..)`) are forwarded to the engine verbatim.

use std::fmt;

use crate::ffi;
use crate::join::KeyList;
use crate::value::{DataType, Value};
use crate::window::{OffsetFunc, WindowSpec};

// ---------------------------------------------------------------------------
// Operator kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

impl UnaryOp {
    pub fn code(self) -> u8 {
        match self {
            UnaryOp::Not => ffi::UNARY_NOT,
            UnaryOp::Neg => ffi::UNARY_NEG,
            UnaryOp::IsNull => ffi::UNARY_IS_NULL,
            UnaryOp::IsNotNull => ffi::UNARY_IS_NOT_NULL,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            ffi::UNARY_NOT => Some(UnaryOp::Not),
            ffi::UNARY_NEG => Some(UnaryOp::Neg),
            ffi::UNARY_IS_NULL => Some(UnaryOp::IsNull),
            ffi::UNARY_IS_NOT_NULL => Some(UnaryOp::IsNotNull),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn code(self) -> u8 {
        match self {
            BinaryOp::Add => ffi::BIN_ADD,
            BinaryOp::Sub => ffi::BIN_SUB,
            BinaryOp::Mul => ffi::BIN_MUL,
            BinaryOp::Div => ffi::BIN_DIV,
            BinaryOp::Mod => ffi::BIN_MOD,
            BinaryOp::Eq => ffi::BIN_EQ,
            BinaryOp::NotEq => ffi::BIN_NE,
            BinaryOp::Gt => ffi::BIN_GT,
            BinaryOp::GtEq => ffi::BIN_GE,
            BinaryOp::Lt => ffi::BIN_LT,
            BinaryOp::LtEq => ffi::BIN_LE,
            BinaryOp::And => ffi::BIN_AND,
            BinaryOp::Or => ffi::BIN_OR,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            ffi::BIN_ADD => Some(BinaryOp::Add),
            ffi::BIN_SUB => Some(BinaryOp::Sub),
            ffi::BIN_MUL => Some(BinaryOp::Mul),
            ffi::BIN_DIV => Some(BinaryOp::Div),
            ffi::BIN_MOD => Some(BinaryOp::Mod),
            ffi::BIN_EQ => Some(BinaryOp::Eq),
            ffi::BIN_NE => Some(BinaryOp::NotEq),
            ffi::BIN_GT => Some(BinaryOp::Gt),
            ffi::BIN_GE => Some(BinaryOp::GtEq),
            ffi::BIN_LT => Some(BinaryOp::Lt),
            ffi::BIN_LE => Some(BinaryOp::LtEq),
            ffi::BIN_AND => Some(BinaryOp::And),
            ffi::BIN_OR => Some(BinaryOp::Or),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// Aggregation operation variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Sum,
    Mean,
    Min,
    Max,
    Count,
    First,
    Last,
}

impl AggOp {
    pub fn code(self) -> u8 {
        match self {
            AggOp::Sum => ffi::AGG_SUM,
            AggOp::Mean => ffi::AGG_MEAN,
            AggOp::Min => ffi::AGG_MIN,
            AggOp::Max => ffi::AGG_MAX,
            AggOp::Count => ffi::AGG_COUNT,
            AggOp::First => ffi::AGG_FIRST,
            AggOp::Last => ffi::AGG_LAST,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            ffi::AGG_SUM => Some(AggOp::Sum),
            ffi::AGG_MEAN => Some(AggOp::Mean),
            ffi::AGG_MIN => Some(AggOp::Min),
            ffi::AGG_MAX => Some(AggOp::Max),
            ffi::AGG_COUNT => Some(AggOp::Count),
            ffi::AGG_FIRST => Some(AggOp::First),
            ffi::AGG_LAST => Some(AggOp::Last),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AggOp::Sum => "sum",
            AggOp::Mean => "mean",
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::Count => "count",
            AggOp::First => "first",
            AggOp::Last => "last",
        }
    }
}

/// String transforms. Offsets and widths count characters, not bytes,
/// except `LenBytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrOp {
    Len,
    LenBytes,
    Upper,
    Lower,
    Contains(String),
    /// Negative offsets count from the end; `None` length runs to the end.
    Slice { offset: i64, length: Option<u32> },
    /// Replaces every match. `literal == false` treats `pattern` as a regex.
    Replace { pattern: String, value: String, literal: bool },
    Split(String),
    Reverse,
    Head(i64),
    Tail(i64),
    PadStart { width: u32, fill: char },
    PadEnd { width: u32, fill: char },
    Zfill(u32),
    StripPrefix(String),
    StripSuffix(String),
    /// Empty set strips whitespace.
    StripChars(String),
    StripCharsStart(String),
    StripCharsEnd(String),
}

impl StrOp {
    pub fn code(&self) -> u8 {
        match self {
            StrOp::Len => ffi::STR_LEN,
            StrOp::LenBytes => ffi::STR_LEN_BYTES,
            StrOp::Upper => ffi::STR_UPPER,
            StrOp::Lower => ffi::STR_LOWER,
            StrOp::Contains(_) => ffi::STR_CONTAINS,
            StrOp::Slice { .. } => ffi::STR_SLICE,
            StrOp::Replace { .. } => ffi::STR_REPLACE,
            StrOp::Split(_) => ffi::STR_SPLIT,
            StrOp::Reverse => ffi::STR_REVERSE,
            StrOp::Head(_) => ffi::STR_HEAD,
            StrOp::Tail(_) => ffi::STR_TAIL,
            StrOp::PadStart { .. } => ffi::STR_PAD_START,
            StrOp::PadEnd { .. } => ffi::STR_PAD_END,
            StrOp::Zfill(_) => ffi::STR_ZFILL,
            StrOp::StripPrefix(_) => ffi::STR_STRIP_PREFIX,
            StrOp::StripSuffix(_) => ffi::STR_STRIP_SUFFIX,
            StrOp::StripChars(_) => ffi::STR_STRIP_CHARS,
            StrOp::StripCharsStart(_) => ffi::STR_STRIP_CHARS_START,
            StrOp::StripCharsEnd(_) => ffi::STR_STRIP_CHARS_END,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrOp::Len => "len_chars",
            StrOp::LenBytes => "len_bytes",
            StrOp::Upper => "to_uppercase",
            StrOp::Lower => "to_lowercase",
            StrOp::Contains(_) => "contains",
            StrOp::Slice { .. } => "slice",
            StrOp::Replace { .. } => "replace_all",
            StrOp::Split(_) => "split",
            StrOp::Reverse => "reverse",
            StrOp::Head(_) => "head",
            StrOp::Tail(_) => "tail",
            StrOp::PadStart { .. } => "pad_start",
            StrOp::PadEnd { .. } => "pad_end",
            StrOp::Zfill(_) => "zfill",
            StrOp::StripPrefix(_) => "strip_prefix",
            StrOp::StripSuffix(_) => "strip_suffix",
            StrOp::StripChars(_) => "strip_chars",
            StrOp::StripCharsStart(_) => "strip_chars_start",
            StrOp::StripCharsEnd(_) => "strip_chars_end",
        }
    }
}

// ---------------------------------------------------------------------------
// Expr
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Cast { expr: Box<Expr>, to: DataType },
    Str { op: StrOp, expr: Box<Expr> },
    Agg { op: AggOp, expr: Box<Expr> },
    Offset { func: OffsetFunc, expr: Box<Expr> },
    Window { expr: Box<Expr>, spec: WindowSpec },
    Alias { expr: Box<Expr>, name: String },
    Raw(String),
}

/// Reference a column by name.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// Literal scalar.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Raw query-language fragment, forwarded to the engine untouched.
pub fn sql(text: impl Into<String>) -> Expr {
    Expr::Raw(text.into())
}

// Operator-named builders mirror the C API names; the std::ops impls below
// delegate to them.
#[allow(clippy::should_implement_trait)]
impl Expr {
    fn unary(self, op: UnaryOp) -> Expr {
        Expr::Unary {
            op,
            expr: Box::new(self),
        }
    }

    fn binary(self, op: BinaryOp, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(rhs),
        }
    }

    fn agg(self, op: AggOp) -> Expr {
        Expr::Agg {
            op,
            expr: Box::new(self),
        }
    }

    fn str_op(self, op: StrOp) -> Expr {
        Expr::Str {
            op,
            expr: Box::new(self),
        }
    }

    // ---- Arithmetic -------------------------------------------------------

    pub fn add(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Add, rhs)
    }

    pub fn sub(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Sub, rhs)
    }

    pub fn mul(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Mul, rhs)
    }

    pub fn div(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Div, rhs)
    }

    pub fn rem(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Mod, rhs)
    }

    pub fn neg(self) -> Expr {
        self.unary(UnaryOp::Neg)
    }

    // ---- Comparison -------------------------------------------------------

    pub fn eq(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Eq, rhs)
    }

    pub fn neq(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::NotEq, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Gt, rhs)
    }

    pub fn gt_eq(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::GtEq, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Lt, rhs)
    }

    pub fn lt_eq(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::LtEq, rhs)
    }

    // ---- Boolean ----------------------------------------------------------

    pub fn and(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Expr {
        self.binary(BinaryOp::Or, rhs)
    }

    pub fn not(self) -> Expr {
        self.unary(UnaryOp::Not)
    }

    pub fn is_null(self) -> Expr {
        self.unary(UnaryOp::IsNull)
    }

    pub fn is_not_null(self) -> Expr {
        self.unary(UnaryOp::IsNotNull)
    }

    // ---- Misc -------------------------------------------------------------

    pub fn cast(self, to: DataType) -> Expr {
        Expr::Cast {
            expr: Box::new(self),
            to,
        }
    }

    /// Name the output column. Wraps the node; evaluation is unchanged.
    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            name: name.into(),
        }
    }

    // ---- Aggregates -------------------------------------------------------

    pub fn sum(self) -> Expr {
        self.agg(AggOp::Sum)
    }

    pub fn mean(self) -> Expr {
        self.agg(AggOp::Mean)
    }

    pub fn min(self) -> Expr {
        self.agg(AggOp::Min)
    }

    pub fn max(self) -> Expr {
        self.agg(AggOp::Max)
    }

    pub fn count(self) -> Expr {
        self.agg(AggOp::Count)
    }

    pub fn first(self) -> Expr {
        self.agg(AggOp::First)
    }

    pub fn last(self) -> Expr {
        self.agg(AggOp::Last)
    }

    // ---- Windows ----------------------------------------------------------

    /// Value `n` rows before the current one within the window.
    pub fn lag(self, n: i64) -> Expr {
        Expr::Offset {
            func: OffsetFunc::Lag(n),
            expr: Box::new(self),
        }
    }

    /// Value `n` rows after the current one within the window.
    pub fn lead(self, n: i64) -> Expr {
        Expr::Offset {
            func: OffsetFunc::Lead(n),
            expr: Box::new(self),
        }
    }

    /// Compute per partition and broadcast to every row of the partition.
    pub fn over(self, partition_by: impl KeyList) -> Expr {
        Expr::Window {
            expr: Box::new(self),
            spec: WindowSpec::partitioned(partition_by),
        }
    }

    /// Like [`Expr::over`] with a fixed row order inside each partition.
    pub fn over_ordered(self, partition_by: impl KeyList, order_by: impl KeyList) -> Expr {
        Expr::Window {
            expr: Box::new(self),
            spec: WindowSpec::ordered(partition_by, order_by),
        }
    }

    // ---- Strings ----------------------------------------------------------

    pub fn str_len(self) -> Expr {
        self.str_op(StrOp::Len)
    }

    pub fn str_len_bytes(self) -> Expr {
        self.str_op(StrOp::LenBytes)
    }

    pub fn str_to_uppercase(self) -> Expr {
        self.str_op(StrOp::Upper)
    }

    pub fn str_to_lowercase(self) -> Expr {
        self.str_op(StrOp::Lower)
    }

    pub fn str_contains(self, pattern: impl Into<String>) -> Expr {
        self.str_op(StrOp::Contains(pattern.into()))
    }

    pub fn str_slice(self, offset: i64, length: u32) -> Expr {
        self.str_op(StrOp::Slice {
            offset,
            length: Some(length),
        })
    }

    pub fn str_slice_from(self, offset: i64) -> Expr {
        self.str_op(StrOp::Slice {
            offset,
            length: None,
        })
    }

    pub fn str_replace(
        self,
        pattern: impl Into<String>,
        value: impl Into<String>,
        literal: bool,
    ) -> Expr {
        self.str_op(StrOp::Replace {
            pattern: pattern.into(),
            value: value.into(),
            literal,
        })
    }

    pub fn str_split(self, by: impl Into<String>) -> Expr {
        self.str_op(StrOp::Split(by.into()))
    }

    pub fn str_reverse(self) -> Expr {
        self.str_op(StrOp::Reverse)
    }

    pub fn str_head(self, n: i64) -> Expr {
        self.str_op(StrOp::Head(n))
    }

    pub fn str_tail(self, n: i64) -> Expr {
        self.str_op(StrOp::Tail(n))
    }

    pub fn str_pad_start(self, width: u32, fill: char) -> Expr {
        self.str_op(StrOp::PadStart { width, fill })
    }

    pub fn str_pad_end(self, width: u32, fill: char) -> Expr {
        self.str_op(StrOp::PadEnd { width, fill })
    }

    pub fn str_zfill(self, width: u32) -> Expr {
        self.str_op(StrOp::Zfill(width))
    }

    pub fn str_strip_prefix(self, prefix: impl Into<String>) -> Expr {
        self.str_op(StrOp::StripPrefix(prefix.into()))
    }

    pub fn str_strip_suffix(self, suffix: impl Into<String>) -> Expr {
        self.str_op(StrOp::StripSuffix(suffix.into()))
    }

    pub fn str_strip_chars(self, chars: impl Into<String>) -> Expr {
        self.str_op(StrOp::StripChars(chars.into()))
    }

    pub fn str_strip_chars_start(self, chars: impl Into<String>) -> Expr {
        self.str_op(StrOp::StripCharsStart(chars.into()))
    }

    pub fn str_strip_chars_end(self, chars: impl Into<String>) -> Expr {
        self.str_op(StrOp::StripCharsEnd(chars.into()))
    }

    // ---- Introspection ----------------------------------------------------

    /// Name the engine is expected to give this expression's output column:
    /// the alias if any, otherwise the leftmost column reference. Literals
    /// are named `literal`; raw fragments are opaque and report their text.
    pub fn output_name(&self) -> &str {
        match self {
            Expr::Alias { name, .. } => name.as_str(),
            Expr::Column(name) => name.as_str(),
            Expr::Literal(_) => "literal",
            Expr::Raw(text) => text.as_str(),
            Expr::Binary { left, right, .. } => match left.as_ref() {
                Expr::Literal(_) => right.output_name(),
                _ => left.output_name(),
            },
            Expr::Unary { expr, .. }
            | Expr::Cast { expr, .. }
            | Expr::Str { expr, .. }
            | Expr::Agg { expr, .. }
            | Expr::Offset { expr, .. }
            | Expr::Window { expr, .. } => expr.output_name(),
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Expr::Raw(_))
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Column(_) | Expr::Literal(_) | Expr::Raw(_) => Vec::new(),
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::Unary { expr, .. }
            | Expr::Cast { expr, .. }
            | Expr::Str { expr, .. }
            | Expr::Agg { expr, .. }
            | Expr::Offset { expr, .. }
            | Expr::Window { expr, .. }
            | Expr::Alias { expr, .. } => vec![expr.as_ref()],
        }
    }
}

// ---- Operator overloads ---------------------------------------------------

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident) => {
        impl std::ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$method(self, rhs)
            }
        }
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);
impl_binary_op!(Mul, mul);
impl_binary_op!(Div, div);
impl_binary_op!(Rem, rem);

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::neg(self)
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::not(self)
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

// ---- Display --------------------------------------------------------------

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "col({name})"),
            Expr::Literal(Value::Str(s)) => write!(f, "'{s}'"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Not => write!(f, "NOT {expr}"),
                UnaryOp::Neg => write!(f, "-{expr}"),
                UnaryOp::IsNull => write!(f, "{expr} IS NULL"),
                UnaryOp::IsNotNull => write!(f, "{expr} IS NOT NULL"),
            },
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::Cast { expr, to } => write!(f, "{expr}.cast({to})"),
            Expr::Str { op, expr } => write!(f, "{expr}.str.{}()", op.name()),
            Expr::Agg { op, expr } => write!(f, "{expr}.{}()", op.name()),
            Expr::Offset { func, expr } => write!(f, "{expr}.{}({})", func.name(), func.param()),
            Expr::Window { expr, spec } => {
                write!(f, "{expr}.over([{}]", spec.partition_by.join(", "))?;
                if spec.is_ordered() {
                    write!(f, ", order_by=[{}]", spec.order_by.join(", "))?;
                }
                f.write_str(")")
            }
            Expr::Alias { expr, name } => write!(f, "{expr}.alias({name})"),
            Expr::Raw(text) => write!(f, "sql({text})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Selector — polymorphic select/with_columns/group_by/agg/filter entry
// ---------------------------------------------------------------------------

/// One entry of a projection-like list: a bare column name, an expression
/// tree, or a raw fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Name(String),
    Expr(Expr),
    Raw(String),
}

impl Selector {
    pub fn tag(&self) -> u8 {
        match self {
            Selector::Name(_) => ffi::ENTRY_NAME,
            Selector::Expr(_) => ffi::ENTRY_EXPR,
            Selector::Raw(_) => ffi::ENTRY_RAW,
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        if is_identifier(s) {
            Selector::Name(s.to_owned())
        } else {
            Selector::Raw(s.to_owned())
        }
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        if is_identifier(&s) {
            Selector::Name(s)
        } else {
            Selector::Raw(s)
        }
    }
}

impl From<&String> for Selector {
    fn from(s: &String) -> Self {
        Selector::from(s.as_str())
    }
}

impl From<Expr> for Selector {
    fn from(e: Expr) -> Self {
        match e {
            Expr::Raw(text) => Selector::Raw(text),
            other => Selector::Expr(other),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Name(name) => f.write_str(name),
            Selector::Expr(e) => write!(f, "{e}"),
            Selector::Raw(text) => write!(f, "sql({text})"),
        }
    }
}
