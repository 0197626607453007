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

//! Typed scalar cells used for in-memory ingestion.
//!
//! Host values of any supported type are widened into one of five canonical
//! tags. Types the marshaller does not recognize become `Value::Null`.

use std::any::Any;
use std::fmt;

use crate::ffi;

// ---------------------------------------------------------------------------
// DataType
// ---------------------------------------------------------------------------

/// Logical column type, used as a cast target and for CSV overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int64,
    Float64,
    Utf8,
    Boolean,
}

impl DataType {
    pub fn code(self) -> u8 {
        match self {
            DataType::Int64 => ffi::SL_DTYPE_INT64,
            DataType::Float64 => ffi::SL_DTYPE_FLOAT64,
            DataType::Utf8 => ffi::SL_DTYPE_UTF8,
            DataType::Boolean => ffi::SL_DTYPE_BOOL,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            ffi::SL_DTYPE_INT64 => Some(DataType::Int64),
            ffi::SL_DTYPE_FLOAT64 => Some(DataType::Float64),
            ffi::SL_DTYPE_UTF8 => Some(DataType::Utf8),
            ffi::SL_DTYPE_BOOL => Some(DataType::Boolean),
            _ => None,
        }
    }

    /// Short type name as shown in rendered table headers.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int64 => "i64",
            DataType::Float64 => "f64",
            DataType::Utf8 => "str",
            DataType::Boolean => "bool",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single typed cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    #[default]
    Null,
}

impl Value {
    /// Wire tag (`SL_VALUE_*`).
    pub fn tag(&self) -> u8 {
        match self {
            Value::Int(_) => ffi::SL_VALUE_INT,
            Value::Float(_) => ffi::SL_VALUE_FLOAT,
            Value::Str(_) => ffi::SL_VALUE_STR,
            Value::Bool(_) => ffi::SL_VALUE_BOOL,
            Value::Null => ffi::SL_VALUE_NULL,
        }
    }

    /// Logical type of a non-null value.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Int(_) => Some(DataType::Int64),
            Value::Float(_) => Some(DataType::Float64),
            Value::Str(_) => Some(DataType::Utf8),
            Value::Bool(_) => Some(DataType::Boolean),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers are converted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert a dynamically typed host value.
    ///
    /// Integers up to 32 bits (and `i64`/`isize`) become `Int`, unsigned
    /// 64-bit values become `Int` when they fit. `f32`/`f64` become `Float`.
    /// Text arrives as `&str`, `&String`, `String` or `Box<str>`. `Option<T>`
    /// of any of these unwraps, `None` is `Null`. Anything else is `Null`.
    pub fn from_any(v: &dyn Any) -> Value {
        macro_rules! try_types {
            ($($t:ty),* $(,)?) => {
                $(
                    if let Some(x) = v.downcast_ref::<$t>() {
                        return Value::from(x.clone());
                    }
                    if let Some(x) = v.downcast_ref::<Option<$t>>() {
                        return Value::from(x.clone());
                    }
                )*
            };
        }

        if let Some(x) = v.downcast_ref::<Value>() {
            return x.clone();
        }
        if let Some(x) = v.downcast_ref::<&str>() {
            return Value::from(*x);
        }
        if let Some(x) = v.downcast_ref::<Option<&str>>() {
            return Value::from(*x);
        }
        if let Some(x) = v.downcast_ref::<&String>() {
            return Value::from(*x);
        }
        if let Some(x) = v.downcast_ref::<Box<str>>() {
            return Value::from(&**x);
        }
        if let Some(x) = v.downcast_ref::<serde_json::Value>() {
            return Value::from(x);
        }
        try_types!(i64, i32, i16, i8, isize, u64, u32, u16, u8, usize, f64, f32, bool, char, String);
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
        }
    }
}

// ---- From impls -----------------------------------------------------------

macro_rules! from_lossless_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

from_lossless_int!(i64, i32, i16, i8, u32, u16, u8);

macro_rules! from_checked_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    i64::try_from(v).map_or(Value::Null, Value::Int)
                }
            }
        )*
    };
}

from_checked_int!(isize, u64, usize);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_owned())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Str(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from(&v)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Null => serde_json::Value::Null,
        }
    }
}
