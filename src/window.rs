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

//! Window specifications and offset functions.

use crate::ffi;
use crate::join::KeyList;

/// Partition and ordering columns of a window expression.
///
/// An empty `order_by` means the aggregate is broadcast over its partition.
/// Offset functions (lag/lead) need a non-empty ordering to be deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowSpec {
    pub partition_by: Vec<String>,
    pub order_by: Vec<String>,
}

impl WindowSpec {
    pub fn partitioned(partition_by: impl KeyList) -> Self {
        WindowSpec {
            partition_by: partition_by.into_keys(),
            order_by: Vec::new(),
        }
    }

    pub fn ordered(partition_by: impl KeyList, order_by: impl KeyList) -> Self {
        WindowSpec {
            partition_by: partition_by.into_keys(),
            order_by: order_by.into_keys(),
        }
    }

    pub fn is_ordered(&self) -> bool {
        !self.order_by.is_empty()
    }
}

/// Row-offset functions. The parameter is the number of rows to look back
/// (lag) or ahead (lead); rows outside the partition yield null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetFunc {
    Lag(i64),
    Lead(i64),
}

impl OffsetFunc {
    /// Returns the OFFSET_* kind code for the C API.
    pub fn kind_code(&self) -> u8 {
        match self {
            OffsetFunc::Lag(_) => ffi::OFFSET_LAG,
            OffsetFunc::Lead(_) => ffi::OFFSET_LEAD,
        }
    }

    /// Returns the row offset.
    pub fn param(&self) -> i64 {
        match self {
            OffsetFunc::Lag(n) | OffsetFunc::Lead(n) => *n,
        }
    }

    pub fn from_code(code: u8, n: i64) -> Option<Self> {
        match code {
            ffi::OFFSET_LAG => Some(OffsetFunc::Lag(n)),
            ffi::OFFSET_LEAD => Some(OffsetFunc::Lead(n)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OffsetFunc::Lag(_) => "lag",
            OffsetFunc::Lead(_) => "lead",
        }
    }
}
