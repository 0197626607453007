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

//! sluice: lazy query-building front end for columnar execution engines.
//!
//! Plans are assembled with [`Frame`] from typed expressions ([`col`], [`lit`])
//! and raw fragments ([`sql`]) in any mix, and nothing runs until
//! [`Frame::collect`] hands the plan to an [`Engine`] over its C vtable.
//!
//! ```no_run
//! use sluice::{col, lit, Engine, Frame};
//!
//! fn run(engine: &Engine) -> sluice::Result<()> {
//!     let result = Frame::read_csv("employees.csv")
//!         .filter(col("department").eq(lit("Engineering")))
//!         .select(["name", "salary"])
//!         .collect(engine)?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod engine;
pub mod expr;
pub mod ffi;
pub mod frame;
pub mod join;
pub mod value;
pub mod window;
pub mod wire;

pub use engine::{Collected, Engine, EngineErrorKind, Error, Result};
pub use expr::{col, lit, sql, AggOp, BinaryOp, Expr, Selector, StrOp, UnaryOp};
pub use frame::{concat, Column, CsvOptions, Frame, GroupBy, Operation, SortField, SortOrder};
pub use join::{JoinSpec, JoinType, KeyList, DEFAULT_JOIN_SUFFIX};
pub use value::{DataType, Value};
pub use window::{OffsetFunc, WindowSpec};
