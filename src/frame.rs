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

//! The lazy operation chain.
//!
//! A [`Frame`] is an append-only list of [`Operation`]s, or the first error
//! recorded while building it. Builder calls on a failed frame are no-ops, so
//! construction errors surface only at [`Frame::collect`].

use std::path::Path;

use tracing::debug;

use crate::engine::{Collected, Engine, Error, Result};
use crate::expr::Selector;
use crate::join::{JoinSpec, JoinType, KeyList};
use crate::value::{DataType, Value};

// ---------------------------------------------------------------------------
// Plan building blocks
// ---------------------------------------------------------------------------

/// A named in-memory column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub column: String,
    pub order: SortOrder,
}

impl SortField {
    pub fn asc(column: impl Into<String>) -> Self {
        SortField {
            column: column.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        SortField {
            column: column.into(),
            order: SortOrder::Descending,
        }
    }

    pub fn is_descending(&self) -> bool {
        self.order == SortOrder::Descending
    }
}

/// CSV scan options. `dtypes` overrides inferred column types by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub has_header: bool,
    pub dtypes: Option<Vec<DataType>>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: b',',
            has_header: true,
            dtypes: None,
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_dtypes(mut self, dtypes: Vec<DataType>) -> Self {
        self.dtypes = Some(dtypes);
        self
    }
}

/// One stage of a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ReadCsv { path: String, options: CsvOptions },
    FromMemory(Vec<Column>),
    /// A full statement; the incoming row set is visible as `df`.
    Query(String),
    Select(Vec<Selector>),
    Filter(Selector),
    WithColumns(Vec<Selector>),
    GroupBy { keys: Vec<Selector>, aggs: Vec<Selector> },
    Sort(Vec<SortField>),
    Limit(u64),
    Join { other: Vec<Operation>, spec: JoinSpec },
    Concat(Vec<Operation>),
    Count,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ReadCsv { .. } => "read_csv",
            Operation::FromMemory(_) => "from_memory",
            Operation::Query(_) => "query",
            Operation::Select(_) => "select",
            Operation::Filter(_) => "filter",
            Operation::WithColumns(_) => "with_columns",
            Operation::GroupBy { .. } => "group_by",
            Operation::Sort(_) => "sort",
            Operation::Limit(_) => "limit",
            Operation::Join { .. } => "join",
            Operation::Concat(_) => "concat",
            Operation::Count => "count",
        }
    }
}

fn selectors<I, S>(items: I) -> Vec<Selector>
where
    I: IntoIterator<Item = S>,
    S: Into<Selector>,
{
    items.into_iter().map(Into::into).collect()
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A lazily built query plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    plan: std::result::Result<Vec<Operation>, Error>,
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new()
    }
}

impl Frame {
    /// An empty plan.
    pub fn new() -> Self {
        Frame { plan: Ok(Vec::new()) }
    }

    fn failed(err: Error) -> Self {
        debug!(error = %err, "deferred plan error");
        Frame { plan: Err(err) }
    }

    fn push(mut self, op: Operation) -> Self {
        if let Ok(ops) = &mut self.plan {
            ops.push(op);
        }
        self
    }

    fn fail(self, err: Error) -> Self {
        match self.plan {
            Ok(_) => Frame::failed(err),
            Err(_) => self,
        }
    }

    // ---- Sources ----------------------------------------------------------

    /// Scan a CSV file with default options.
    pub fn read_csv(path: impl AsRef<Path>) -> Self {
        Frame::read_csv_opts(path, CsvOptions::default())
    }

    pub fn read_csv_opts(path: impl AsRef<Path>, options: CsvOptions) -> Self {
        match path.as_ref().to_str() {
            Some(p) => Frame::new().push(Operation::ReadCsv {
                path: p.to_owned(),
                options,
            }),
            None => Frame::failed(Error::InvalidInput(format!(
                "read_csv: path is not valid UTF-8: {}",
                path.as_ref().display()
            ))),
        }
    }

    /// Row-oriented ingestion. Column names and order come from the first
    /// record; keys missing from later records are null, extra keys are
    /// ignored.
    pub fn from_records<I, R, K, V>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut rows = records.into_iter().map(|record| {
            record
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect::<Vec<(String, Value)>>()
        });

        let first = match rows.next() {
            Some(first) => first,
            None => return Frame::failed(Error::EmptyRecords),
        };
        if first.is_empty() {
            return Frame::failed(Error::EmptyFirstRecord);
        }

        let mut columns: Vec<Column> = first
            .into_iter()
            .map(|(name, value)| Column::new(name, vec![value]))
            .collect();

        for (row_idx, mut row) in rows.enumerate() {
            for column in &mut columns {
                let value = row
                    .iter()
                    .position(|(k, _)| *k == column.name)
                    .map(|pos| row.swap_remove(pos).1)
                    .unwrap_or(Value::Null);
                column.values.push(value);
            }
            if !row.is_empty() {
                debug!(
                    row = row_idx + 1,
                    ignored = row.len(),
                    "record keys outside first record's schema"
                );
            }
        }

        Frame::from_column_vec(columns)
    }

    /// Column-oriented ingestion. Column order is iteration order.
    pub fn from_columns<I, K, C, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let columns = columns
            .into_iter()
            .map(|(name, values)| Column::new(name, values.into_iter().map(Into::into).collect()))
            .collect();
        Frame::from_column_vec(columns)
    }

    /// Ingest already-marshalled columns.
    pub fn from_column_vec(columns: Vec<Column>) -> Self {
        let expected = match columns.first() {
            Some(c) => c.len(),
            None => return Frame::failed(Error::EmptyColumns),
        };
        if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
            return Frame::failed(Error::LengthMismatch {
                expected,
                found: bad.len(),
            });
        }
        Frame::new().push(Operation::FromMemory(columns))
    }

    /// Ingest JSON: an array of objects (records) or an object of arrays
    /// (columns). Nested values become null.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Array(rows) => {
                let mut records = Vec::with_capacity(rows.len());
                for row in rows {
                    match row {
                        serde_json::Value::Object(map) => records.push(
                            map.iter()
                                .map(|(k, v)| (k.clone(), Value::from(v)))
                                .collect::<Vec<_>>(),
                        ),
                        other => {
                            return Frame::failed(Error::InvalidInput(format!(
                                "from_json: expected an object per record, got {other}"
                            )))
                        }
                    }
                }
                Frame::from_records(records)
            }
            serde_json::Value::Object(map) => {
                let mut columns = Vec::with_capacity(map.len());
                for (name, values) in map {
                    match values {
                        serde_json::Value::Array(values) => columns.push(Column::new(
                            name.clone(),
                            values.iter().map(Value::from).collect(),
                        )),
                        other => {
                            return Frame::failed(Error::InvalidInput(format!(
                                "from_json: column {name:?} is not an array: {other}"
                            )))
                        }
                    }
                }
                Frame::from_column_vec(columns)
            }
            other => Frame::failed(Error::InvalidInput(format!(
                "from_json: expected an array of records or an object of columns, got {other}"
            ))),
        }
    }

    /// Start a plan from a full statement.
    pub fn from_sql(text: impl Into<String>) -> Self {
        Frame::new().query(text)
    }

    // ---- Transformations --------------------------------------------------

    pub fn select<I, S>(self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        self.push(Operation::Select(selectors(items)))
    }

    pub fn filter(self, predicate: impl Into<Selector>) -> Self {
        self.push(Operation::Filter(predicate.into()))
    }

    pub fn with_columns<I, S>(self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        self.push(Operation::WithColumns(selectors(items)))
    }

    /// Group by `keys`; finish with [`GroupBy::agg`].
    pub fn group_by<I, S>(self, keys: I) -> GroupBy
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        GroupBy {
            frame: self,
            keys: selectors(keys),
        }
    }

    /// Ascending sort on one or more columns.
    pub fn sort(self, keys: impl KeyList) -> Self {
        let fields = keys.into_keys().into_iter().map(SortField::asc).collect();
        self.push(Operation::Sort(fields))
    }

    pub fn sort_by(self, fields: impl IntoIterator<Item = SortField>) -> Self {
        self.push(Operation::Sort(fields.into_iter().collect()))
    }

    pub fn limit(self, n: usize) -> Self {
        self.push(Operation::Limit(n as u64))
    }

    /// Join against a snapshot of `other`'s operations.
    pub fn join(self, other: &Frame, spec: JoinSpec) -> Self {
        if self.is_err() {
            return self;
        }
        let other = match &other.plan {
            Ok(ops) => ops.clone(),
            Err(e) => return self.fail(e.clone()),
        };
        if let Err(e) = spec.validate() {
            return self.fail(e);
        }
        self.push(Operation::Join { other, spec })
    }

    pub fn inner_join(self, other: &Frame, on: impl KeyList) -> Self {
        self.join(other, JoinSpec::on(on))
    }

    pub fn left_join(self, other: &Frame, on: impl KeyList) -> Self {
        self.join(other, JoinSpec::on(on).with_type(JoinType::Left))
    }

    pub fn outer_join(self, other: &Frame, on: impl KeyList) -> Self {
        self.join(other, JoinSpec::on(on).with_type(JoinType::Outer))
    }

    pub fn cross_join(self, other: &Frame) -> Self {
        self.join(other, JoinSpec::cross())
    }

    /// Append `other`'s rows after this frame's rows.
    pub fn concat(self, other: &Frame) -> Self {
        if self.is_err() {
            return self;
        }
        match &other.plan {
            Ok(ops) => {
                let ops = ops.clone();
                self.push(Operation::Concat(ops))
            }
            Err(e) => self.fail(e.clone()),
        }
    }

    /// Replace the rows with a single `count` column holding the row count.
    pub fn count(self) -> Self {
        self.push(Operation::Count)
    }

    /// Run a full statement over the current rows, visible as `df`.
    pub fn query(self, text: impl Into<String>) -> Self {
        self.push(Operation::Query(text.into()))
    }

    // ---- Inspection -------------------------------------------------------

    /// The operations so far, or the deferred error.
    pub fn operations(&self) -> Result<&[Operation]> {
        match &self.plan {
            Ok(ops) => Ok(ops.as_slice()),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn error(&self) -> Option<&Error> {
        self.plan.as_ref().err()
    }

    pub fn is_err(&self) -> bool {
        self.plan.is_err()
    }

    /// Number of top-level operations (0 for a failed frame).
    pub fn len(&self) -> usize {
        self.plan.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shorthand for [`Engine::collect`].
    pub fn collect(&self, engine: &Engine) -> Result<Collected> {
        engine.collect(self)
    }
}

/// Concatenate frames in order. Fails on an empty list.
pub fn concat<'a>(frames: impl IntoIterator<Item = &'a Frame>) -> Frame {
    let mut frames = frames.into_iter();
    let Some(first) = frames.next() else {
        return Frame::failed(Error::InvalidInput(
            "concat: at least one frame is required".to_owned(),
        ));
    };
    frames.fold(first.clone(), |acc, f| acc.concat(f))
}

// ---------------------------------------------------------------------------
// GroupBy
// ---------------------------------------------------------------------------

/// Pending grouping, completed by [`GroupBy::agg`].
#[derive(Debug, Clone)]
pub struct GroupBy {
    frame: Frame,
    keys: Vec<Selector>,
}

impl GroupBy {
    pub fn agg<I, S>(self, aggs: I) -> Frame
    where
        I: IntoIterator<Item = S>,
        S: Into<Selector>,
    {
        let aggs = selectors(aggs);
        self.frame.push(Operation::GroupBy {
            keys: self.keys,
            aggs,
        })
    }
}
