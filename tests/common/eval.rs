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

// Plan interpreter for the test engine.

use std::cmp::Ordering;
use std::collections::HashMap;

use sluice::{
    AggOp, BinaryOp, DataType, EngineErrorKind, Expr, JoinSpec, JoinType, OffsetFunc, Operation,
    Selector, SortField, StrOp, UnaryOp, WindowSpec,
};

use super::sql;
use super::table::{self, fail, Cell, Dtype, EvalResult, Series, Table};

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub fn run(ops: &[Operation]) -> EvalResult<Table> {
    let (first, rest) = ops
        .split_first()
        .ok_or_else(|| fail(EngineErrorKind::Plan, "empty plan"))?;
    let mut current = source(first)?;
    for op in rest {
        current = apply(current, op)?;
    }
    Ok(current)
}

fn source(op: &Operation) -> EvalResult<Table> {
    match op {
        Operation::ReadCsv { path, options } => table::read_csv(path, options),
        Operation::FromMemory(columns) => {
            let series = columns
                .iter()
                .map(|c| Series::from_values(&c.name, &c.values))
                .collect::<EvalResult<Vec<_>>>()?;
            Table::new(series)
        }
        Operation::Query(text) => sql::query(text, None),
        other => Err(fail(
            EngineErrorKind::Plan,
            format!("plan must start with a source, got {}", other.name()),
        )),
    }
}

fn apply(input: Table, op: &Operation) -> EvalResult<Table> {
    match op {
        Operation::ReadCsv { .. } | Operation::FromMemory(_) => Err(fail(
            EngineErrorKind::Plan,
            format!("{} can only start a plan", op.name()),
        )),
        Operation::Query(text) => sql::query(text, Some(&input)),
        Operation::Select(items) => select(&input, items),
        Operation::Filter(predicate) => filter(&input, predicate),
        Operation::WithColumns(items) => with_columns(input, items),
        Operation::GroupBy { keys, aggs } => group_by(&input, keys, aggs),
        Operation::Sort(fields) => sort(&input, fields),
        Operation::Limit(n) => Ok(input.truncate(usize::try_from(*n).unwrap_or(usize::MAX))),
        Operation::Join { other, spec } => join(&input, &run(other)?, spec),
        Operation::Concat(other) => concat(input, run(other)?),
        Operation::Count => Table::new(vec![Series::scalar(
            "count",
            Dtype::U32,
            Cell::Int(input.height() as i64),
        )]),
    }
}

pub fn eval_selector(sel: &Selector, t: &Table) -> EvalResult<Series> {
    match sel {
        Selector::Name(name) => t.column(name).cloned(),
        Selector::Expr(e) => eval(e, t),
        Selector::Raw(text) => sql::eval_fragment(text, t),
    }
}

/// Height of a projection: unit-length results broadcast to the others.
fn projected_height(series: &[Series]) -> usize {
    series
        .iter()
        .map(Series::len)
        .find(|&n| n != 1)
        .unwrap_or(1)
}

pub fn project(series: Vec<Series>) -> EvalResult<Table> {
    let height = projected_height(&series);
    let columns = series
        .into_iter()
        .map(|s| s.broadcast(height))
        .collect::<EvalResult<Vec<_>>>()?;
    Table::new(columns)
}

fn select(t: &Table, items: &[Selector]) -> EvalResult<Table> {
    let series = items
        .iter()
        .map(|s| eval_selector(s, t))
        .collect::<EvalResult<Vec<_>>>()?;
    project(series)
}

pub fn mask(t: &Table, predicate: Series) -> EvalResult<Table> {
    if !matches!(predicate.dtype, Dtype::Bool | Dtype::Null) {
        return Err(fail(
            EngineErrorKind::Type,
            format!(
                "filter predicate must be bool, got {}",
                predicate.dtype.name()
            ),
        ));
    }
    let predicate = predicate.broadcast(t.height())?;
    let keep: Vec<usize> = predicate
        .cells
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == Cell::Bool(true))
        .map(|(i, _)| i)
        .collect();
    Ok(t.take(&keep))
}

fn filter(t: &Table, predicate: &Selector) -> EvalResult<Table> {
    mask(t, eval_selector(predicate, t)?)
}

fn with_columns(mut t: Table, items: &[Selector]) -> EvalResult<Table> {
    let series = items
        .iter()
        .map(|s| eval_selector(s, &t))
        .collect::<EvalResult<Vec<_>>>()?;
    for s in series {
        t.upsert(s)?;
    }
    Ok(t)
}

/// Row indices per distinct key tuple, in order of first appearance.
pub fn partition(keys: &[Series], height: usize) -> Vec<Vec<usize>> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for row in 0..height {
        let key: Vec<String> = keys.iter().map(|k| k.cells[row].key()).collect();
        let key = key.join("\u{1f}");
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }
    groups
}

/// One value per group, evaluated by `agg` over each group's rows.
pub fn aggregate_groups<F>(
    t: &Table,
    groups: &[Vec<usize>],
    mut agg: F,
) -> EvalResult<Series>
where
    F: FnMut(&Table) -> EvalResult<Series>,
{
    let empty = agg(&t.take(&[]));
    let mut name = String::new();
    let mut dtype = Dtype::Null;
    let mut cells = Vec::with_capacity(groups.len());
    for idx in groups {
        let s = agg(&t.take(idx))?;
        if s.len() != 1 {
            return Err(fail(
                EngineErrorKind::Schema,
                format!(
                    "aggregation {} produced {} values for one group",
                    s.name,
                    s.len()
                ),
            ));
        }
        dtype = unify(dtype, s.dtype)?;
        name = s.name;
        cells.extend(s.cells);
    }
    if groups.is_empty() {
        if let Ok(s) = empty {
            name = s.name;
            dtype = s.dtype;
        }
    }
    Ok(Series::new(name, dtype, coerce(cells, dtype)))
}

fn group_by(t: &Table, keys: &[Selector], aggs: &[Selector]) -> EvalResult<Table> {
    let keys = keys
        .iter()
        .map(|k| eval_selector(k, t).and_then(|s| s.broadcast(t.height())))
        .collect::<EvalResult<Vec<_>>>()?;
    let groups = partition(&keys, t.height());
    let firsts: Vec<usize> = groups.iter().map(|g| g[0]).collect();

    let mut columns: Vec<Series> = keys.iter().map(|k| k.take(&firsts)).collect();
    for a in aggs {
        columns.push(aggregate_groups(t, &groups, |sub| eval_selector(a, sub))?);
    }
    Table::new(columns)
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

pub fn cmp_cells(a: &Cell, b: &Cell) -> Ordering {
    match (a, b) {
        (Cell::Int(x), Cell::Int(y)) => x.cmp(y),
        (Cell::Str(x), Cell::Str(y)) => x.cmp(y),
        (Cell::Bool(x), Cell::Bool(y)) => x.cmp(y),
        (Cell::List(x), Cell::List(y)) => x.cmp(y),
        (Cell::Null, Cell::Null) => Ordering::Equal,
        (Cell::Null, _) => Ordering::Greater,
        (_, Cell::Null) => Ordering::Less,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

/// Stable multi-key ordering; nulls sort last in either direction.
pub fn sorted_indices(keys: &[(&Series, bool)], height: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..height).collect();
    idx.sort_by(|&i, &j| {
        for (s, descending) in keys {
            let (a, b) = (&s.cells[i], &s.cells[j]);
            let ord = match (a.is_null(), b.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                _ if *descending => cmp_cells(b, a),
                _ => cmp_cells(a, b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    idx
}

fn sort(t: &Table, fields: &[SortField]) -> EvalResult<Table> {
    let keys = fields
        .iter()
        .map(|f| Ok((t.column(&f.column)?, f.is_descending())))
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(t.take(&sorted_indices(&keys, t.height())))
}

// ---------------------------------------------------------------------------
// Join / concat
// ---------------------------------------------------------------------------

fn join(left: &Table, right: &Table, spec: &JoinSpec) -> EvalResult<Table> {
    spec.validate()?;
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();

    let left_keys = spec
        .left_on
        .iter()
        .map(|k| left.column(k))
        .collect::<EvalResult<Vec<_>>>()?;
    let right_keys = spec
        .right_on
        .iter()
        .map(|k| right.column(k))
        .collect::<EvalResult<Vec<_>>>()?;
    for (l, r) in left_keys.iter().zip(&right_keys) {
        if l.dtype.unify(r.dtype).is_none() {
            return Err(fail(
                EngineErrorKind::Type,
                format!(
                    "join key {} ({}) cannot match {} ({})",
                    l.name,
                    l.dtype.name(),
                    r.name,
                    r.dtype.name()
                ),
            ));
        }
    }

    if spec.how == JoinType::Cross {
        for l in 0..left.height() {
            for r in 0..right.height() {
                pairs.push((Some(l), Some(r)));
            }
        }
    } else {
        let row_key = |keys: &[&Series], row: usize| -> Option<String> {
            let mut parts = Vec::with_capacity(keys.len());
            for k in keys {
                let cell = &k.cells[row];
                if cell.is_null() {
                    return None;
                }
                parts.push(cell.key());
            }
            Some(parts.join("\u{1f}"))
        };
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for r in 0..right.height() {
            if let Some(k) = row_key(&right_keys[..], r) {
                index.entry(k).or_default().push(r);
            }
        }
        let mut matched = vec![false; right.height()];
        for l in 0..left.height() {
            let hits = row_key(&left_keys[..], l).and_then(|k| index.get(&k));
            match hits {
                Some(rows) => {
                    for &r in rows {
                        matched[r] = true;
                        pairs.push((Some(l), Some(r)));
                    }
                }
                None if spec.how != JoinType::Inner => pairs.push((Some(l), None)),
                None => {}
            }
        }
        if spec.how == JoinType::Outer {
            pairs.extend(
                matched
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| !**m)
                    .map(|(r, _)| (None, Some(r))),
            );
        }
    }

    let left_idx: Vec<Option<usize>> = pairs.iter().map(|p| p.0).collect();
    let right_idx: Vec<Option<usize>> = pairs.iter().map(|p| p.1).collect();

    let mut columns: Vec<Series> = Vec::new();
    for c in &left.columns {
        let mut out = c.take_opt(&left_idx);
        if spec.coalesce {
            if let Some((_, rk)) = spec.key_pairs().find(|(lk, _)| *lk == c.name) {
                let rc = right.column(rk)?.take_opt(&right_idx);
                out.dtype = unify(out.dtype, rc.dtype)?;
                for (cell, fallback) in out.cells.iter_mut().zip(rc.cells) {
                    if cell.is_null() {
                        *cell = fallback;
                    }
                }
                out.cells = coerce(std::mem::take(&mut out.cells), out.dtype);
            }
        }
        columns.push(out);
    }
    for c in &right.columns {
        if spec.coalesce && spec.right_on.iter().any(|k| *k == c.name) {
            continue;
        }
        let mut out = c.take_opt(&right_idx);
        if columns.iter().any(|existing| existing.name == out.name) {
            out.name = format!("{}{}", out.name, spec.suffix);
        }
        columns.push(out);
    }
    Table::new(columns)
}

fn concat(top: Table, bottom: Table) -> EvalResult<Table> {
    if top.names() != bottom.names() {
        return Err(fail(
            EngineErrorKind::Schema,
            format!(
                "concat: column names differ: {:?} vs {:?}",
                top.names(),
                bottom.names()
            ),
        ));
    }
    let columns = top
        .columns
        .into_iter()
        .zip(bottom.columns)
        .map(|(a, b)| {
            let dtype = unify(a.dtype, b.dtype)?;
            let mut cells = a.cells;
            cells.extend(b.cells);
            Ok(Series::new(a.name, dtype, coerce(cells, dtype)))
        })
        .collect::<EvalResult<Vec<_>>>()?;
    Table::new(columns)
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

pub fn unify(a: Dtype, b: Dtype) -> EvalResult<Dtype> {
    a.unify(b).ok_or_else(|| {
        fail(
            EngineErrorKind::Type,
            format!("incompatible types {} and {}", a.name(), b.name()),
        )
    })
}

/// Widen integer cells when the column type is float.
pub fn coerce(cells: Vec<Cell>, dtype: Dtype) -> Vec<Cell> {
    if dtype != Dtype::F64 {
        return cells;
    }
    cells
        .into_iter()
        .map(|c| match c {
            Cell::Int(i) => Cell::Float(i as f64),
            other => other,
        })
        .collect()
}

pub fn literal(v: &sluice::Value) -> Series {
    let cell = Cell::from_value(v);
    Series::scalar("literal", cell.dtype(), cell)
}

pub fn eval(e: &Expr, t: &Table) -> EvalResult<Series> {
    match e {
        Expr::Column(name) => t.column(name).cloned(),
        Expr::Literal(v) => Ok(literal(v)),
        Expr::Alias { expr, name } => Ok(eval(expr, t)?.renamed(name.clone())),
        Expr::Unary { op, expr } => unary(*op, eval(expr, t)?),
        Expr::Binary { op, left, right } => binary(*op, eval(left, t)?, eval(right, t)?),
        Expr::Cast { expr, to } => Ok(cast(eval(expr, t)?, *to)),
        Expr::Str { op, expr } => string(op, eval(expr, t)?),
        Expr::Agg { op, expr } => aggregate(*op, eval(expr, t)?),
        Expr::Offset { func, expr } => Ok(offset(*func, eval(expr, t)?)),
        Expr::Window { expr, spec } => window(t, spec, |sub| eval(expr, sub)),
        Expr::Raw(text) => sql::eval_fragment(text, t),
    }
}

pub fn unary(op: UnaryOp, s: Series) -> EvalResult<Series> {
    let Series { name, dtype, cells } = s;
    match op {
        UnaryOp::IsNull | UnaryOp::IsNotNull => {
            let want = op == UnaryOp::IsNull;
            let cells = cells.iter().map(|c| Cell::Bool(c.is_null() == want)).collect();
            Ok(Series::new(name, Dtype::Bool, cells))
        }
        UnaryOp::Not if matches!(dtype, Dtype::Bool | Dtype::Null) => {
            let cells = cells
                .into_iter()
                .map(|c| match c {
                    Cell::Bool(b) => Cell::Bool(!b),
                    other => other,
                })
                .collect();
            Ok(Series::new(name, Dtype::Bool, cells))
        }
        UnaryOp::Neg if dtype.is_numeric() || dtype == Dtype::Null => {
            let cells = cells
                .into_iter()
                .map(|c| match c {
                    Cell::Int(i) => i.checked_neg().map_or(Cell::Null, Cell::Int),
                    Cell::Float(f) => Cell::Float(-f),
                    other => other,
                })
                .collect();
            let dtype = if dtype == Dtype::U32 { Dtype::I64 } else { dtype };
            Ok(Series::new(name, dtype, cells))
        }
        _ => Err(fail(
            EngineErrorKind::Type,
            format!("cannot apply {op:?} to {}", dtype.name()),
        )),
    }
}

fn align(l: Series, r: Series) -> EvalResult<(Series, Series)> {
    let n = if l.len() == 1 { r.len() } else { l.len() };
    Ok((l.broadcast(n)?, r.broadcast(n)?))
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Some(q - 1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn arith_dtype(op: BinaryOp, l: Dtype, r: Dtype) -> EvalResult<Dtype> {
    let dtype = match (l, r) {
        (Dtype::Null, other) | (other, Dtype::Null) if other.is_numeric() || other == Dtype::Null => other,
        (Dtype::Str, Dtype::Str) | (Dtype::Str, Dtype::Null) | (Dtype::Null, Dtype::Str)
            if op == BinaryOp::Add =>
        {
            Dtype::Str
        }
        (Dtype::U32, Dtype::U32) if op != BinaryOp::Sub => Dtype::U32,
        (a, b) if a.is_integer() && b.is_integer() => Dtype::I64,
        (a, b) if a.is_numeric() && b.is_numeric() => Dtype::F64,
        _ => {
            return Err(fail(
                EngineErrorKind::Type,
                format!(
                    "cannot apply {} to {} and {}",
                    op.symbol(),
                    l.name(),
                    r.name()
                ),
            ))
        }
    };
    Ok(if dtype == Dtype::Null { Dtype::I64 } else { dtype })
}

fn arith(op: BinaryOp, a: &Cell, b: &Cell) -> Cell {
    match (a, b) {
        (Cell::Null, _) | (_, Cell::Null) => Cell::Null,
        (Cell::Str(x), Cell::Str(y)) => Cell::Str(format!("{x}{y}")),
        (Cell::Int(x), Cell::Int(y)) => {
            let (x, y) = (*x, *y);
            let out = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div => floor_div(x, y),
                _ => floor_mod(x, y),
            };
            out.map_or(Cell::Null, Cell::Int)
        }
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Cell::Float(match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
                _ => x - y * (x / y).floor(),
            }),
            _ => Cell::Null,
        },
    }
}

fn compare(op: BinaryOp, a: &Cell, b: &Cell) -> Cell {
    if a.is_null() || b.is_null() {
        return Cell::Null;
    }
    let ord = cmp_cells(a, b);
    Cell::Bool(match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::NotEq => ord != Ordering::Equal,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::GtEq => ord != Ordering::Less,
        BinaryOp::Lt => ord == Ordering::Less,
        _ => ord != Ordering::Greater,
    })
}

fn kleene(op: BinaryOp, a: &Cell, b: &Cell) -> Cell {
    let (x, y) = match (a, b) {
        (Cell::Bool(x), Cell::Bool(y)) => (Some(*x), Some(*y)),
        (Cell::Bool(x), _) => (Some(*x), None),
        (_, Cell::Bool(y)) => (None, Some(*y)),
        _ => (None, None),
    };
    let out = match op {
        BinaryOp::And => match (x, y) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        _ => match (x, y) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
    };
    out.map_or(Cell::Null, Cell::Bool)
}

fn comparable(a: Dtype, b: Dtype) -> bool {
    a == Dtype::Null || b == Dtype::Null || a == b || (a.is_numeric() && b.is_numeric())
}

pub fn binary(op: BinaryOp, l: Series, r: Series) -> EvalResult<Series> {
    let (l, r) = align(l, r)?;
    let type_error = || {
        fail(
            EngineErrorKind::Type,
            format!(
                "cannot apply {} to {} and {}",
                op.symbol(),
                l.dtype.name(),
                r.dtype.name()
            ),
        )
    };
    let (dtype, cells): (Dtype, Vec<Cell>) = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let dtype = arith_dtype(op, l.dtype, r.dtype)?;
            let cells = l.cells.iter().zip(&r.cells).map(|(a, b)| arith(op, a, b));
            (dtype, coerce(cells.collect(), dtype))
        }
        BinaryOp::And | BinaryOp::Or => {
            let boolish = |d: Dtype| matches!(d, Dtype::Bool | Dtype::Null);
            if !boolish(l.dtype) || !boolish(r.dtype) {
                return Err(type_error());
            }
            let cells = l.cells.iter().zip(&r.cells).map(|(a, b)| kleene(op, a, b));
            (Dtype::Bool, cells.collect())
        }
        _ => {
            if !comparable(l.dtype, r.dtype) {
                return Err(type_error());
            }
            let cells = l.cells.iter().zip(&r.cells).map(|(a, b)| compare(op, a, b));
            (Dtype::Bool, cells.collect())
        }
    };
    let name = if l.name == "literal" && r.name != "literal" {
        r.name.clone()
    } else {
        l.name.clone()
    };
    Ok(Series::new(name, dtype, cells))
}

pub fn cast(s: Series, to: DataType) -> Series {
    let dtype = Dtype::from_data_type(to);
    let cells = s
        .cells
        .into_iter()
        .map(|c| match (to, c) {
            (_, Cell::Null) => Cell::Null,
            (DataType::Int64, Cell::Int(i)) => Cell::Int(i),
            (DataType::Int64, Cell::Float(f)) if f.is_finite() => Cell::Int(f.trunc() as i64),
            (DataType::Int64, Cell::Bool(b)) => Cell::Int(i64::from(b)),
            (DataType::Int64, Cell::Str(s)) => s.trim().parse().map_or(Cell::Null, Cell::Int),
            (DataType::Float64, Cell::Int(i)) => Cell::Float(i as f64),
            (DataType::Float64, Cell::Float(f)) => Cell::Float(f),
            (DataType::Float64, Cell::Bool(b)) => Cell::Float(f64::from(u8::from(b))),
            (DataType::Float64, Cell::Str(s)) => s.trim().parse().map_or(Cell::Null, Cell::Float),
            (DataType::Boolean, Cell::Bool(b)) => Cell::Bool(b),
            (DataType::Boolean, Cell::Int(i)) => Cell::Bool(i != 0),
            (DataType::Boolean, Cell::Float(f)) => Cell::Bool(f != 0.0),
            (DataType::Boolean, Cell::Str(s)) => match s.as_str() {
                "true" => Cell::Bool(true),
                "false" => Cell::Bool(false),
                _ => Cell::Null,
            },
            (DataType::Utf8, c) => Cell::Str(c.to_string()),
            _ => Cell::Null,
        })
        .collect();
    Series::new(s.name, dtype, cells)
}

// ---------------------------------------------------------------------------
// String functions
// ---------------------------------------------------------------------------

fn char_slice(s: &str, offset: i64, length: Option<u32>) -> String {
    let n = s.chars().count() as i64;
    let start = if offset < 0 { (n + offset).max(0) } else { offset.min(n) };
    let len = length.map_or(i64::MAX, i64::from);
    s.chars()
        .skip(start as usize)
        .take(usize::try_from(len).unwrap_or(usize::MAX))
        .collect()
}

fn head(s: &str, n: i64) -> String {
    let total = s.chars().count() as i64;
    let keep = if n >= 0 { n.min(total) } else { (total + n).max(0) };
    s.chars().take(keep as usize).collect()
}

fn tail(s: &str, n: i64) -> String {
    let total = s.chars().count() as i64;
    let keep = if n >= 0 { n.min(total) } else { (total + n).max(0) };
    s.chars().skip((total - keep) as usize).collect()
}

fn pad(s: &str, width: u32, fill: char, start: bool) -> String {
    let width = usize::try_from(width).unwrap_or(usize::MAX);
    let n = s.chars().count();
    if n >= width {
        return s.to_owned();
    }
    let padding: String = std::iter::repeat(fill).take(width - n).collect();
    if start {
        format!("{padding}{s}")
    } else {
        format!("{s}{padding}")
    }
}

fn zfill(s: &str, width: u32) -> String {
    match s.strip_prefix(|c: char| c == '-' || c == '+') {
        Some(rest) => {
            let sign = &s[..1];
            format!("{sign}{}", pad(rest, width.saturating_sub(1), '0', true))
        }
        None => pad(s, width, '0', true),
    }
}

fn strip_set(chars: &str) -> impl Fn(char) -> bool + '_ {
    move |c| {
        if chars.is_empty() {
            c.is_whitespace()
        } else {
            chars.contains(c)
        }
    }
}

fn str_cell(op: &StrOp, s: &str) -> EvalResult<Cell> {
    let text = |v: String| Cell::Str(v);
    Ok(match op {
        StrOp::Len => Cell::Int(s.chars().count() as i64),
        StrOp::LenBytes => Cell::Int(s.len() as i64),
        StrOp::Upper => text(s.to_uppercase()),
        StrOp::Lower => text(s.to_lowercase()),
        StrOp::Contains(p) => Cell::Bool(s.contains(p.as_str())),
        StrOp::Slice { offset, length } => text(char_slice(s, *offset, *length)),
        StrOp::Replace { literal: false, .. } => {
            return Err(fail(
                EngineErrorKind::Plan,
                "pattern replacement is not supported, use a literal replace",
            ))
        }
        StrOp::Replace { pattern, value, .. } => text(s.replace(pattern.as_str(), value)),
        StrOp::Split(by) if by.is_empty() => {
            Cell::List(s.chars().map(String::from).collect())
        }
        StrOp::Split(by) => Cell::List(s.split(by.as_str()).map(str::to_owned).collect()),
        StrOp::Reverse => text(s.chars().rev().collect()),
        StrOp::Head(n) => text(head(s, *n)),
        StrOp::Tail(n) => text(tail(s, *n)),
        StrOp::PadStart { width, fill } => text(pad(s, *width, *fill, true)),
        StrOp::PadEnd { width, fill } => text(pad(s, *width, *fill, false)),
        StrOp::Zfill(width) => text(zfill(s, *width)),
        StrOp::StripPrefix(p) => text(s.strip_prefix(p.as_str()).unwrap_or(s).to_owned()),
        StrOp::StripSuffix(p) => text(s.strip_suffix(p.as_str()).unwrap_or(s).to_owned()),
        StrOp::StripChars(set) => text(s.trim_matches(strip_set(set)).to_owned()),
        StrOp::StripCharsStart(set) => text(s.trim_start_matches(strip_set(set)).to_owned()),
        StrOp::StripCharsEnd(set) => text(s.trim_end_matches(strip_set(set)).to_owned()),
    })
}

pub fn string(op: &StrOp, s: Series) -> EvalResult<Series> {
    if !matches!(s.dtype, Dtype::Str | Dtype::Null) {
        return Err(fail(
            EngineErrorKind::Type,
            format!("str.{} expects str, got {}", op.name(), s.dtype.name()),
        ));
    }
    let dtype = match op {
        StrOp::Len | StrOp::LenBytes => Dtype::U32,
        StrOp::Contains(_) => Dtype::Bool,
        StrOp::Split(_) => Dtype::ListStr,
        _ => Dtype::Str,
    };
    let cells = s
        .cells
        .iter()
        .map(|c| match c {
            Cell::Str(v) => str_cell(op, v),
            _ => Ok(Cell::Null),
        })
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(Series::new(s.name, dtype, cells))
}

// ---------------------------------------------------------------------------
// Aggregates, offsets and windows
// ---------------------------------------------------------------------------

pub fn aggregate(op: AggOp, s: Series) -> EvalResult<Series> {
    let present: Vec<&Cell> = s.cells.iter().filter(|c| !c.is_null()).collect();
    let numeric = s.dtype.is_numeric() || matches!(s.dtype, Dtype::Bool | Dtype::Null);
    let (dtype, cell) = match op {
        AggOp::Count => (Dtype::U32, Cell::Int(present.len() as i64)),
        AggOp::First => (s.dtype, s.cells.first().cloned().unwrap_or(Cell::Null)),
        AggOp::Last => (s.dtype, s.cells.last().cloned().unwrap_or(Cell::Null)),
        AggOp::Min | AggOp::Max => {
            let pick = present.into_iter().reduce(|a, b| {
                let ord = cmp_cells(a, b);
                match (op, ord) {
                    (AggOp::Min, Ordering::Greater) | (AggOp::Max, Ordering::Less) => b,
                    _ => a,
                }
            });
            (s.dtype, pick.cloned().unwrap_or(Cell::Null))
        }
        AggOp::Sum | AggOp::Mean if !numeric => {
            return Err(fail(
                EngineErrorKind::Type,
                format!("{} of {} column {}", op.name(), s.dtype.name(), s.name),
            ))
        }
        AggOp::Sum => match s.dtype {
            Dtype::F64 => (
                Dtype::F64,
                Cell::Float(present.iter().filter_map(|c| c.as_f64()).sum()),
            ),
            Dtype::Bool => (
                Dtype::U32,
                Cell::Int(present.iter().filter(|c| ***c == Cell::Bool(true)).count() as i64),
            ),
            dtype => {
                let total = present.iter().try_fold(0i64, |acc, c| match c {
                    Cell::Int(i) => acc.checked_add(*i),
                    _ => Some(acc),
                });
                let dtype = if dtype == Dtype::Null { Dtype::I64 } else { dtype };
                (dtype, total.map_or(Cell::Null, Cell::Int))
            }
        },
        AggOp::Mean => {
            let values: Vec<f64> = present
                .iter()
                .filter_map(|c| match c {
                    Cell::Bool(b) => Some(f64::from(u8::from(*b))),
                    other => other.as_f64(),
                })
                .collect();
            let cell = if values.is_empty() {
                Cell::Null
            } else {
                Cell::Float(values.iter().sum::<f64>() / values.len() as f64)
            };
            (Dtype::F64, cell)
        }
    };
    Ok(Series::scalar(s.name, dtype, cell))
}

pub fn offset(func: OffsetFunc, s: Series) -> Series {
    let shift = match func {
        OffsetFunc::Lag(n) => n,
        OffsetFunc::Lead(n) => -n,
    };
    let n = s.len() as i64;
    let cells = (0..n)
        .map(|i| {
            let src = i - shift;
            if (0..n).contains(&src) {
                s.cells[src as usize].clone()
            } else {
                Cell::Null
            }
        })
        .collect();
    Series::new(s.name, s.dtype, cells)
}

/// Evaluate per partition and scatter back to the original row positions.
pub fn window<F>(t: &Table, spec: &WindowSpec, mut inner: F) -> EvalResult<Series>
where
    F: FnMut(&Table) -> EvalResult<Series>,
{
    let keys = spec
        .partition_by
        .iter()
        .map(|k| t.column(k).cloned())
        .collect::<EvalResult<Vec<_>>>()?;
    let mut groups = partition(&keys, t.height());
    if spec.is_ordered() {
        for rows in &mut groups {
            let sub = t.take(rows);
            let order = spec
                .order_by
                .iter()
                .map(|k| Ok((sub.column(k)?, false)))
                .collect::<EvalResult<Vec<_>>>()?;
            let perm = sorted_indices(&order, sub.height());
            let reordered: Vec<usize> = perm.into_iter().map(|i| rows[i]).collect();
            *rows = reordered;
        }
    }

    let mut out = vec![Cell::Null; t.height()];
    let mut dtype = Dtype::Null;
    let mut name = String::new();
    for rows in &groups {
        let s = inner(&t.take(rows))?;
        dtype = unify(dtype, s.dtype)?;
        name = s.name.clone();
        let s = s.broadcast(rows.len())?;
        for (row, cell) in rows.iter().zip(s.cells) {
            out[*row] = cell;
        }
    }
    if groups.is_empty() {
        name = inner(t).map(|s| s.name).unwrap_or_default();
    }
    Ok(Series::new(name, dtype, coerce(out, dtype)))
}
