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

//! Join specifications.

use std::fmt;

use crate::engine::{Error, Result};
use crate::ffi;

/// Suffix appended to colliding non-key right-hand columns.
pub const DEFAULT_JOIN_SUFFIX: &str = "_right";

// ---------------------------------------------------------------------------
// KeyList — anything that names one or more columns
// ---------------------------------------------------------------------------

/// Column name list accepted by join keys, sort keys and window specs.
pub trait KeyList {
    fn into_keys(self) -> Vec<String>;
}

impl KeyList for &str {
    fn into_keys(self) -> Vec<String> {
        vec![self.to_owned()]
    }
}

impl KeyList for String {
    fn into_keys(self) -> Vec<String> {
        vec![self]
    }
}

impl KeyList for &String {
    fn into_keys(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<S: AsRef<str>> KeyList for Vec<S> {
    fn into_keys(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_owned()).collect()
    }
}

impl<S: AsRef<str>> KeyList for &[S] {
    fn into_keys(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_owned()).collect()
    }
}

impl<S: AsRef<str>, const N: usize> KeyList for [S; N] {
    fn into_keys(self) -> Vec<String> {
        self.iter().map(|s| s.as_ref().to_owned()).collect()
    }
}

// ---------------------------------------------------------------------------
// JoinType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Outer,
    Cross,
}

impl JoinType {
    pub fn code(self) -> u8 {
        match self {
            JoinType::Inner => ffi::JOIN_INNER,
            JoinType::Left => ffi::JOIN_LEFT,
            JoinType::Outer => ffi::JOIN_OUTER,
            JoinType::Cross => ffi::JOIN_CROSS,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            ffi::JOIN_INNER => Some(JoinType::Inner),
            ffi::JOIN_LEFT => Some(JoinType::Left),
            ffi::JOIN_OUTER => Some(JoinType::Outer),
            ffi::JOIN_CROSS => Some(JoinType::Cross),
            _ => None,
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Outer => "outer",
            JoinType::Cross => "cross",
        })
    }
}

// ---------------------------------------------------------------------------
// JoinSpec
// ---------------------------------------------------------------------------

/// Resolved join parameters: key pairs, join type, suffix and coalesce policy.
///
/// `left_on[i]` is matched against `right_on[i]`. When coalescing, each key
/// pair becomes one output column named after the left key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub left_on: Vec<String>,
    pub right_on: Vec<String>,
    pub how: JoinType,
    pub suffix: String,
    pub coalesce: bool,
}

impl Default for JoinSpec {
    fn default() -> Self {
        JoinSpec {
            left_on: Vec::new(),
            right_on: Vec::new(),
            how: JoinType::Inner,
            suffix: DEFAULT_JOIN_SUFFIX.to_owned(),
            coalesce: true,
        }
    }
}

impl JoinSpec {
    /// Same key names on both sides.
    pub fn on(keys: impl KeyList) -> Self {
        let keys = keys.into_keys();
        JoinSpec {
            right_on: keys.clone(),
            left_on: keys,
            ..JoinSpec::default()
        }
    }

    /// Left-hand keys; the right side uses the same names until
    /// [`JoinSpec::right_on`] overrides them.
    pub fn left_on(keys: impl KeyList) -> Self {
        JoinSpec::on(keys)
    }

    pub fn right_on(mut self, keys: impl KeyList) -> Self {
        self.right_on = keys.into_keys();
        self
    }

    pub fn cross() -> Self {
        JoinSpec {
            how: JoinType::Cross,
            ..JoinSpec::default()
        }
    }

    pub fn with_type(mut self, how: JoinType) -> Self {
        self.how = how;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_coalesce(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }

    /// Check key pairing. Cross joins take no keys; every other type needs
    /// at least one key and equal key counts on both sides.
    pub fn validate(&self) -> Result<()> {
        if self.left_on.len() != self.right_on.len() {
            return Err(Error::KeyMismatch {
                left: self.left_on.len(),
                right: self.right_on.len(),
            });
        }
        match self.how {
            JoinType::Cross if !self.left_on.is_empty() => Err(Error::InvalidInput(
                "join: cross join does not take keys".to_owned(),
            )),
            JoinType::Cross => Ok(()),
            _ if self.left_on.is_empty() => Err(Error::InvalidInput(format!(
                "join: {} join requires at least one key",
                self.how
            ))),
            _ => Ok(()),
        }
    }

    /// Key pairs as (left, right).
    pub fn key_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.left_on
            .iter()
            .map(String::as_str)
            .zip(self.right_on.iter().map(String::as_str))
    }
}
