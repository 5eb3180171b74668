// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build variables: typed key/value pairs with `$VAR` expansion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One build variable.
///
/// `public` variables may be shown in the job log; `internal` marks values
/// injected by the agent itself rather than received from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub internal: bool,
}

impl Variable {
    /// Create a server-provided variable.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into(), public: false, internal: false }
    }

    /// Create an agent-injected variable (public and internal).
    pub fn internal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into(), public: true, internal: true }
    }

    /// Parse a `KEY=VALUE` entry, e.g. from a runner's `environment` list.
    ///
    /// Returns `None` when the entry has no `=` or an empty key.
    pub fn from_entry(entry: &str) -> Option<Self> {
        let (key, value) = entry.split_once('=')?;
        if key.is_empty() {
            return None;
        }
        Some(Self { key: key.to_string(), value: value.to_string(), public: true, internal: true })
    }
}

/// An ordered list of build variables.
///
/// Later entries shadow earlier ones during lookup and expansion, which is
/// how job variables override runner defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(Vec<Variable>);

impl Variables {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, var: Variable) {
        self.0.push(var);
    }

    pub fn extend(&mut self, other: Variables) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a variable value; the last entry with the key wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().rev().find(|v| v.key == key).map(|v| v.value.as_str())
    }

    /// Expand `$KEY` and `${KEY}` references in every value.
    ///
    /// References resolve against the unexpanded values of the whole list
    /// (last entry wins); unknown keys expand to the empty string.
    pub fn expand(&self) -> Variables {
        let lookup: HashMap<&str, &str> =
            self.0.iter().map(|v| (v.key.as_str(), v.value.as_str())).collect();
        Variables(
            self.0
                .iter()
                .map(|v| Variable { value: expand_value(&v.value, &lookup), ..v.clone() })
                .collect(),
        )
    }
}

impl From<Vec<Variable>> for Variables {
    fn from(vars: Vec<Variable>) -> Self {
        Self(vars)
    }
}

impl IntoIterator for Variables {
    type Item = Variable;
    type IntoIter = std::vec::IntoIter<Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Variable> for Variables {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Substitute `$KEY` / `${KEY}` in a single value. A literal `$$` yields `$`.
fn expand_value(value: &str, lookup: &HashMap<&str, &str>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '$')) => {
                chars.next();
                out.push('$');
            }
            Some((_, '{')) => {
                chars.next();
                let mut key = String::new();
                for (_, k) in chars.by_ref() {
                    if k == '}' {
                        break;
                    }
                    key.push(k);
                }
                out.push_str(lookup.get(key.as_str()).copied().unwrap_or(""));
            }
            Some((_, k)) if is_key_char(*k) => {
                let mut key = String::new();
                while let Some((_, k)) = chars.peek() {
                    if !is_key_char(*k) {
                        break;
                    }
                    key.push(*k);
                    chars.next();
                }
                out.push_str(lookup.get(key.as_str()).copied().unwrap_or(""));
            }
            _ => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
#[path = "variables_tests.rs"]
mod tests;
