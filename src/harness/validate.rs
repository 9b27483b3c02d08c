//! Result extraction and contract validation
//!
//! A contract names a global, an attribute path into it and the exact key set the mapping at the end of that path
//! must have. Comparison is set equality: order and values are ignored, and both missing and unexpected keys fail.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::errors::HarnessError;
use crate::runtime::Interpreter;
use crate::runtime::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub name: String,
    /// Attributes walked from the binding, e.g. `["history"]`
    pub path: Vec<String>,
    pub keys: BTreeSet<String>,
}

impl Contract {
    pub fn new<I, S>(name: impl Into<String>, path: &[&str], keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            path: path.iter().map(|p| p.to_string()).collect(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// `name.attr.attr`, as written on the command line.
    pub fn target(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.path.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        write!(f, "{}={}", self.target(), keys.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid contract '{input}': {reason}")]
pub struct ContractParseError {
    pub input: String,
    pub reason: &'static str,
}

/// `NAME[.ATTR...]=KEY[,KEY...]`
impl FromStr for Contract {
    type Err = ContractParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ContractParseError {
            input: s.to_string(),
            reason,
        };
        let (target, keys) = s.split_once('=').ok_or_else(|| fail("expected NAME.PATH=KEY,KEY"))?;
        let mut segments = target.trim().split('.');
        let name = segments.next().unwrap_or_default();
        let path: Vec<String> = segments.map(str::to_string).collect();
        if name.is_empty() || path.iter().any(String::is_empty) {
            return Err(fail("empty name or attribute"));
        }
        let keys: BTreeSet<String> = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self {
            name: name.to_string(),
            path,
            keys,
        })
    }
}

/// Look up a global binding.
pub fn extract(interp: &Interpreter, name: &str) -> Result<Value, HarnessError> {
    interp.global(name).ok_or_else(|| HarnessError::NameNotFound {
        name: name.to_string(),
        known: interp.global_names(),
    })
}

/// Walk the contract path from `value` and compare the mapping's keys.
pub fn validate(interp: &Interpreter, value: &Value, contract: &Contract) -> Result<(), HarnessError> {
    let mut current = value.clone();
    let mut walked = contract.name.clone();
    for attr in &contract.path {
        current = interp.get_attr(&current, attr).map_err(|_| HarnessError::ContractShape {
            name: walked.clone(),
            found: format!("{} without attribute '{attr}'", current.type_name()),
        })?;
        walked = format!("{walked}.{attr}");
    }

    let Value::Dict(map) = &current else {
        return Err(HarnessError::ContractShape {
            name: walked,
            found: current.type_name(),
        });
    };
    let actual: BTreeSet<String> = map.borrow().keys().map(|k| k.to_value().to_display()).collect();

    let missing: Vec<String> = contract.keys.difference(&actual).cloned().collect();
    let extra: Vec<String> = actual.difference(&contract.keys).cloned().collect();
    if missing.is_empty() && extra.is_empty() {
        tracing::info!(binding = %walked, keys = actual.len(), "contract satisfied");
        return Ok(());
    }
    tracing::info!(binding = %walked, ?missing, ?extra, "contract mismatch");
    Err(HarnessError::ContractMismatch {
        name: walked,
        missing,
        extra,
    })
}

/// Unified-style listing of a key mismatch: `-` expected but absent, `+` present but unexpected.
pub fn render_diff(missing: &[String], extra: &[String]) -> String {
    let mut lines: Vec<String> = missing.iter().map(|k| format!("- {k}")).collect();
    lines.extend(extra.iter().map(|k| format!("+ {k}")));
    lines.join("\n")
}
