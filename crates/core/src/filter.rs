//! Compiled customer filters.
//!
//! A `CustomerFilter` is the pure-data output of rule tree compilation: the
//! store executes it as a single set-membership query. Keeping it as a value
//! (rather than a closure) lets stores translate it to their native query
//! language; the in-memory store evaluates it with [`CustomerFilter::matches`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::Customer;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerFilter {
    /// The degenerate empty-AND query: matches the whole population.
    MatchAll,
    /// Matches no customer. Produced by an OR group whose children all
    /// collapsed to empty fragments.
    MatchNone,
    And(Vec<CustomerFilter>),
    Or(Vec<CustomerFilter>),
    Compare {
        field: String,
        op: CompareOp,
        value: serde_json::Value,
    },
    /// Case-insensitive substring match (or its negation) on a string field.
    ContainsCi {
        field: String,
        needle: String,
        negate: bool,
    },
    /// `lastActivity` strictly before the threshold (INACTIVE_DAYS).
    LastActivityBefore(DateTime<Utc>),
    /// `lastActivity` at or after the threshold (ACTIVE_DAYS).
    LastActivitySince(DateTime<Utc>),
}

impl CustomerFilter {
    pub fn matches(&self, customer: &Customer) -> bool {
        match self {
            CustomerFilter::MatchAll => true,
            CustomerFilter::MatchNone => false,
            CustomerFilter::And(children) => children.iter().all(|f| f.matches(customer)),
            CustomerFilter::Or(children) => children.iter().any(|f| f.matches(customer)),
            CustomerFilter::Compare { field, op, value } => customer
                .attribute(field)
                .map_or(false, |attr| compare_values(&attr, *op, value)),
            CustomerFilter::ContainsCi { field, needle, negate } => {
                let contained = customer
                    .attribute(field)
                    .and_then(|attr| attr.as_str().map(|s| s.to_lowercase().contains(&needle.to_lowercase())))
                    .unwrap_or(false);
                contained != *negate
            }
            CustomerFilter::LastActivityBefore(threshold) => customer.last_activity < *threshold,
            CustomerFilter::LastActivitySince(threshold) => customer.last_activity >= *threshold,
        }
    }
}

fn compare_values(actual: &serde_json::Value, op: CompareOp, expected: &serde_json::Value) -> bool {
    match op {
        CompareOp::Eq => actual == expected,
        CompareOp::Ne => actual != expected,
        CompareOp::Gt => ordered_cmp(actual, expected).map_or(false, |o| o == Ordering::Greater),
        CompareOp::Gte => ordered_cmp(actual, expected).map_or(false, |o| o != Ordering::Less),
        CompareOp::Lt => ordered_cmp(actual, expected).map_or(false, |o| o == Ordering::Less),
        CompareOp::Lte => ordered_cmp(actual, expected).map_or(false, |o| o != Ordering::Greater),
    }
}

/// Ordering comparison over numbers, or over RFC 3339 timestamps when both
/// sides parse as dates. Mismatched types order as incomparable (no match).
fn ordered_cmp(a: &serde_json::Value, b: &serde_json::Value) -> Option<Ordering> {
    if let (Some(a_num), Some(b_num)) = (a.as_f64(), b.as_f64()) {
        return a_num.partial_cmp(&b_num);
    }
    let a_ts = a.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok())?;
    let b_ts = b.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok())?;
    Some(a_ts.cmp(&b_ts))
}
