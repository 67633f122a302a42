//! Request matching logic.
//!
//! Evaluates lookup payloads against stub input rules. Candidates are tried in
//! registration order and the first match wins; a more specific stub
//! registered later never overrides an earlier general one.

use crate::config::Payload;
use crate::stub::{InputRule, Pattern, Stub};
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// Result of matching a payload against candidate stubs.
#[derive(Debug)]
pub struct MatchResult<'a> {
    /// The matched stub
    pub stub: &'a Stub,
    /// Position of the stub among the candidates
    pub index: usize,
}

/// Find the first candidate whose input rule accepts `data`.
pub fn find_match<'a>(candidates: &'a [Arc<Stub>], data: &Payload) -> Option<MatchResult<'a>> {
    candidates.iter().enumerate().find_map(|(index, stub)| {
        let matched = stub.input.is_satisfied_by(data);
        debug!(
            index,
            strategy = stub.input.kind(),
            matched,
            "Evaluated stub candidate"
        );
        matched.then_some(MatchResult {
            stub: stub.as_ref(),
            index,
        })
    })
}

/// The candidate that came nearest to matching `data`.
///
/// Ranks by the number of rule fields `data` satisfies; ties go to the earlier
/// candidate. Only used to explain a miss.
pub fn closest_match<'a>(candidates: &'a [Arc<Stub>], data: &Payload) -> Option<&'a Stub> {
    let mut best: Option<(&'a Stub, usize)> = None;
    for stub in candidates {
        let rank = stub.input.rank(data);
        if best.map_or(true, |(_, best_rank)| rank > best_rank) {
            best = Some((stub.as_ref(), rank));
        }
    }
    best.map(|(stub, _)| stub)
}

impl InputRule {
    /// Whether `data` satisfies this rule.
    pub fn is_satisfied_by(&self, data: &Payload) -> bool {
        match self {
            InputRule::Equals(expected) => payloads_equal(expected, data),
            InputRule::Contains(expected) => payload_contains(data, expected),
            InputRule::Matches(patterns) => patterns.iter().all(|(field, pattern)| {
                data.get(field)
                    .map(|actual| pattern.is_match(actual))
                    .unwrap_or(false)
            }),
        }
    }

    /// Number of rule fields satisfied by `data`.
    fn rank(&self, data: &Payload) -> usize {
        match self {
            InputRule::Equals(expected) | InputRule::Contains(expected) => expected
                .iter()
                .filter(|(key, value)| {
                    data.get(*key)
                        .map(|actual| values_equal(value, actual))
                        .unwrap_or(false)
                })
                .count(),
            InputRule::Matches(patterns) => patterns
                .iter()
                .filter(|(field, pattern)| {
                    data.get(*field)
                        .map(|actual| pattern.is_match(actual))
                        .unwrap_or(false)
                })
                .count(),
        }
    }
}

impl Pattern {
    /// Whether `actual` satisfies this pattern.
    pub fn is_match(&self, actual: &Value) -> bool {
        match self {
            Pattern::Regex(regex) => regex.is_match(&value_as_string(actual)),
            Pattern::Literal(expected) => values_equal(expected, actual),
        }
    }
}

/// Structural equality over nested values.
///
/// Numbers compare by value, so `1` equals `1.0`, but `9007199254740993` does
/// not equal `9007199254740992.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => payloads_equal(a, b),
        _ => false,
    }
}

/// Integers compare exactly, including against an integral float; only two
/// floats fall back to `f64` comparison.
fn numbers_equal(a: &Number, b: &Number) -> bool {
    match (as_integer(a), as_integer(b)) {
        (Some(a), Some(b)) => a == b,
        (Some(i), None) => b.as_f64().is_some_and(|f| float_equals_integer(f, i)),
        (None, Some(i)) => a.as_f64().is_some_and(|f| float_equals_integer(f, i)),
        (None, None) => matches!((a.as_f64(), b.as_f64()), (Some(a), Some(b)) if a == b),
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

// Every JSON integer fits in i128, and a saturated cast lands outside that range.
fn float_equals_integer(f: f64, i: i128) -> bool {
    f.is_finite() && f.fract() == 0.0 && f as i128 == i
}

/// Same key set, equal values.
fn payloads_equal(a: &Payload, b: &Payload) -> bool {
    a.len() == b.len() && payload_contains(b, a)
}

/// Every entry of `expected` is present in `data` with an equal value.
fn payload_contains(data: &Payload, expected: &Payload) -> bool {
    expected.iter().all(|(key, value)| {
        data.get(key)
            .map(|actual| values_equal(value, actual))
            .unwrap_or(false)
    })
}

/// String form a pattern is matched against.
fn value_as_string(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}
