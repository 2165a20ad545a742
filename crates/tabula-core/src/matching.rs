//! Equality rules for comparing a reviewed value against the AI value.
//!
//! # Rules
//!
//! - Null and the empty string are the same "no value".
//! - Otherwise values are compared exactly: case-sensitive, whitespace
//!   significant. "Acme Ltd" and "acme ltd" are different answers, and so
//!   are "Acme" and "Acme ".

/// Collapse null and empty to `None`; every other value passes through untouched.
pub fn normalize_value(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Whether a final value counts as agreeing with the AI value.
pub fn values_match(final_value: Option<&str>, ai_value: Option<&str>) -> bool {
    normalize_value(final_value) == normalize_value(ai_value)
}
