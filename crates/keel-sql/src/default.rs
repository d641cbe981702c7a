//! Column default classification.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A[A-Za-z0-9_]+\(.*\)\z").expect("valid regex"));

/// How a column default should be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    /// A SQL function call such as `now()`, emitted as-is.
    FunctionCall,
    /// Any other value, emitted as an escaped string literal.
    Literal,
}

impl DefaultKind {
    pub fn is_function_call(self) -> bool {
        self == DefaultKind::FunctionCall
    }
}

/// Classify a default value.
///
/// Only strings can be function calls; numbers, booleans, `null` and
/// structured values are always literals.
///
/// ```
/// use keel_sql::{DefaultKind, classify_default};
/// use serde_json::json;
///
/// assert_eq!(classify_default(&json!("now()")), DefaultKind::FunctionCall);
/// assert_eq!(classify_default(&json!(123)), DefaultKind::Literal);
/// ```
pub fn classify_default(value: &Value) -> DefaultKind {
    match value {
        Value::String(s) => classify_default_expr(s),
        _ => DefaultKind::Literal,
    }
}

/// Classify a default expression given as a string.
///
/// A function call is `identifier-chars '(' anything ')'`, matched against the
/// whole string.
pub fn classify_default_expr(expr: &str) -> DefaultKind {
    if FUNCTION_CALL.is_match(expr) {
        DefaultKind::FunctionCall
    } else {
        DefaultKind::Literal
    }
}
