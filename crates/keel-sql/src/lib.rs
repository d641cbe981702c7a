//! Identifier and literal encoding for PostgreSQL DDL.
//!
//! Everything keel writes into a script goes through this crate: table and
//! column names through [`quote_identifier`], string literals through
//! [`escape_string_literal`], and column defaults through
//! [`classify_default`] to decide whether they are emitted raw or quoted.

mod default;
pub use default::*;

/// PostgreSQL reserved keywords that cannot be used as bare identifiers.
///
/// Matched case-insensitively. Non-reserved keywords (`name`, `type`, ...) are
/// fine as column names and are not listed.
const RESERVED_KEYWORDS: &[&str] = &[
    "all",
    "analyse",
    "analyze",
    "and",
    "any",
    "array",
    "as",
    "asc",
    "asymmetric",
    "authorization",
    "binary",
    "both",
    "case",
    "cast",
    "check",
    "collate",
    "collation",
    "column",
    "concurrently",
    "constraint",
    "create",
    "cross",
    "current_catalog",
    "current_date",
    "current_role",
    "current_schema",
    "current_time",
    "current_timestamp",
    "current_user",
    "default",
    "deferrable",
    "desc",
    "distinct",
    "do",
    "else",
    "end",
    "except",
    "false",
    "fetch",
    "for",
    "foreign",
    "freeze",
    "from",
    "full",
    "grant",
    "group",
    "having",
    "ilike",
    "in",
    "initially",
    "inner",
    "intersect",
    "into",
    "is",
    "isnull",
    "join",
    "lateral",
    "leading",
    "left",
    "like",
    "limit",
    "localtime",
    "localtimestamp",
    "natural",
    "not",
    "notnull",
    "null",
    "offset",
    "on",
    "only",
    "or",
    "order",
    "outer",
    "overlaps",
    "placing",
    "primary",
    "references",
    "returning",
    "right",
    "select",
    "session_user",
    "similar",
    "some",
    "symmetric",
    "system_user",
    "table",
    "tablesample",
    "then",
    "to",
    "trailing",
    "true",
    "union",
    "unique",
    "user",
    "using",
    "variadic",
    "verbose",
    "when",
    "where",
    "window",
    "with",
];

/// Returns true if `name` is a reserved keyword (case-insensitive).
pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(name))
}

/// Returns true if `name` must be double-quoted to be used as an identifier.
pub fn needs_quoting(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return true;
    };
    first.is_ascii_digit()
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        || is_reserved_keyword(name)
}

/// A PostgreSQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use keel_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// A PostgreSQL identifier wrapper.
///
/// Display writes the value bare when that is safe, and double-quoted (with
/// embedded quotes doubled) when it is a reserved keyword, contains anything
/// outside `[A-Za-z0-9_]`, or starts with a digit.
///
/// # Example
/// ```
/// use keel_sql::Ident;
/// assert_eq!(format!("{}", Ident("users")), "users");
/// assert_eq!(format!("{}", Ident("user")), "\"user\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.0.as_ref();
        if !needs_quoting(name) {
            return write!(f, "{}", name);
        }
        write!(f, "\"")?;
        for c in name.chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Quote a PostgreSQL identifier if it needs quoting.
pub fn quote_identifier(name: &str) -> String {
    format!("{}", Ident(name))
}

/// The name PostgreSQL stores for `name` once it has been through
/// [`quote_identifier`].
///
/// Bare identifiers are folded to lowercase by the server; quoted ones are
/// kept verbatim.
///
/// # Examples
///
/// ```
/// assert_eq!(keel_sql::folded_identifier("BlogPost"), "blogpost");
/// assert_eq!(keel_sql::folded_identifier("Order"), "Order");
/// assert_eq!(keel_sql::folded_identifier("my-Table"), "my-Table");
/// ```
pub fn folded_identifier(name: &str) -> String {
    if needs_quoting(name) {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}

/// Escape a string literal for SQL: doubles single quotes and wraps the result
/// in single quotes.
pub fn escape_string_literal(value: &str) -> String {
    format!("{}", Lit(value))
}

/// Inverse of [`escape_string_literal`].
///
/// Returns `None` if `literal` is not a single-quoted string with every inner
/// quote doubled.
pub fn unescape_string_literal(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.next() != Some('\'') {
                return None;
            }
        }
        out.push(c);
    }
    Some(out)
}

/// Name of the foreign-key constraint keel creates for `table.column`.
///
/// # Examples
///
/// ```
/// assert_eq!(keel_sql::foreign_key_name("post", "author_id"), "fk_post_author_id");
/// ```
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}
