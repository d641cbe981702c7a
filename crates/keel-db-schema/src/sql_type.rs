//! Column types and type inference.
//!
//! A property's static type maps to a column type through [`ColumnType`].
//! When the static type says nothing useful ([`TypeHint::Opaque`]), inference
//! falls back to a runtime sample value and then to the property name. The
//! last two steps are best-effort.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A PostgreSQL column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlType {
    /// `text`
    Text,
    /// `double precision`
    DoublePrecision,
    /// `boolean`
    Boolean,
    /// `timestamp with time zone`
    Timestamptz,
    /// `jsonb`
    Jsonb,
    /// Any other type, spelled as given (e.g. `uuid`, `integer`, `varchar(64)`)
    Other(String),
}

impl SqlType {
    /// Parse a type name, recognizing the built-in variants under their
    /// common aliases.
    pub fn parse(name: &str) -> Self {
        match normalize_type_name(name).as_str() {
            "text" => SqlType::Text,
            "double precision" => SqlType::DoublePrecision,
            "boolean" => SqlType::Boolean,
            "timestamp with time zone" => SqlType::Timestamptz,
            "jsonb" => SqlType::Jsonb,
            _ => SqlType::Other(name.trim().to_string()),
        }
    }

    pub fn is_jsonb(&self) -> bool {
        matches!(self, SqlType::Jsonb)
    }

    /// Whether this declared type matches a type reported by the catalog.
    ///
    /// Comparison is case-insensitive and ignores alias spellings and type
    /// modifiers, since `information_schema.columns.data_type` reports
    /// neither.
    pub fn matches(&self, introspected: &str) -> bool {
        normalize_type_name(&self.to_string()) == normalize_type_name(introspected)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Text => write!(f, "text"),
            SqlType::DoublePrecision => write!(f, "double precision"),
            SqlType::Boolean => write!(f, "boolean"),
            SqlType::Timestamptz => write!(f, "timestamp with time zone"),
            SqlType::Jsonb => write!(f, "jsonb"),
            SqlType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Canonical spelling of a type name for comparison.
///
/// ```
/// use keel_db_schema::sql_type::normalize_type_name;
/// assert_eq!(normalize_type_name("TIMESTAMPTZ"), "timestamp with time zone");
/// assert_eq!(normalize_type_name("varchar(255)"), "character varying");
/// assert_eq!(normalize_type_name("int4"), "integer");
/// ```
pub fn normalize_type_name(name: &str) -> String {
    let lowered = name.trim().to_ascii_lowercase();
    if lowered.ends_with("[]") {
        return "array".to_string();
    }

    // Drop type modifiers: `numeric(10, 2)` -> `numeric`, `vector(3)` -> `vector`.
    let mut base = String::with_capacity(lowered.len());
    let mut depth = 0usize;
    for c in lowered.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 => base.push(c),
            _ => {}
        }
    }
    let base = base.split_whitespace().collect::<Vec<_>>().join(" ");

    let canonical = match base.as_str() {
        "int" | "int4" | "serial" | "serial4" => "integer",
        "int8" | "bigserial" | "serial8" => "bigint",
        "int2" | "smallserial" | "serial2" => "smallint",
        "float8" | "double" => "double precision",
        "float4" => "real",
        "bool" => "boolean",
        "timestamptz" => "timestamp with time zone",
        "timestamp" => "timestamp without time zone",
        "timetz" => "time with time zone",
        "time" => "time without time zone",
        "varchar" => "character varying",
        "char" | "bpchar" => "character",
        "decimal" => "numeric",
        other => other,
    };
    canonical.to_string()
}

/// What a property's static type says about its column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Text,
    Numeric,
    Boolean,
    DateTime,
    /// Arrays, maps, and arbitrary JSON
    Json,
    /// Nothing can be inferred from the static type
    Opaque,
}

impl TypeHint {
    pub fn sql_type(self) -> Option<SqlType> {
        match self {
            TypeHint::Text => Some(SqlType::Text),
            TypeHint::Numeric => Some(SqlType::DoublePrecision),
            TypeHint::Boolean => Some(SqlType::Boolean),
            TypeHint::DateTime => Some(SqlType::Timestamptz),
            TypeHint::Json => Some(SqlType::Jsonb),
            TypeHint::Opaque => None,
        }
    }
}

/// Resolve a column type: static hint first, then the sample value, then the
/// property name.
pub fn resolve_sql_type(hint: TypeHint, sample: Option<&Value>, property: &str) -> SqlType {
    hint.sql_type()
        .or_else(|| sample.and_then(sql_type_from_sample))
        .unwrap_or_else(|| sql_type_from_name(property))
}

/// Infer a column type from a runtime value.
///
/// Returns `None` for `null`, which carries no type information.
pub fn sql_type_from_sample(value: &Value) -> Option<SqlType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(SqlType::Boolean),
        Value::Number(_) => Some(SqlType::DoublePrecision),
        Value::String(s) if chrono::DateTime::parse_from_rfc3339(s).is_ok() => {
            Some(SqlType::Timestamptz)
        }
        Value::String(_) => Some(SqlType::Text),
        Value::Array(_) | Value::Object(_) => Some(SqlType::Jsonb),
    }
}

/// Guess a column type from a property name. Defaults to `text`.
///
/// Best-effort. `date`, `time`, `price`, `amount`, `number`, `enable` and
/// `disable` match anywhere in the name, but `is` and `has` only match as a
/// prefix: as substrings they would turn names like `this_item`, `analysis`
/// or `chassis` into booleans.
pub fn sql_type_from_name(property: &str) -> SqlType {
    let name = property.to_ascii_lowercase();
    if name.contains("date") || name.contains("time") {
        SqlType::Timestamptz
    } else if ["price", "amount", "number"].iter().any(|w| name.contains(w)) {
        SqlType::DoublePrecision
    } else if name.starts_with("is")
        || name.starts_with("has")
        || name.contains("enable")
        || name.contains("disable")
    {
        SqlType::Boolean
    } else {
        SqlType::Text
    }
}

/// Static type information for a property type.
///
/// Implement this with `HINT = TypeHint::Opaque` for application types that
/// do not map to a single column type.
pub trait ColumnType {
    const HINT: TypeHint;
    const NULLABLE: bool = false;
}

impl<T: ColumnType> ColumnType for Option<T> {
    const HINT: TypeHint = T::HINT;
    const NULLABLE: bool = true;
}

macro_rules! column_type {
    ($hint:ident: $($ty:ty),* $(,)?) => {
        $(impl ColumnType for $ty {
            const HINT: TypeHint = TypeHint::$hint;
        })*
    };
}

column_type!(Text: String, &str, char, Box<str>, std::borrow::Cow<'_, str>);
column_type!(Numeric: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
column_type!(Numeric: rust_decimal::Decimal);
column_type!(Boolean: bool);
column_type!(DateTime: std::time::SystemTime, chrono::NaiveDateTime, chrono::NaiveDate);
column_type!(DateTime: jiff::Timestamp, jiff::Zoned, jiff::civil::Date, jiff::civil::DateTime);
column_type!(Json: Value);

impl<Tz: chrono::TimeZone> ColumnType for chrono::DateTime<Tz> {
    const HINT: TypeHint = TypeHint::DateTime;
}

impl<T> ColumnType for Vec<T> {
    const HINT: TypeHint = TypeHint::Json;
}

impl<T> ColumnType for [T] {
    const HINT: TypeHint = TypeHint::Json;
}

impl<K, V, S> ColumnType for HashMap<K, V, S> {
    const HINT: TypeHint = TypeHint::Json;
}

impl<K, V> ColumnType for BTreeMap<K, V> {
    const HINT: TypeHint = TypeHint::Json;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hint_of<T: ColumnType + ?Sized>() -> (TypeHint, bool) {
        (T::HINT, T::NULLABLE)
    }

    #[test]
    fn static_types_map_to_column_types() {
        assert_eq!(hint_of::<String>(), (TypeHint::Text, false));
        assert_eq!(hint_of::<f64>(), (TypeHint::Numeric, false));
        assert_eq!(hint_of::<i32>(), (TypeHint::Numeric, false));
        assert_eq!(hint_of::<bool>(), (TypeHint::Boolean, false));
        assert_eq!(
            hint_of::<chrono::DateTime<chrono::Utc>>(),
            (TypeHint::DateTime, false)
        );
        assert_eq!(hint_of::<jiff::Timestamp>(), (TypeHint::DateTime, false));
        assert_eq!(hint_of::<Vec<String>>(), (TypeHint::Json, false));
        assert_eq!(hint_of::<HashMap<String, i64>>(), (TypeHint::Json, false));
        assert_eq!(hint_of::<Value>(), (TypeHint::Json, false));
        assert_eq!(hint_of::<Option<String>>(), (TypeHint::Text, true));
    }

    #[test]
    fn sql_type_display_uses_postgres_spelling() {
        assert_eq!(SqlType::Text.to_string(), "text");
        assert_eq!(SqlType::DoublePrecision.to_string(), "double precision");
        assert_eq!(SqlType::Boolean.to_string(), "boolean");
        assert_eq!(SqlType::Timestamptz.to_string(), "timestamp with time zone");
        assert_eq!(SqlType::Jsonb.to_string(), "jsonb");
        assert_eq!(SqlType::Other("uuid".into()).to_string(), "uuid");
    }

    #[test]
    fn parse_recognizes_aliases() {
        assert_eq!(SqlType::parse("TEXT"), SqlType::Text);
        assert_eq!(SqlType::parse("float8"), SqlType::DoublePrecision);
        assert_eq!(SqlType::parse("bool"), SqlType::Boolean);
        assert_eq!(SqlType::parse("timestamptz"), SqlType::Timestamptz);
        assert_eq!(SqlType::parse("uuid"), SqlType::Other("uuid".into()));
    }

    #[test]
    fn matches_is_case_and_alias_insensitive() {
        assert!(SqlType::Text.matches("TEXT"));
        assert!(SqlType::Timestamptz.matches("timestamp with time zone"));
        assert!(SqlType::Other("INT4".into()).matches("integer"));
        assert!(SqlType::Other("varchar(64)".into()).matches("character varying"));
        assert!(SqlType::Other("numeric(10,2)".into()).matches("numeric"));
        assert!(SqlType::Other("text[]".into()).matches("ARRAY"));
        assert!(!SqlType::Text.matches("integer"));
        assert!(!SqlType::Timestamptz.matches("timestamp without time zone"));
    }

    #[test]
    fn static_hint_wins_over_sample_and_name() {
        let ty = resolve_sql_type(TypeHint::Text, Some(&json!(12)), "price");
        assert_eq!(ty, SqlType::Text);
    }

    // Best-effort: the sample and name layers are heuristics, not contracts.
    #[test]
    fn opaque_types_fall_back_to_sample_value() {
        let resolve = |v: Value| resolve_sql_type(TypeHint::Opaque, Some(&v), "field");
        assert_eq!(resolve(json!("hello")), SqlType::Text);
        assert_eq!(resolve(json!("2024-01-02T03:04:05Z")), SqlType::Timestamptz);
        assert_eq!(resolve(json!(1.5)), SqlType::DoublePrecision);
        assert_eq!(resolve(json!(false)), SqlType::Boolean);
        assert_eq!(resolve(json!([1, 2])), SqlType::Jsonb);
        assert_eq!(resolve(json!({"a": 1})), SqlType::Jsonb);
    }

    // Best-effort, see above.
    #[test]
    fn opaque_types_without_sample_fall_back_to_name() {
        let resolve = |name: &str| resolve_sql_type(TypeHint::Opaque, Some(&Value::Null), name);
        assert_eq!(resolve("createdDate"), SqlType::Timestamptz);
        assert_eq!(resolve("updated_time"), SqlType::Timestamptz);
        assert_eq!(resolve("unitPrice"), SqlType::DoublePrecision);
        assert_eq!(resolve("total_amount"), SqlType::DoublePrecision);
        assert_eq!(resolve("isActive"), SqlType::Boolean);
        assert_eq!(resolve("hasAvatar"), SqlType::Boolean);
        assert_eq!(resolve("notifications_enabled"), SqlType::Boolean);
        assert_eq!(resolve("nickname"), SqlType::Text);
    }

    // Best-effort, see above.
    #[test]
    fn is_and_has_only_match_as_prefix() {
        assert_eq!(sql_type_from_name("this_item"), SqlType::Text);
        assert_eq!(sql_type_from_name("analysis"), SqlType::Text);
        assert_eq!(sql_type_from_name("chassis"), SqlType::Text);
        assert_eq!(sql_type_from_name("is_public"), SqlType::Boolean);
        assert_eq!(sql_type_from_name("autoDisabled"), SqlType::Boolean);
    }
}
