//! Column values and the traits leaf fields implement.
//!
//! Every argument produced by the projector or the condition compiler is a [`Value`].
//! Leaf fields of a record expose themselves through [`Column`] (object safe, read per
//! instance) and [`ColumnType`] (per type, read once when a type index is built).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A dynamically typed column value or query argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Explicit SQL NULL.
    Null,
    /// Let the store apply the column default. Never the same thing as `Null`.
    Default,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Decimal integer literal for types wider than `i64`, bound as NUMERIC.
    Numeric(String),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(JsonValue),
    Array(Vec<Value>),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        matches!(self, Value::Default)
    }

    /// Converts a JSON document into a value: scalars map to their SQL counterparts,
    /// arrays and objects stay JSON.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or_else(|| Value::Json(json.clone())),
            },
            JsonValue::String(s) => Value::Text(s.clone()),
            other => Value::Json(other.clone()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    DateTime<Utc> => Timestamp,
    Uuid => Uuid,
    JsonValue => Json,
}

macro_rules! numeric_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Value::Numeric(v.to_string())
                }
            }
        )*
    };
}

numeric_from!(u64, usize, i128, u128);

impl From<&str> for Value {
    #[inline]
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

/// How a field decides whether it holds an "empty" value. Resolved once per field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroCheck {
    /// The value type reports its own emptiness through [`Column::is_zero`].
    Custom,
    /// Sequence types are empty when their length is zero.
    Length,
    /// Compare against [`ColumnType::zero_value`].
    Equality,
}

/// Instance-level view of a leaf field.
pub trait Column {
    fn to_value(&self) -> Value;

    /// True for an empty optional. Absent fields never reach the zero check.
    fn is_absent(&self) -> bool {
        false
    }

    /// Consulted only when the type declares [`ZeroCheck::Custom`].
    fn is_zero(&self) -> bool {
        false
    }

    /// Consulted only when the type declares [`ZeroCheck::Length`].
    fn len(&self) -> usize {
        0
    }
}

/// Type-level facts about a leaf field, captured into the type index.
pub trait ColumnType: Column {
    const ZERO_CHECK: ZeroCheck = ZeroCheck::Equality;
    const NULLABLE: bool = false;

    fn zero_value() -> Value;
}

macro_rules! scalar_column {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl Column for $ty {
                #[inline]
                fn to_value(&self) -> Value {
                    Value::from(self.clone())
                }
            }

            impl ColumnType for $ty {
                fn zero_value() -> Value {
                    Value::from($zero)
                }
            }
        )*
    };
}

scalar_column! {
    bool => false,
    i8 => 0i8,
    i16 => 0i16,
    i32 => 0i32,
    i64 => 0i64,
    u8 => 0u8,
    u16 => 0u16,
    u32 => 0u32,
    f32 => 0f32,
    f64 => 0f64,
    String => String::new(),
    Uuid => Uuid::nil(),
}

// Wide integers report their own emptiness so zero is found without parsing the literal.
macro_rules! numeric_column {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Column for $ty {
                #[inline]
                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                #[inline]
                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }

            impl ColumnType for $ty {
                const ZERO_CHECK: ZeroCheck = ZeroCheck::Custom;

                fn zero_value() -> Value {
                    Value::Numeric("0".to_string())
                }
            }
        )*
    };
}

numeric_column!(u64, usize, i128, u128);

impl Column for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn is_zero(&self) -> bool {
        *self == DateTime::<Utc>::default()
    }
}

impl ColumnType for DateTime<Utc> {
    const ZERO_CHECK: ZeroCheck = ZeroCheck::Custom;

    fn zero_value() -> Value {
        Value::Timestamp(DateTime::<Utc>::default())
    }
}

impl Column for JsonValue {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl ColumnType for JsonValue {
    fn zero_value() -> Value {
        Value::Json(JsonValue::Null)
    }
}

impl<T: Column> Column for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Column::to_value).collect())
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

impl<T: Column> ColumnType for Vec<T> {
    const ZERO_CHECK: ZeroCheck = ZeroCheck::Length;

    fn zero_value() -> Value {
        Value::Array(Vec::new())
    }
}

// A present optional is always a deliberate value: `Some(0)` is stored as 0 even with
// `omitempty`. Only `None` takes the absent branch.
impl<T: Column> Column for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl<T: Column> ColumnType for Option<T> {
    const NULLABLE: bool = true;

    fn zero_value() -> Value {
        Value::Null
    }
}

impl<T: Column + ?Sized> Column for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

impl<T: ColumnType> ColumnType for Box<T> {
    const ZERO_CHECK: ZeroCheck = T::ZERO_CHECK;
    const NULLABLE: bool = T::NULLABLE;

    fn zero_value() -> Value {
        T::zero_value()
    }
}

/// Stores any serializable value as a JSON document column.
///
/// An empty document (`null`, `{}` or `[]`) counts as zero, so `omitempty` JSON columns fall
/// back to the column default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T: Serialize> Column for Json<T> {
    fn to_value(&self) -> Value {
        match serde_json::to_value(&self.0) {
            Ok(json) => Value::Json(json),
            Err(err) => {
                log::warn!("failed to serialize JSON column: {err}");
                Value::Null
            }
        }
    }

    fn is_zero(&self) -> bool {
        match serde_json::to_value(&self.0) {
            Ok(JsonValue::Null) => true,
            Ok(JsonValue::Object(map)) => map.is_empty(),
            Ok(JsonValue::Array(items)) => items.is_empty(),
            _ => false,
        }
    }
}

impl<T: Serialize> ColumnType for Json<T> {
    const ZERO_CHECK: ZeroCheck = ZeroCheck::Custom;

    fn zero_value() -> Value {
        Value::Json(JsonValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_compare_against_their_zero() {
        assert_eq!(0i64.to_value(), i64::zero_value());
        assert_ne!(5i64.to_value(), i64::zero_value());
        assert_eq!(String::new().to_value(), String::zero_value());
        assert_eq!(i32::ZERO_CHECK, ZeroCheck::Equality);
    }

    #[test]
    fn option_reports_absence_and_keeps_present_zero() {
        let none: Option<i64> = None;
        assert!(none.is_absent());
        assert_eq!(none.to_value(), Value::Null);

        let zero = Some(0i64);
        assert!(!zero.is_absent());
        assert_eq!(zero.to_value(), Value::Int(0));
        assert_ne!(zero.to_value(), <Option<i64>>::zero_value());
        assert!(<Option<i64>>::NULLABLE);
    }

    #[test]
    fn vectors_use_length_check() {
        assert_eq!(<Vec<String>>::ZERO_CHECK, ZeroCheck::Length);
        assert_eq!(Column::len(&vec![1i32, 2]), 2);
        assert_eq!(vec![1i32, 2].to_value(), Value::Array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn wide_integers_bind_as_numeric() {
        assert_eq!(u64::MAX.to_value(), Value::Numeric("18446744073709551615".into()));
        assert_eq!((-5i128).to_value(), Value::Numeric("-5".into()));
        assert_eq!(u128::ZERO_CHECK, ZeroCheck::Custom);
        assert!(0usize.is_zero());
        assert!(!7u64.is_zero());
        assert_eq!(u64::zero_value(), Value::Numeric("0".into()));
    }

    #[test]
    fn timestamps_report_their_own_emptiness() {
        assert!(DateTime::<Utc>::default().is_zero());
        assert!(!Utc::now().is_zero());
    }

    #[test]
    fn json_wrapper_treats_empty_documents_as_zero() {
        assert!(Json(json!({})).is_zero());
        assert!(Json(Vec::<i32>::new()).is_zero());
        assert!(!Json(json!({"a": 1})).is_zero());
        assert_eq!(Json(vec![1, 2]).to_value(), Value::Json(json!([1, 2])));
    }

    #[test]
    fn from_json_maps_scalars() {
        assert_eq!(Value::from_json(&json!(3)), Value::Int(3));
        assert_eq!(Value::from_json(&json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from_json(&json!("x")), Value::Text("x".into()));
        assert_eq!(Value::from_json(&json!([1])), Value::Json(json!([1])));
    }
}
