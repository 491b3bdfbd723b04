//! Untyped column values.
//!
//! [`SqlValue`] is the "any" of column maps, conditions and statement arguments. It binds to
//! `tokio-postgres` through [`ToSql`], adapting integers and floats to the parameter type the
//! server inferred.

use crate::error::{TableError, TableResult};
use crate::json::{JsonMap, write_json_payload};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A column name -> value map.
///
/// Iteration is lexicographic by column name; every statement built from a map uses that
/// order for its columns and arguments.
pub type ColumnMap = BTreeMap<String, SqlValue>;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    /// A semi-structured value; encoded through [`JsonMap::encode`] before binding.
    Map(JsonMap),
    /// An already encoded JSON document.
    JsonText(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// The text form of the value when it is [`SqlValue::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::TimestampTz(_) => "timestamptz",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Map(_) => "map",
            SqlValue::JsonText(_) => "json",
        }
    }

    /// Route semi-structured values through the codec so only encoded JSON reaches the store.
    pub(crate) fn into_bindable(self) -> TableResult<SqlValue> {
        match self {
            SqlValue::Map(m) => Ok(SqlValue::JsonText(m.encode_string()?)),
            other => Ok(other),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            SqlValue::Timestamp(v) => write!(f, "{v}"),
            SqlValue::TimestampTz(v) => write!(f, "{v}"),
            SqlValue::Uuid(v) => write!(f, "{v}"),
            SqlValue::Map(v) => write!(f, "{}", Value::Object(v.0.clone())),
            SqlValue::JsonText(v) => f.write_str(v),
        }
    }
}

// ==================== Conversions into SqlValue ====================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for SqlValue {
                fn from(v: $t) -> Self {
                    SqlValue::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Float(f64::from(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::TimestampTz(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<JsonMap> for SqlValue {
    fn from(v: JsonMap) -> Self {
        SqlValue::Map(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

impl From<Value> for SqlValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SqlValue::Text(s),
            Value::Object(map) => SqlValue::Map(JsonMap(map)),
            array @ Value::Array(_) => SqlValue::JsonText(array.to_string()),
        }
    }
}

/// Build a [`ColumnMap`] from a JSON object.
///
/// ```ignore
/// let m = tablewrap::column_map_from_json(serde_json::json!({"mobileNo": "13800138000"}))?;
/// ```
pub fn column_map_from_json(value: Value) -> TableResult<ColumnMap> {
    match value {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        other => Err(TableError::validation(format!(
            "column map must be a JSON object, found {}",
            crate::json::json_kind(&other)
        ))),
    }
}

/// Build a [`ColumnMap`] from `column => value` pairs.
///
/// ```ignore
/// let m = tablewrap::column_map! { "mobileNo" => "13800138000", "status" => 1 };
/// ```
#[macro_export]
macro_rules! column_map {
    () => { $crate::ColumnMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut m = $crate::ColumnMap::new();
        $( m.insert(::std::string::String::from($key), $crate::SqlValue::from($value)); )+
        m
    }};
}

// ==================== Driver binding ====================

impl ToSql for SqlValue {
    /// Binds the value to the parameter type the server inferred.
    ///
    /// Integers, floats, timestamps and UUIDs are converted where the target type can hold
    /// them losslessly; every other combination goes through the inner type's checked
    /// encoding, so a mismatch is a `WrongType` error rather than misread bytes.
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql_checked(ty, out),
            SqlValue::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Text(v) => match *ty {
                Type::JSON | Type::JSONB => {
                    write_json_payload(ty, v.as_bytes(), out);
                    Ok(IsNull::No)
                }
                _ => v.as_str().to_sql_checked(ty, out),
            },
            SqlValue::Bytes(v) => v.as_slice().to_sql_checked(ty, out),
            SqlValue::Timestamp(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::TimestampTz(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Uuid(v) => match *ty {
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => v.to_string().to_sql(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Map(v) => v.to_sql_checked(ty, out),
            SqlValue::JsonText(v) => match *ty {
                Type::JSON | Type::JSONB => {
                    write_json_payload(ty, v.as_bytes(), out);
                    Ok(IsNull::No)
                }
                _ => v.as_str().to_sql_checked(ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

// ==================== Conversions out of SqlValue ====================

/// Conversion from a fetched [`SqlValue`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &SqlValue) -> Result<Self, String>;
}

fn mismatch<T>(expected: &str, value: &SqlValue) -> Result<T, String> {
    Err(format!("expected {expected}, found {}", value.kind()))
}

impl FromValue for SqlValue {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Int(v) => Ok(*v),
            other => mismatch("int", other),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: &SqlValue) -> Result<Self, String> {
                    let v = i64::from_value(value)?;
                    <$t>::try_from(v).map_err(|e| format!("{v} out of range: {e}"))
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, u16, u32, u64);

impl FromValue for f64 {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v as f64),
            other => mismatch("float", other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v != 0),
            other => mismatch("bool", other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Text(v) | SqlValue::JsonText(v) => Ok(v.clone()),
            SqlValue::Bytes(v) => String::from_utf8(v.clone()).map_err(|e| e.to_string()),
            other => mismatch("text", other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bytes(v) => Ok(v.clone()),
            SqlValue::Text(v) => Ok(v.clone().into_bytes()),
            other => mismatch("bytes", other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Timestamp(v) => Ok(*v),
            SqlValue::TimestampTz(v) => Ok(v.naive_utc()),
            other => mismatch("timestamp", other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::TimestampTz(v) => Ok(*v),
            SqlValue::Timestamp(v) => Ok(v.and_utc()),
            other => mismatch("timestamptz", other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Uuid(v) => Ok(*v),
            SqlValue::Text(v) => Uuid::parse_str(v).map_err(|e| e.to_string()),
            other => mismatch("uuid", other),
        }
    }
}

impl FromValue for JsonMap {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        let decoded = match value {
            SqlValue::Null => return Ok(JsonMap::default()),
            SqlValue::Map(m) => return Ok(m.clone()),
            SqlValue::JsonText(s) | SqlValue::Text(s) => JsonMap::decode(s.as_bytes()),
            SqlValue::Bytes(b) => JsonMap::decode(b),
            other => return mismatch("json object", other),
        };
        decoded.map_err(|e| e.to_string())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
