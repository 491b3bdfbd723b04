//! JSON-backed map stored in a single column.
//!
//! [`JsonMap`] is written as the canonical JSON object encoding and read back from JSON, JSONB,
//! text or binary columns. Stores that hand back the literal `null` (or SQL `NULL`) for an
//! absent value decode to an empty map.

use crate::error::{TableError, TableResult};
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};

/// A string-keyed JSON object.
///
/// Nested values stay opaque [`serde_json::Value`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonMap(pub Map<String, Value>);

/// JSONB binary format version written before the payload.
const JSONB_VERSION: u8 = 1;

impl JsonMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode as a JSON object. Keys come out sorted.
    pub fn encode(&self) -> TableResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }

    /// Encode as a JSON object string.
    pub fn encode_string(&self) -> TableResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Decode a JSON payload.
    ///
    /// The 4-byte payload `null` yields an empty map. Anything that is not a JSON object fails
    /// with [`TableError::Decode`].
    pub fn decode(bytes: &[u8]) -> TableResult<Self> {
        if bytes == b"null" {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| TableError::decode(format!("invalid JSON payload: {e}")))?;

        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(TableError::decode(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Deref for JsonMap {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for JsonMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for JsonMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for JsonMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Write an encoded JSON payload for a column of type `ty`.
pub(crate) fn write_json_payload(ty: &Type, payload: &[u8], out: &mut BytesMut) {
    if *ty == Type::JSONB {
        out.put_u8(JSONB_VERSION);
    }
    out.put_slice(payload);
}

/// Strip the JSONB version prefix from a raw column payload.
pub(crate) fn read_json_payload<'a>(
    ty: &Type,
    raw: &'a [u8],
) -> Result<&'a [u8], Box<dyn std::error::Error + Sync + Send>> {
    if *ty != Type::JSONB {
        return Ok(raw);
    }
    match raw.split_first() {
        Some((&JSONB_VERSION, rest)) => Ok(rest),
        Some((v, _)) => Err(format!("unsupported JSONB encoding version {v}").into()),
        None => Err("empty JSONB payload".into()),
    }
}

fn accepts_json_column(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::JSON | Type::JSONB | Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::BYTEA
    )
}

impl ToSql for JsonMap {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        let payload = self.encode()?;
        write_json_payload(ty, &payload, out);
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        accepts_json_column(ty)
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for JsonMap {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        let payload = read_json_payload(ty, raw)?;
        Ok(Self::decode(payload)?)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self::default())
    }

    fn accepts(ty: &Type) -> bool {
        accepts_json_column(ty)
    }
}
