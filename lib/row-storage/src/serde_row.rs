//! Serde-based conversion between caller types and [`RowValues`].
//!
//! Lets any `Serialize` type be put without a hand-written map function, and
//! lets rows read back through a [`crate::QueryExecutor`] become `Deserialize`
//! types again.

use serde::de::value::MapDeserializer;
use serde::de::{DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use serde::{Serialize, forward_to_deserialize_any};
use serde_json::Number;

use crate::{RowValues, StorageError, Value};

/// Serialize `item` to a JSON object and keep one column per key, in field order.
///
/// Booleans become 0/1 and nested arrays or objects are stored as JSON text.
pub fn row_from_serialize<T: Serialize + ?Sized>(item: &T) -> Result<RowValues, StorageError> {
    let json = serde_json::to_value(item)?;

    let serde_json::Value::Object(obj) = json else {
        return Err(StorageError::StorageError(
            "Expected JSON object for row mapping".to_string(),
        ));
    };

    obj.into_iter()
        .map(|(key, value)| Ok((key, column_value(value)?)))
        .collect()
}

fn column_value(value: serde_json::Value) -> Result<Value, StorageError> {
    let value = match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Int(i64::from(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                // u64 above i64::MAX lands here too
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        nested @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            Value::String(serde_json::to_string(&nested)?)
        }
    };
    Ok(value)
}

/// Rebuild a `T` from a row.
///
/// Null columns are omitted so `#[serde(default)]` and `Option` fields behave as
/// they would for a missing key. Booleans come back as 0/1 integers. Text that
/// holds a JSON array or object is accepted wherever `T` expects a nested value.
pub fn deserialize_row<T: DeserializeOwned>(row: &RowValues) -> Result<T, StorageError> {
    let cells = row
        .iter()
        .filter_map(|(column, value)| Some((column.to_string(), Cell(json_value(value)?))));

    Ok(T::deserialize(MapDeserializer::<_, serde_json::Error>::new(cells))?)
}

fn json_value(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Null => None,
        Value::Int(n) => Some(serde_json::Value::Number((*n).into())),
        Value::Float(f) => Number::from_f64(*f).map(serde_json::Value::Number),
        Value::String(s) => Some(serde_json::Value::String(s.clone())),
        Value::Blob(bytes) => Some(serde_json::Value::Array(
            bytes
                .iter()
                .map(|b| serde_json::Value::Number((*b).into()))
                .collect(),
        )),
    }
}

/// One column's value. JSON text is only parsed when the field asks for a
/// sequence, map, struct or enum.
struct Cell(serde_json::Value);

impl Cell {
    fn nested(self) -> serde_json::Value {
        match self.0 {
            serde_json::Value::String(s) if s.starts_with('[') || s.starts_with('{') => {
                serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s))
            }
            other => other,
        }
    }
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for Cell {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> Deserializer<'de> for Cell {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.0.deserialize_any(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            serde_json::Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.nested().deserialize_seq(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.nested().deserialize_tuple(len, visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.nested().deserialize_tuple_struct(name, len, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.nested().deserialize_map(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.nested().deserialize_struct(name, fields, visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.nested().deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct identifier ignored_any
    }
}
