//! Row and column access.
//!
//! - [`Row`]
//! - [`Field`]
//! - [`Decode`]
//! - [`RowIndex`]
//! - [`DecodeError`]
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as Json;
use std::{borrow::Cow, fmt, sync::Arc};
use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::convert;

/// Column descriptor reported by the server.
///
/// Servers differ on the shape: either a bare name string or an object
/// carrying a `name` member. Both are kept verbatim.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Field(Json);

impl Field {
    /// Column name, when the descriptor carries one.
    pub fn name(&self) -> Option<&str> {
        match &self.0 {
            Json::String(name) => Some(name),
            Json::Object(map) => map.get("name").and_then(Json::as_str),
            _ => None,
        }
    }

    /// The descriptor exactly as the server sent it.
    pub fn as_json(&self) -> &Json {
        &self.0
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => self.0.fmt(f),
        }
    }
}

/// One row, values in [`fields`](Row::fields) order.
#[derive(Clone)]
pub struct Row {
    fields: Arc<[Field]>,
    values: Box<[Json]>,
}

impl Row {
    pub(crate) fn new(fields: Arc<[Field]>, values: Vec<Json>) -> Row {
        Row { fields, values: values.into_boxed_slice() }
    }

    /// Column descriptors this row was decoded under.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw column value.
    pub fn get(&self, index: usize) -> Option<&Json> {
        self.values.get(index)
    }

    /// Try get and decode a column, by position or by field name.
    pub fn try_get<I: RowIndex, D: Decode>(&self, index: I) -> Result<D, DecodeError> {
        let at = index.position(&self.fields, self.values.len())?;
        let value = self.values.get(at).ok_or(DecodeError::IndexOutOfBounds(at))?;
        D::decode(value)
    }

    /// Consume self into the raw column values.
    pub fn into_values(self) -> Vec<Json> {
        self.values.into_vec()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_map();
        for (at, value) in self.values.iter().enumerate() {
            match self.fields.get(at).and_then(Field::name) {
                Some(name) => dbg.key(&name),
                None => dbg.key(&at),
            };
            dbg.value(value);
        }
        dbg.finish()
    }
}

/// Type that can be used for indexing a column.
pub trait RowIndex: Sized + sealed::Sealed {
    /// Resolve to a column position.
    fn position(self, fields: &[Field], len: usize) -> Result<usize, DecodeError>;
}

impl RowIndex for usize {
    fn position(self, _: &[Field], len: usize) -> Result<usize, DecodeError> {
        match self < len {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl RowIndex for &str {
    fn position(self, fields: &[Field], _: usize) -> Result<usize, DecodeError> {
        fields
            .iter()
            .position(|field| field.name() == Some(self))
            .ok_or_else(|| DecodeError::ColumnNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

/// A type that can be decoded from a column value.
pub trait Decode: Sized {
    /// Try decode self from a raw column value.
    fn decode(value: &Json) -> Result<Self, DecodeError>;
}

impl Decode for Json {
    fn decode(value: &Json) -> Result<Self, DecodeError> {
        Ok(value.clone())
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(value: &Json) -> Result<Self, DecodeError> {
        match value.is_null() {
            true => Ok(None),
            false => T::decode(value).map(Some),
        }
    }
}

impl Decode for bool {
    fn decode(value: &Json) -> Result<Self, DecodeError> {
        value.as_bool().ok_or(DecodeError::TypeMismatch("bool"))
    }
}

impl Decode for i64 {
    fn decode(value: &Json) -> Result<Self, DecodeError> {
        value.as_i64().ok_or(DecodeError::TypeMismatch("integer"))
    }
}

impl Decode for f64 {
    fn decode(value: &Json) -> Result<Self, DecodeError> {
        value.as_f64().ok_or(DecodeError::TypeMismatch("float"))
    }
}

impl Decode for String {
    fn decode(value: &Json) -> Result<Self, DecodeError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or(DecodeError::TypeMismatch("string"))
    }
}

impl Decode for Decimal {
    fn decode(value: &Json) -> Result<Self, DecodeError> {
        match value {
            Json::String(text) => text.trim().parse().map_err(|_| DecodeError::Malformed("decimal")),
            Json::Number(number) => number
                .to_string()
                .parse()
                .map_err(|_| DecodeError::Malformed("decimal")),
            _ => Err(DecodeError::TypeMismatch("decimal")),
        }
    }
}

macro_rules! decode_temporal {
    ($ty:ty, $parse:path, $kind:literal) => {
        impl Decode for $ty {
            fn decode(value: &Json) -> Result<Self, DecodeError> {
                let text = value.as_str().ok_or(DecodeError::TypeMismatch($kind))?;
                $parse(text).ok_or(DecodeError::Malformed($kind))
            }
        }
    };
}

decode_temporal!(Date, convert::date, "date");
decode_temporal!(Time, convert::time, "time");
decode_temporal!(PrimitiveDateTime, convert::datetime, "datetime");
decode_temporal!(Duration, convert::duration, "duration");

/// An error when decoding a column value.
pub enum DecodeError {
    /// Column requested not found.
    ColumnNotFound(Cow<'static, str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Value kind does not match the requested type.
    TypeMismatch(&'static str),
    /// Textual value failed its lenient parse.
    Malformed(&'static str),
}

impl std::error::Error for DecodeError { }

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(at) => write!(f, "index out of bounds: {at:?}"),
            Self::TypeMismatch(expected) => write!(f, "expected {expected}"),
            Self::Malformed(kind) => write!(f, "malformed {kind}"),
        }
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn row() -> Row {
        let fields: Vec<Field> =
            serde_json::from_value(json!(["id", {"name": "when"}, "note"])).unwrap();
        Row::new(
            fields.into(),
            vec![json!(7), json!("2007-02-25 22:32:17"), json!(null)],
        )
    }

    #[test]
    fn by_position_and_name() {
        let row = row();
        assert_eq!(row.try_get::<_, i64>(0).unwrap(), 7);
        assert_eq!(row.try_get::<_, i64>("id").unwrap(), 7);

        let when: PrimitiveDateTime = row.try_get("when").unwrap();
        assert_eq!(when, convert::datetime("2007-02-25 22:32:17").unwrap());

        assert!(matches!(
            row.try_get::<_, i64>(3),
            Err(DecodeError::IndexOutOfBounds(3))
        ));
        assert!(matches!(
            row.try_get::<_, i64>("missing"),
            Err(DecodeError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn null_and_option() {
        let row = row();
        assert_eq!(row.try_get::<_, Option<String>>("note").unwrap(), None);
        assert!(row.try_get::<_, String>("note").is_err());
    }

    #[test]
    fn malformed_temporal_is_an_error_for_typed_get() {
        let row = Row::new(Vec::new().into(), vec![json!("2007-02-31")]);
        assert!(matches!(
            row.try_get::<_, Date>(0),
            Err(DecodeError::Malformed("date"))
        ));
        assert_eq!(row.try_get::<_, String>(0).unwrap(), "2007-02-31");
    }
}
