use chrono::{NaiveDate, NaiveDateTime};
use std::any::Any;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Object of type {type_name} is not JSON serializable")]
pub struct SerializationError {
    type_name: &'static str,
}

/// Render a date or datetime the way JSON payloads expect it.
///
/// Only [`NaiveDate`] and [`NaiveDateTime`] are accepted; anything else is an
/// error rather than a best-effort string.
pub fn json_date<T: Any>(value: &T) -> Result<String, SerializationError> {
    let value = value as &dyn Any;

    if let Some(date) = value.downcast_ref::<NaiveDate>() {
        return Ok(date.format(DATE_FORMAT).to_string());
    }
    if let Some(datetime) = value.downcast_ref::<NaiveDateTime>() {
        return Ok(datetime.format(DATETIME_FORMAT).to_string());
    }

    Err(SerializationError {
        type_name: std::any::type_name::<T>(),
    })
}

/// `serialize_with` adapter for date fields in request payloads
pub(crate) fn serialize_json_date<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Any,
    S: serde::Serializer,
{
    let text = json_date(value).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}
