//! Cache Value Module
//!
//! Tagged payloads stored by the caches, plus the counter variant used by
//! `incr`/`decr`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Value ==
/// A stored payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// No payload
    #[default]
    Nil,
    /// Raw bytes, never framed by the codec
    Bytes(Vec<u8>),
    /// UTF-8 text, never framed by the codec
    Text(String),
    /// Integer eligible for counter operations
    Counter(Counter),
    /// Structured object
    Object(serde_json::Value),
}

// == Target ==
/// Shape the caller wants a value read back as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Raw bytes, copied without decoding
    Bytes,
    /// Text, cast directly from the stored bytes
    Text,
    /// Whatever was stored, fully decoded
    Any,
}

impl Value {
    /// Wraps any serializable type as a structured object.
    pub fn object<T: Serialize>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Value::Object)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Reads a structured object back into a concrete type.
    pub fn into_object<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Value::Object(object) => {
                serde_json::from_value(object).map_err(|e| CacheError::Serialization(e.to_string()))
            }
            other => Err(CacheError::TypeMismatch(format!(
                "expected an object, found {}",
                other.kind()
            ))),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::Counter(_) => "counter",
            Value::Object(_) => "object",
        }
    }

    /// Converts the value into the requested target shape.
    ///
    /// Text and bytes convert into each other (bytes must be valid UTF-8).
    /// Counters and objects render as text but never as raw bytes.
    pub fn into_target(self, target: Target) -> Result<Value> {
        match (target, self) {
            (Target::Any, value) => Ok(value),
            (Target::Bytes, Value::Nil) => Ok(Value::Bytes(Vec::new())),
            (Target::Bytes, Value::Bytes(bytes)) => Ok(Value::Bytes(bytes)),
            (Target::Bytes, Value::Text(text)) => Ok(Value::Bytes(text.into_bytes())),
            (Target::Text, Value::Nil) => Ok(Value::Text(String::new())),
            (Target::Text, Value::Text(text)) => Ok(Value::Text(text)),
            (Target::Text, Value::Bytes(bytes)) => String::from_utf8(bytes)
                .map(Value::Text)
                .map_err(|_| CacheError::TypeMismatch("bytes are not valid UTF-8".to_string())),
            (Target::Text, Value::Counter(counter)) => Ok(Value::Text(counter.to_string())),
            (Target::Text, Value::Object(object)) => Ok(Value::Text(object.to_string())),
            (Target::Bytes, other) => Err(CacheError::TypeMismatch(format!(
                "{} cannot be read as bytes",
                other.kind()
            ))),
        }
    }

    /// Returns the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the byte payload, if this is a bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Renders the value as JSON for API responses.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Nil => serde_json::Value::Null,
            Value::Bytes(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).into()),
            Value::Text(text) => serde_json::Value::String(text.clone()),
            Value::Counter(counter) => counter.to_json(),
            Value::Object(object) => object.clone(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Counter> for Value {
    fn from(value: Counter) -> Self {
        Value::Counter(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Counter(Counter::I64(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Counter(Counter::U64(value))
    }
}

// == Counter ==
/// Integer of a supported width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Counter {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
}

impl Counter {
    /// Adds one, failing if the width would overflow.
    pub fn incremented(self) -> Result<Counter> {
        let next = match self {
            Counter::I32(n) => n.checked_add(1).map(Counter::I32),
            Counter::I64(n) => n.checked_add(1).map(Counter::I64),
            Counter::U32(n) => n.checked_add(1).map(Counter::U32),
            Counter::U64(n) => n.checked_add(1).map(Counter::U64),
        };
        next.ok_or_else(|| CacheError::Overflow(format!("{} cannot be incremented", self)))
    }

    /// Subtracts one. Unsigned values at zero underflow.
    pub fn decremented(self) -> Result<Counter> {
        match self {
            Counter::U32(0) | Counter::U64(0) => Err(CacheError::Underflow(
                "unsigned counter is already zero".to_string(),
            )),
            Counter::U32(n) => Ok(Counter::U32(n - 1)),
            Counter::U64(n) => Ok(Counter::U64(n - 1)),
            Counter::I32(n) => n
                .checked_sub(1)
                .map(Counter::I32)
                .ok_or_else(|| CacheError::Overflow(format!("{} cannot be decremented", n))),
            Counter::I64(n) => n
                .checked_sub(1)
                .map(Counter::I64)
                .ok_or_else(|| CacheError::Overflow(format!("{} cannot be decremented", n))),
        }
    }

    fn to_json(self) -> serde_json::Value {
        match self {
            Counter::I32(n) => n.into(),
            Counter::I64(n) => n.into(),
            Counter::U32(n) => n.into(),
            Counter::U64(n) => n.into(),
        }
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Counter::I32(n) => write!(f, "{}", n),
            Counter::I64(n) => write!(f, "{}", n),
            Counter::U32(n) => write!(f, "{}", n),
            Counter::U64(n) => write!(f, "{}", n),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        visits: u32,
    }

    #[test]
    fn test_counter_increment() {
        assert_eq!(Counter::I32(1).incremented().unwrap(), Counter::I32(2));
        assert_eq!(Counter::U64(0).incremented().unwrap(), Counter::U64(1));
        assert!(matches!(
            Counter::U32(u32::MAX).incremented(),
            Err(CacheError::Overflow(_))
        ));
    }

    #[test]
    fn test_counter_decrement_underflow() {
        assert!(matches!(
            Counter::U32(0).decremented(),
            Err(CacheError::Underflow(_))
        ));
        assert!(matches!(
            Counter::U64(0).decremented(),
            Err(CacheError::Underflow(_))
        ));
        assert_eq!(Counter::I64(0).decremented().unwrap(), Counter::I64(-1));
        assert!(matches!(
            Counter::I32(i32::MIN).decremented(),
            Err(CacheError::Overflow(_))
        ));
    }

    #[test]
    fn test_text_and_bytes_convert() {
        let bytes = Value::from("hello").into_target(Target::Bytes).unwrap();
        assert_eq!(bytes, Value::Bytes(b"hello".to_vec()));

        let text = bytes.into_target(Target::Text).unwrap();
        assert_eq!(text.as_text(), Some("hello"));
    }

    #[test]
    fn test_invalid_utf8_is_type_mismatch() {
        let result = Value::Bytes(vec![0xff, 0xfe]).into_target(Target::Text);
        assert!(matches!(result, Err(CacheError::TypeMismatch(_))));
    }

    #[test]
    fn test_counter_renders_as_text_not_bytes() {
        let counter = Value::from(41i64);
        assert_eq!(
            counter.clone().into_target(Target::Text).unwrap().as_text(),
            Some("41")
        );
        assert!(matches!(
            counter.into_target(Target::Bytes),
            Err(CacheError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_object_roundtrip() {
        let session = Session {
            user: "ada".to_string(),
            visits: 3,
        };
        let value = Value::object(&session).unwrap();
        assert_eq!(value.kind(), "object");
        assert_eq!(value.into_object::<Session>().unwrap(), session);
    }

    #[test]
    fn test_into_object_rejects_text() {
        let result = Value::from("plain").into_object::<Session>();
        assert!(matches!(result, Err(CacheError::TypeMismatch(_))));
    }
}
