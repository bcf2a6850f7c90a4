//! Binary and plain-object codec shared by every report message.
//!
//! The binary form is plain protobuf via `prost`. The plain-object form is
//! `serde_json::Value` with snake_case keys, the shape `report.json` uses.
//! Two JSON rules keep values exact across the plain-object form:
//! - 64-bit integers are written as decimal strings and read from strings or numbers
//! - enum fields are written by name and read from names or numbers; unknown
//!   numbers are kept so that [`Verify`] can reject them

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::types::{NamedEnum, SchemaError, SchemaResult};

/// Validation that goes beyond what the type system enforces
pub trait Verify {
    /// Check enum range membership (recursively); `path` prefixes error locations
    fn verify_at(&self, path: &str) -> SchemaResult<()>;

    /// Verify from the message root
    fn verify(&self) -> SchemaResult<()> {
        self.verify_at("")
    }
}

/// Encode, decode, verify and plain-object conversion for a report message
pub trait ReportMessage: prost::Message + Default + Serialize + DeserializeOwned + Verify {
    /// Encode to protobuf bytes
    fn encode_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Decode protobuf bytes, then verify
    fn decode_bytes(buf: &[u8]) -> SchemaResult<Self> {
        let message = Self::decode(buf)?;
        message.verify()?;
        Ok(message)
    }

    /// Build from a plain object, defaulting missing fields, then verify
    fn from_object(value: serde_json::Value) -> SchemaResult<Self> {
        let message: Self = serde_json::from_value(value)?;
        message.verify()?;
        Ok(message)
    }

    /// Convert to a plain object
    fn to_object(&self) -> SchemaResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Check a plain object without keeping the result
    fn verify_object(value: &serde_json::Value) -> SchemaResult<()> {
        Self::from_object(value.clone()).map(|_| ())
    }

    /// Parse a JSON document, then verify
    fn from_json_str(json: &str) -> SchemaResult<Self> {
        let message: Self = serde_json::from_str(json)?;
        message.verify()?;
        Ok(message)
    }

    /// Parse raw JSON bytes, then verify; bad UTF-8 is a JSON error
    fn from_json_slice(json: &[u8]) -> SchemaResult<Self> {
        let message: Self = serde_json::from_slice(json)?;
        message.verify()?;
        Ok(message)
    }

    /// Pretty-printed JSON document
    fn to_json_pretty(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<T> ReportMessage for T where T: prost::Message + Default + Serialize + DeserializeOwned + Verify {}

/// Join a field name onto a verification path
pub(crate) fn child_path(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", path, field)
    }
}

/// Verify every element of a repeated field
pub(crate) fn verify_all<T: Verify>(items: &[T], path: &str, field: &str) -> SchemaResult<()> {
    for (i, item) in items.iter().enumerate() {
        item.verify_at(&format!("{}[{}]", child_path(path, field), i))?;
    }
    Ok(())
}

/// Verify an optional message field
pub(crate) fn verify_opt<T: Verify>(item: &Option<T>, path: &str, field: &str) -> SchemaResult<()> {
    match item {
        Some(item) => item.verify_at(&child_path(path, field)),
        None => Ok(()),
    }
}

/// Check that an enum field holds a known tag
pub(crate) fn verify_enum<E: NamedEnum>(value: i32, path: &str, field: &str) -> SchemaResult<()> {
    if E::from_tag(value).is_some() {
        Ok(())
    } else {
        Err(SchemaError::verify(
            child_path(path, field),
            format!("{} is not a valid {}", value, E::TYPE_NAME),
        ))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrU64 {
    Number(u64),
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NameOrTag {
    Tag(i32),
    Name(String),
}

/// 64-bit unsigned integers as decimal strings
pub mod u64_string {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match StringOrU64::deserialize(deserializer)? {
            StringOrU64::Number(n) => Ok(n),
            StringOrU64::String(s) if s.is_empty() => Ok(0),
            StringOrU64::String(s) => s
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid 64-bit integer '{}'", s))),
        }
    }
}

pub(crate) fn serialize_enum<E: NamedEnum, S: Serializer>(
    value: i32,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match E::from_tag(value) {
        Some(variant) => serializer.serialize_str(variant.as_str_name()),
        None => serializer.serialize_i32(value),
    }
}

pub(crate) fn deserialize_enum<'de, E: NamedEnum, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<i32, D::Error> {
    match NameOrTag::deserialize(deserializer)? {
        NameOrTag::Tag(tag) => Ok(tag),
        NameOrTag::Name(name) => E::from_str_name(&name).map(|v| v.tag()).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown {} '{}'", E::TYPE_NAME, name))
        }),
    }
}

macro_rules! enum_name_serde {
    ($module:ident, $enum:ty) => {
        pub mod $module {
            use serde::{Deserializer, Serializer};

            pub fn serialize<S: Serializer>(value: &i32, serializer: S) -> Result<S::Ok, S::Error> {
                super::serialize_enum::<$enum, S>(*value, serializer)
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
                super::deserialize_enum::<$enum, D>(deserializer)
            }
        }
    };
}

enum_name_serde!(inclusion_type, crate::schema::types::InclusionType);
enum_name_serde!(capture_state, crate::schema::types::CaptureState);
enum_name_serde!(git_revision_type, crate::schema::types::GitRevisionType);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::CaptureState;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Wrapper {
        #[serde(with = "u64_string")]
        count: u64,
        #[serde(with = "capture_state")]
        state: i32,
    }

    #[test]
    fn test_u64_written_as_string() {
        let w = Wrapper {
            count: u64::MAX,
            state: CaptureState::Diffed as i32,
        };
        let value = serde_json::to_value(&w).unwrap();
        assert_eq!(value["count"], "18446744073709551615");
        assert_eq!(value["state"], "DIFFED");
        let back: Wrapper = serde_json::from_value(value).unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn test_u64_and_enum_accept_numbers() {
        let w: Wrapper = serde_json::from_str(r#"{"count": 42, "state": 3}"#).unwrap();
        assert_eq!(w.count, 42);
        assert_eq!(w.state, CaptureState::Running as i32);
    }

    #[test]
    fn test_unknown_enum_tag_is_preserved() {
        let w: Wrapper = serde_json::from_str(r#"{"count": "1", "state": 77}"#).unwrap();
        assert_eq!(w.state, 77);
        assert!(verify_enum::<CaptureState>(w.state, "screenshot", "capture_state").is_err());
        assert_eq!(serde_json::to_value(&w).unwrap()["state"], 77);
    }

    #[test]
    fn test_unknown_enum_name_is_rejected() {
        let result: Result<Wrapper, _> = serde_json::from_str(r#"{"count": "1", "state": "DONE"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("", "meta"), "meta");
        assert_eq!(child_path("meta", "user"), "meta.user");
    }
}
