//! Input resolution: raw document, local file, or URL → parsed document.
//!
//! Text from files and URLs is parsed as YAML, which also accepts JSON.
//! Mapping keys that are not strings in YAML (`200:` in an OpenAPI
//! `responses` block, for instance) are rendered as strings so the document
//! fits the JSON data model used by the templates. A key repeated within
//! one mapping keeps its last value, as `JSON.parse` does.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde_json::{Map, Number, Value};

use crate::error::InputError;

/// User agent sent with every input request.
pub const USER_AGENT: &str = concat!("Bootprint/", env!("CARGO_PKG_VERSION"));

/// Where the input document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputRef {
    /// Already-structured data; used as-is.
    Document(Value),
    /// A URL (`http://` or `https://`) or a file path.
    Location(String),
}

impl From<Value> for InputRef {
    fn from(value: Value) -> Self {
        InputRef::Document(value)
    }
}

impl From<&str> for InputRef {
    fn from(s: &str) -> Self {
        InputRef::Location(s.to_owned())
    }
}

impl From<String> for InputRef {
    fn from(s: String) -> Self {
        InputRef::Location(s)
    }
}

impl From<&Path> for InputRef {
    fn from(path: &Path) -> Self {
        InputRef::Location(path.to_string_lossy().into_owned())
    }
}

/// Whether `location` should be fetched over HTTP.
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Resolve `input` into a document.
///
/// A missing file becomes [`InputError::CouldNotLoadInput`]; every other
/// failure keeps its own variant.
pub async fn load_input(input: InputRef) -> Result<Value, InputError> {
    let location = match input {
        InputRef::Document(value) => return Ok(value),
        InputRef::Location(location) => location,
    };

    let text = if is_url(&location) {
        tracing::debug!("loading input from url {location}");
        load_url(&location).await?
    } else {
        tracing::debug!("loading input from file {location}");
        read_file(&location).await?
    };
    parse_document(&text)
}

async fn read_file(path: &str) -> Result<String, InputError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(InputError::CouldNotLoadInput {
            message: format!("Input could not be loaded: {path}: {err}"),
        }),
        Err(err) => Err(InputError::Read { path: path.into(), source: err }),
    }
}

/// GET `url`; any status of 400 or above is an error, including codes
/// outside the registered ranges.
async fn load_url(url: &str) -> Result<String, InputError> {
    let http_err = |source: reqwest::Error| InputError::Http { url: url.to_owned(), source };

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(http_err)?;
    let response = client.get(url).send().await.map_err(http_err)?;

    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(InputError::Status { url: url.to_owned(), status: status.as_u16() });
    }
    response.text().await.map_err(http_err)
}

/// Parse YAML (or JSON) text into a document.
pub fn parse_document(text: &str) -> Result<Value, InputError> {
    let Document(value) = serde_yaml::from_str(text)?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// Document deserialization
// ---------------------------------------------------------------------------

/// A YAML node converted straight into the JSON data model.
struct Document(Value);

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a YAML or JSON document")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Document, E> {
        Ok(Document(Value::Null))
    }

    fn visit_none<E: de::Error>(self) -> Result<Document, E> {
        Ok(Document(Value::Null))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Document, D::Error> {
        Document::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Document, E> {
        Ok(Document(Value::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Document, E> {
        Ok(Document(Value::Number(v.into())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Document, E> {
        Ok(Document(Value::Number(v.into())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Document, E> {
        Ok(Document(Number::from_f64(v).map_or(Value::Null, Value::Number)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Document, E> {
        Ok(Document(Value::String(v.to_owned())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Document, E> {
        Ok(Document(Value::String(v)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Document, A::Error> {
        let mut items = Vec::new();
        while let Some(Document(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Document(Value::Array(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Document, A::Error> {
        let mut map = Map::new();
        while let Some((MappingKey(key), Document(value))) = access.next_entry()? {
            map.insert(key, value);
        }
        Ok(Document(Value::Object(map)))
    }

    /// Tagged nodes (`!Ref value`) keep their value and drop the tag.
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Document, A::Error> {
        let (_tag, variant) = data.variant::<String>()?;
        variant.newtype_variant()
    }
}

/// A mapping key rendered as a string.
struct MappingKey(String);

impl<'de> Deserialize<'de> for MappingKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MappingKeyVisitor)
    }
}

struct MappingKeyVisitor;

impl<'de> Visitor<'de> for MappingKeyVisitor {
    type Value = MappingKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar mapping key")
    }

    fn visit_unit<E: de::Error>(self) -> Result<MappingKey, E> {
        Ok(MappingKey("null".to_owned()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MappingKey, E> {
        Ok(MappingKey(Number::from_f64(v).map_or_else(|| v.to_string(), |n| n.to_string())))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MappingKey, E> {
        Ok(MappingKey(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<MappingKey, E> {
        Ok(MappingKey(v))
    }
}
