//! Lenient deserializers for backend payloads.
//!
//! The backend serializes decimals as strings and ids as numbers, while the
//! OCR service is free to emit either. These helpers accept both.

use serde::Deserialize;
use serde::de::{self, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Int(i64),
    Float(f64),
    String(String),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s,
        }
    }
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    StringOrNumber::deserialize(deserializer).map(StringOrNumber::into_string)
}

pub(crate) fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}

/// Null and missing become `0.0`; unparsable strings are an error.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(StringOrNumber::Int(i)) => Ok(i as f64),
        Some(StringOrNumber::Float(f)) => Ok(f),
        Some(StringOrNumber::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(StringOrNumber::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid decimal: {s}"))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(0),
        Some(StringOrNumber::Int(i)) => {
            u32::try_from(i).map_err(|_| de::Error::custom(format!("invalid quantity: {i}")))
        }
        Some(StringOrNumber::Float(f)) if f >= 0.0 => Ok(f.round() as u32),
        Some(StringOrNumber::Float(f)) => Err(de::Error::custom(format!("invalid quantity: {f}"))),
        Some(StringOrNumber::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid quantity: {s}"))),
    }
}
