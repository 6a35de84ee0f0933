//! Tolerant field decoders for roster and location records.
//!
//! Rows arrive from spreadsheets and from SQL-era exports, so the same field
//! may be a string, a number, a boolean, or null depending on the source.
//! These helpers are used with `#[serde(deserialize_with = "...")]`.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Text field; numbers are rendered, null and blanks become `""`.
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(opt_string(d)?.unwrap_or_default())
}

/// Optional text field; blank strings collapse to `None`.
pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = match Option::<Scalar>::deserialize(d)? {
        None => None,
        Some(Scalar::Text(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Scalar::Int(i)) => Some(i.to_string()),
        Some(Scalar::Float(f)) => Some(f.to_string()),
        Some(Scalar::Bool(b)) => Some(b.to_string()),
    };
    Ok(value)
}

/// Optional float; numeric strings (DECIMAL columns) are parsed.
pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = match Option::<Scalar>::deserialize(d)? {
        Some(Scalar::Text(s)) => s.trim().parse::<f64>().ok(),
        Some(Scalar::Int(i)) => Some(i as f64),
        Some(Scalar::Float(f)) => Some(f),
        Some(Scalar::Bool(_)) | None => None,
    };
    Ok(value.filter(|v| v.is_finite()))
}

/// Non-negative count; unparsable or negative input becomes 0.
pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let raw = match Option::<Scalar>::deserialize(d)? {
        Some(Scalar::Text(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(Scalar::Int(i)) => i as f64,
        Some(Scalar::Float(f)) => f,
        Some(Scalar::Bool(_)) | None => 0.0,
    };
    Ok(raw.trunc().clamp(0.0, f64::from(u32::MAX)) as u32)
}

/// Boolean flag; accepts `true`/`false`, `0`/`1`, and their string forms.
pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(opt_flag(d)?.unwrap_or(false))
}

/// Boolean flag that remembers whether it was given at all.
pub fn opt_flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Scalar>::deserialize(d)?.map(|v| match v {
        Scalar::Bool(b) => b,
        Scalar::Int(i) => i != 0,
        Scalar::Float(f) => f != 0.0,
        Scalar::Text(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "ya" | "yes"
        ),
    });
    Ok(value)
}
