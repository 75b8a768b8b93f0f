//! Canonical JSON encoding for deterministic serialization.
//!
//! Values are encoded as compact JSON with deterministic rules:
//! - Object keys sorted by UTF-16 code units (byte order for BMP text)
//! - No insignificant whitespace
//! - Strings escaped exactly like ECMAScript `JSON.stringify`
//! - Numbers formatted like ECMAScript `Number.prototype.toString`
//!   (`1` not `1.0`, `1e+21`, `0.000001`, `-0` as `0`)
//!
//! The canonical encoding is the only input to hashing and to snapshot
//! persistence, so independent implementations must agree byte for byte.
//!
//! **CRITICAL**: This encoding is FROZEN. Changes alter every digest, Merkle
//! root and snapshot id ever produced.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::EncodingError;

/// Maximum nesting depth accepted by the encoder.
///
/// Matches the recursion limit `serde_json` applies when parsing.
pub const MAX_DEPTH: usize = 128;

/// Encode a JSON value to its canonical text.
pub fn canonical_string(value: &Value) -> Result<String, EncodingError> {
    let mut buf = String::new();
    encode_value_to(&mut buf, value, 0)?;
    Ok(buf)
}

/// Encode a JSON value to canonical bytes (UTF-8 of [`canonical_string`]).
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, EncodingError> {
    canonical_string(value).map(String::into_bytes)
}

/// Convert any serializable value into the JSON value model.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, EncodingError> {
    serde_json::to_value(value).map_err(|e| EncodingError::Unserializable(e.to_string()))
}

/// Canonically encode any serializable value.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, EncodingError> {
    canonical_string(&to_value(value)?)
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut String, value: &Value, depth: usize) -> Result<(), EncodingError> {
    if depth > MAX_DEPTH {
        return Err(EncodingError::TooDeep { max: MAX_DEPTH });
    }

    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_text(buf, s),
        Value::Array(items) => encode_array(buf, items, depth)?,
        Value::Object(map) => encode_object_canonical(buf, map, depth)?,
    }
    Ok(())
}

/// Encode an array, preserving element order.
fn encode_array(buf: &mut String, items: &[Value], depth: usize) -> Result<(), EncodingError> {
    buf.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_value_to(buf, item, depth + 1)?;
    }
    buf.push(']');
    Ok(())
}

/// Encode an object canonically.
///
/// Keys are sorted by UTF-16 code units regardless of the map's own order.
fn encode_object_canonical(
    buf: &mut String,
    map: &Map<String, Value>,
    depth: usize,
) -> Result<(), EncodingError> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.encode_utf16().cmp(b.0.encode_utf16()));

    buf.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_text(buf, key);
        buf.push(':');
        encode_value_to(buf, value, depth + 1)?;
    }
    buf.push('}');
    Ok(())
}

/// Encode a string literal with `JSON.stringify` escaping.
fn encode_text(buf: &mut String, s: &str) {
    buf.push('"');
    for ch in s.chars() {
        match ch {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0c}' => buf.push_str("\\f"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            c if (c as u32) < 0x20 => buf.push_str(&format!("\\u{:04x}", c as u32)),
            c => buf.push(c),
        }
    }
    buf.push('"');
}

/// Largest integer magnitude an `f64` holds exactly (2^53).
const MAX_EXACT_INTEGER: u64 = 1 << 53;

/// Encode a JSON number.
fn encode_number(buf: &mut String, n: &Number) {
    buf.push_str(&number_text(n));
}

/// ECMAScript text of a JSON number. Integers beyond 2^53 go through `f64`,
/// as they would in a JavaScript engine.
pub fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        if i.unsigned_abs() <= MAX_EXACT_INTEGER {
            return i.to_string();
        }
        return format_number(i as f64);
    }
    if let Some(u) = n.as_u64() {
        if u <= MAX_EXACT_INTEGER {
            return u.to_string();
        }
        return format_number(u as f64);
    }
    n.as_f64().map(format_number).unwrap_or_else(|| n.to_string())
}

/// Format an `f64` the way ECMAScript `Number.prototype.toString` does.
///
/// Uses the shortest round-trip digits, switching to exponent notation
/// outside `1e-7 < |x| < 1e21`.
pub fn format_number(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.2345e8".
    let sci = format!("{:e}", f.abs());
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return f.to_string(),
    };
    let exponent: i32 = match exponent.parse() {
        Ok(e) => e,
        Err(_) => return f.to_string(),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let k = digits.len() as i32;
    let n = exponent + 1;

    let mut out = String::new();
    if f < 0.0 {
        out.push('-');
    }

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        let e = n - 1;
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if e >= 0 { '+' } else { '-' });
        out.push_str(&e.abs().to_string());
    }
    out
}
