//! Parses textual tokens into [`Value`]s, the inverse of `scalar_repr`
//! (§4.4). One scalar is parsed per call; arrays split their token on
//! commas and size the destination to exactly `comma_count + 1` elements.

use registry::{FieldKind, Value};

use crate::error::RenderError;

pub fn scan_value(kind: &FieldKind, token: &str) -> Result<Value, RenderError> {
    match kind {
        FieldKind::U32 => Ok(Value::U32(parse(token, "u32")?)),
        FieldKind::I32 => Ok(Value::I32(parse(token, "i32")?)),
        FieldKind::U64 => Ok(Value::U64(parse(token, "u64")?)),
        FieldKind::I64 => Ok(Value::I64(parse(token, "i64")?)),
        FieldKind::F32(_) => Ok(Value::F32(parse(token, "f32")?)),
        FieldKind::F64(_) => Ok(Value::F64(parse(token, "f64")?)),
        FieldKind::Bytes { as_str: true } => Ok(Value::Str(token.to_string())),
        FieldKind::Bytes { as_str: false } => Ok(Value::Bytes(scan_hex_bytes(token)?)),
        FieldKind::Array(element) => {
            let tokens: Vec<&str> = if token.is_empty() { Vec::new() } else { token.split(',').collect() };
            let mut items = Vec::with_capacity(tokens.len());
            for t in tokens {
                items.push(scan_value(element, t)?);
            }
            Ok(Value::Array(items))
        }
        FieldKind::Struct(_) => Err(RenderError::NotScannable("struct")),
        FieldKind::Union => Err(RenderError::NotScannable("union")),
        FieldKind::BitPacked { .. } => Err(RenderError::NotScannable("bit-packed")),
    }
}

fn parse<T: std::str::FromStr>(token: &str, expected: &'static str) -> Result<T, RenderError> {
    token.trim().parse::<T>().map_err(|_| RenderError::InvalidToken { token: token.to_string(), expected })
}

/// Parses a hex string with two hex characters per byte, e.g. `"deadbeef"`.
fn scan_hex_bytes(token: &str) -> Result<Vec<u8>, RenderError> {
    let token = token.trim();
    if token.len() % 2 != 0 {
        return Err(RenderError::OddHexLength(token.to_string()));
    }
    let mut out = Vec::with_capacity(token.len() / 2);
    let bytes = token.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = hex_digit(pair[0]).ok_or_else(|| RenderError::InvalidHex(token.to_string()))?;
        let lo = hex_digit(pair[1]).ok_or_else(|| RenderError::InvalidHex(token.to_string()))?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
