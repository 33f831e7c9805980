//! Aggregate struct codec (§4.2) and union codec (§4.3), built generically
//! over [`FieldDef`]/[`FieldKind`] rather than per-type function pointers.

use std::collections::HashMap;

use bytes::{Buf, Bytes, BytesMut};

use crate::field::{FieldDef, FieldKind};
use crate::registry::{StructDefinition, TypeRegistry};
use crate::value::{StructVal, TypeId, UnionVal, Value};
use crate::RegistryError;

fn reborrow<'a>(dst: &'a mut Option<&mut BytesMut>) -> Option<&'a mut BytesMut> {
    dst.as_mut().map(|b| &mut **b)
}

/// Encodes `value` against `def`, recursively resolving nested structs
/// and unions through `registry`. `dst = None` is a dry run that still
/// returns the exact byte count a real write would produce.
pub fn encode_value(
    registry: &TypeRegistry,
    def: &StructDefinition,
    value: &StructVal,
    mut dst: Option<&mut BytesMut>,
) -> Result<usize, RegistryError> {
    if value.type_id != def.type_id {
        return Err(RegistryError::Malformed {
            expected: def.type_id,
            reason: "value's type_id does not match the definition being encoded against",
        });
    }

    if def.bit_packed {
        return encode_bit_packed(def, value, dst);
    }

    // Any field consulted as another field's companion length is
    // re-derived from the array's own length rather than trusted from
    // the caller-supplied scalar, so the wire is always self-consistent.
    let mut lengths: HashMap<&str, usize> = HashMap::new();
    for field in &def.fields {
        if let (FieldKind::Array(_), Some(len_field)) = (&field.kind, field.len_field) {
            if let Some(Value::Array(items)) = value.get(field.key) {
                lengths.insert(len_field, items.len());
            }
        }
    }

    let mut total = 0usize;
    for field in &def.fields {
        let field_value = value.get(field.key).ok_or(RegistryError::MissingField(field.key))?;
        total += encode_field(registry, field, field_value, lengths.get(field.key).copied(), reborrow(&mut dst))?;
    }
    Ok(total)
}

fn encode_field(
    registry: &TypeRegistry,
    field: &FieldDef,
    value: &Value,
    length_override: Option<usize>,
    dst: Option<&mut BytesMut>,
) -> Result<usize, RegistryError> {
    match &field.kind {
        FieldKind::U32 => {
            let v = length_override.map(|l| l as u32).or_else(|| as_u32(value)).ok_or(type_mismatch(field, "u32"))?;
            Ok(wire::codec::encode_u32(v, dst))
        }
        FieldKind::I32 => {
            let v = length_override.map(|l| l as i32).or_else(|| as_i32(value)).ok_or(type_mismatch(field, "i32"))?;
            Ok(wire::codec::encode_i32(v, dst))
        }
        FieldKind::U64 => {
            let Value::U64(v) = value else { return Err(type_mismatch(field, "u64")) };
            Ok(wire::codec::encode_u64(*v, dst))
        }
        FieldKind::I64 => {
            let Value::I64(v) = value else { return Err(type_mismatch(field, "i64")) };
            Ok(wire::codec::encode_i64(*v, dst))
        }
        FieldKind::F32(endian) => {
            let Value::F32(v) = value else { return Err(type_mismatch(field, "f32")) };
            Ok(wire::codec::encode_f32(*v, *endian, dst))
        }
        FieldKind::F64(endian) => {
            let Value::F64(v) = value else { return Err(type_mismatch(field, "f64")) };
            Ok(wire::codec::encode_f64(*v, *endian, dst))
        }
        FieldKind::Bytes { as_str } => {
            let bytes = match (value, as_str) {
                (Value::Bytes(b), _) => b.as_slice(),
                (Value::Str(s), true) => s.as_bytes(),
                _ => return Err(type_mismatch(field, if *as_str { "str" } else { "bytes" })),
            };
            Ok(wire::codec::encode_bytes(bytes, dst))
        }
        FieldKind::Struct(type_id) => {
            let Value::Struct(inner) = value else { return Err(type_mismatch(field, "struct")) };
            let inner_def = registry.get(*type_id)?;
            encode_value(registry, inner_def, inner, dst)
        }
        FieldKind::Union => {
            let Value::Union(u) = value else { return Err(type_mismatch(field, "union")) };
            encode_union(registry, u, dst)
        }
        FieldKind::BitPacked { .. } => {
            Err(RegistryError::Malformed { expected: TypeId(0), reason: "bit-packed field outside a bit-packed struct" })
        }
        FieldKind::Array(element) => {
            let Value::Array(items) = value else { return Err(type_mismatch(field, "array")) };
            encode_array(registry, field, element, items, dst)
        }
    }
}

fn encode_array(
    registry: &TypeRegistry,
    field: &FieldDef,
    element: &FieldKind,
    items: &[Value],
    mut dst: Option<&mut BytesMut>,
) -> Result<usize, RegistryError> {
    let mut elem_field = field.clone();
    elem_field.kind = element.clone();
    let mut total = 0usize;
    for item in items {
        total += encode_field(registry, &elem_field, item, None, reborrow(&mut dst))?;
    }
    Ok(total)
}

/// Encodes a union value: 4-byte discriminant then the payload struct
/// encoded per that discriminant's registered definition. Exposed (not
/// just used internally by [`encode_value`]) because envelope-style
/// callers — a command/response header with a union payload, say — need
/// to encode a union without an enclosing struct.
pub fn encode_union(registry: &TypeRegistry, union: &UnionVal, mut dst: Option<&mut BytesMut>) -> Result<usize, RegistryError> {
    let def = registry.get(union.type_id)?;
    let Value::Struct(payload) = &union.payload else {
        return Err(RegistryError::Malformed { expected: union.type_id, reason: "union payload must be a struct value" });
    };
    let discriminant_len = wire::codec::encode_u32(union.type_id.0, reborrow(&mut dst));
    let payload_len = encode_value(registry, def, payload, dst)?;
    Ok(discriminant_len + payload_len)
}

fn encode_bit_packed(def: &StructDefinition, value: &StructVal, dst: Option<&mut BytesMut>) -> Result<usize, RegistryError> {
    let mut word = 0u32;
    for field in &def.fields {
        let FieldKind::BitPacked { shift, width, .. } = field.kind else {
            return Err(RegistryError::Malformed { expected: def.type_id, reason: "non-bit-packed field in a bit-packed struct" });
        };
        let field_value = value.get(field.key).ok_or(RegistryError::MissingField(field.key))?;
        let raw = as_i64(field_value).ok_or(type_mismatch(field, "integer"))?;
        wire::codec::encode_bitfield(&mut word, raw, shift, width)?;
    }
    Ok(wire::codec::encode_u32(word, dst))
}

/// Decodes a struct of type `def.type_id` from `src`.
pub fn decode_value(registry: &TypeRegistry, def: &StructDefinition, src: &mut Bytes) -> Result<StructVal, RegistryError> {
    if def.bit_packed {
        return decode_bit_packed(def, src);
    }

    let mut out = StructVal::new(def.type_id);
    let mut lengths: HashMap<&str, usize> = HashMap::new();
    for field in &def.fields {
        let value = decode_field(registry, field, &lengths, src)?;
        if matches!(field.kind, FieldKind::U32 | FieldKind::I32) {
            if let Some(n) = as_u32(&value) {
                lengths.insert(field.key, n as usize);
            }
        }
        out.fields.push((field.key.to_string(), value));
    }
    Ok(out)
}

fn decode_field(
    registry: &TypeRegistry,
    field: &FieldDef,
    lengths: &HashMap<&str, usize>,
    src: &mut Bytes,
) -> Result<Value, RegistryError> {
    Ok(match &field.kind {
        FieldKind::U32 => Value::U32(wire::codec::decode_u32(src)?),
        FieldKind::I32 => Value::I32(wire::codec::decode_i32(src)?),
        FieldKind::U64 => Value::U64(wire::codec::decode_u64(src)?),
        FieldKind::I64 => Value::I64(wire::codec::decode_i64(src)?),
        FieldKind::F32(endian) => Value::F32(wire::codec::decode_f32(src, *endian)?),
        FieldKind::F64(endian) => Value::F64(wire::codec::decode_f64(src, *endian)?),
        FieldKind::Bytes { as_str } => {
            let bytes = wire::codec::decode_bytes(src)?;
            if *as_str {
                Value::Str(String::from_utf8(bytes).map_err(|_| RegistryError::Malformed {
                    expected: TypeId(0),
                    reason: "counted string field is not valid UTF-8",
                })?)
            } else {
                Value::Bytes(bytes)
            }
        }
        FieldKind::Struct(type_id) => {
            let inner_def = registry.get(*type_id)?;
            Value::Struct(decode_value(registry, inner_def, src)?)
        }
        FieldKind::Union => Value::Union(Box::new(decode_union(registry, src)?)),
        FieldKind::BitPacked { .. } => {
            return Err(RegistryError::Malformed { expected: TypeId(0), reason: "bit-packed field outside a bit-packed struct" });
        }
        FieldKind::Array(element) => {
            let len_field = field.len_field.ok_or(RegistryError::MissingLenField(field.key))?;
            let len = *lengths.get(len_field).ok_or(RegistryError::MissingLenField(len_field))?;
            let mut items = Vec::with_capacity(len);
            let mut elem_field = field.clone();
            elem_field.kind = (**element).clone();
            for _ in 0..len {
                items.push(decode_field(registry, &elem_field, lengths, src)?);
            }
            Value::Array(items)
        }
    })
}

/// Decodes a union value written by [`encode_union`].
pub fn decode_union(registry: &TypeRegistry, src: &mut Bytes) -> Result<UnionVal, RegistryError> {
    let type_id = TypeId(wire::codec::decode_u32(src)?);
    let def = registry.get(type_id)?;
    let payload = decode_value(registry, def, src)?;
    Ok(UnionVal { type_id, payload: Value::Struct(payload) })
}

fn decode_bit_packed(def: &StructDefinition, src: &mut Bytes) -> Result<StructVal, RegistryError> {
    if src.remaining() < 4 {
        return Err(wire::WireError::Truncated { expected: 4, actual: src.remaining() }.into());
    }
    let word = src.get_u32();
    let mut out = StructVal::new(def.type_id);
    for field in &def.fields {
        let FieldKind::BitPacked { shift, width, signed } = field.kind else {
            return Err(RegistryError::Malformed { expected: def.type_id, reason: "non-bit-packed field in a bit-packed struct" });
        };
        let value = if signed {
            Value::I32(wire::codec::decode_bitfield_signed(word, shift, width)?)
        } else {
            Value::U32(wire::codec::decode_bitfield_unsigned(word, shift, width)?)
        };
        out.fields.push((field.key.to_string(), value));
    }
    Ok(out)
}

/// Releases a decoded value tree. Ordinary `Drop` already frees every
/// heap-owned field recursively, including arrays of structs and arrays
/// of unions — the two cases the original source left as `assert(0)`
/// stubs. This entry point exists for API parity with callers that hold
/// a `Value` behind a type-erased handle and want an explicit release
/// point rather than waiting on scope exit.
pub fn deallocate(value: Value) {
    drop(value);
}

fn type_mismatch(field: &FieldDef, expected: &'static str) -> RegistryError {
    RegistryError::TypeMismatch { field: field.key, expected }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::U32(v) => Some(*v),
        Value::I32(v) => Some(*v as u32),
        _ => None,
    }
}

fn as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::I32(v) => Some(*v),
        Value::U32(v) => Some(*v as i32),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::U32(v) => Some(*v as i64),
        Value::I32(v) => Some(*v as i64),
        Value::U64(v) => Some(*v as i64),
        Value::I64(v) => Some(*v),
        _ => None,
    }
}
