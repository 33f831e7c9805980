use crate::TypeId;
use wire::FloatEndian;

/// The wire shape of one field, selected per-field rather than via a
/// function-pointer "type functions" record: the aggregate codec walks
/// this tree generically instead of dispatching through per-type
/// encode/decode capabilities.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    U32,
    I32,
    U64,
    I64,
    F32(FloatEndian),
    F64(FloatEndian),
    /// A self-delimiting counted byte blob. `as_str` selects whether the
    /// decoded value is presented as [`crate::Value::Str`] (UTF-8) or
    /// [`crate::Value::Bytes`] (opaque). There is deliberately no
    /// standalone `Str` kind usable outside an array or on its own: the
    /// original's `decode_string` entry `assert(0)`s ("strings outside
    /// arrays not supported"), preserved here by construction.
    Bytes { as_str: bool },
    /// A nested struct, dispatched through the registry by `TypeId`.
    Struct(TypeId),
    /// A tagged union: 4-byte discriminant, then the payload encoded per
    /// the discriminant's registered definition.
    Union,
    /// One field of a bit-packed struct's single 32-bit word.
    BitPacked { shift: u32, width: u32, signed: bool },
    /// A fixed-length array of `element`. Unlike `Bytes`, this has no
    /// count prefix on the wire: its length is carried by a sibling
    /// field named in [`FieldDef::len_field`].
    Array(Box<FieldKind>),
}

/// One field of a struct's layout, standing in for the original's
/// byte-offset `FieldDefinition`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Symbolic key used to look the field up in a [`crate::StructVal`].
    pub key: &'static str,
    /// Human-readable name used by renderers.
    pub name: &'static str,
    pub unit: Option<&'static str>,
    /// Engineering-units conversion applied only by the HUMAN renderer.
    pub conversion: Option<fn(f64) -> f64>,
    pub kind: FieldKind,
    /// For `FieldKind::Array`, the key of the sibling scalar field that
    /// carries the element count. Must name a field declared earlier in
    /// the same [`crate::StructDefinition::fields`] table, mirroring the
    /// original's requirement that the length field be already decoded
    /// before the array field that consults it.
    pub len_field: Option<&'static str>,
}

impl FieldDef {
    pub const fn new(key: &'static str, name: &'static str, kind: FieldKind) -> Self {
        Self { key, name, unit: None, conversion: None, kind, len_field: None }
    }

    pub const fn with_unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_conversion(mut self, conversion: fn(f64) -> f64) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub const fn with_len_field(mut self, len_field: &'static str) -> Self {
        self.len_field = Some(len_field);
        self
    }
}
