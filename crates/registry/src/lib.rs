//! The type registry and codec: a pluggable, type-indexed framework for
//! encoding and decoding structured XDR messages, including tagged
//! unions, bit-packed structs, and counted arrays.

mod codec;
mod error;
mod field;
mod registry;
mod value;

pub use codec::{decode_union, decode_value, deallocate, encode_union, encode_value};
pub use error::RegistryError;
pub use field::{FieldDef, FieldKind};
pub use registry::{Populator, StructDefinition, TypeRegistry, TypeRegistryBuilder};
pub use value::{StructVal, TypeId, UnionVal, Value};
