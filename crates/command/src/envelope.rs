//! Command/Response envelopes (§4.6, §6): fixed header fields followed by
//! a union payload encoded through the registry's union codec.

use bytes::{Bytes, BytesMut};
use registry::{RegistryError, TypeRegistry, UnionVal};

/// `cmd` value reserved for Response envelopes; never a valid Command
/// discriminant.
pub const RESPONSE_SENTINEL: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub cmd: u32,
    pub ipcref: u32,
    pub parameters: UnionVal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub ipcref: u32,
    pub result: u32,
    pub data: UnionVal,
}

impl Command {
    pub fn new(cmd: u32, ipcref: u32, parameters: UnionVal) -> Self {
        Self { cmd, ipcref, parameters }
    }

    /// Starts with a 1 KiB scratch buffer; `BytesMut` grows on demand, so
    /// the "buffer too small, retry with the reported size" path the
    /// original two-pass encoder needs never triggers here — the initial
    /// capacity is just a sizing hint, not a hard ceiling.
    pub fn encode(&self, registry: &TypeRegistry) -> Result<BytesMut, RegistryError> {
        self.encode_with_capacity(registry, 1024)
    }

    /// As [`Command::encode`], but with a caller-chosen initial capacity
    /// (§10.3's `CommandConfig::encode_scratch_size`).
    pub fn encode_with_capacity(&self, registry: &TypeRegistry, capacity: usize) -> Result<BytesMut, RegistryError> {
        let mut buf = BytesMut::with_capacity(capacity);
        wire::codec::encode_u32(self.cmd, Some(&mut buf));
        wire::codec::encode_u32(self.ipcref, Some(&mut buf));
        registry::encode_union(registry, &self.parameters, Some(&mut buf))?;
        Ok(buf)
    }

    pub fn decode(registry: &TypeRegistry, src: &mut Bytes) -> Result<Self, RegistryError> {
        let cmd = wire::codec::decode_u32(src)?;
        let ipcref = wire::codec::decode_u32(src)?;
        let parameters = registry::decode_union(registry, src)?;
        Ok(Self { cmd, ipcref, parameters })
    }
}

impl Response {
    pub fn new(ipcref: u32, result: u32, data: UnionVal) -> Self {
        Self { ipcref, result, data }
    }

    pub fn encode(&self, registry: &TypeRegistry) -> Result<BytesMut, RegistryError> {
        self.encode_with_capacity(registry, 1024)
    }

    /// As [`Response::encode`], but with a caller-chosen initial capacity
    /// (§10.3's `CommandConfig::encode_scratch_size`).
    pub fn encode_with_capacity(&self, registry: &TypeRegistry, capacity: usize) -> Result<BytesMut, RegistryError> {
        let mut buf = BytesMut::with_capacity(capacity);
        wire::codec::encode_u32(RESPONSE_SENTINEL, Some(&mut buf));
        wire::codec::encode_u32(self.ipcref, Some(&mut buf));
        wire::codec::encode_u32(self.result, Some(&mut buf));
        registry::encode_union(registry, &self.data, Some(&mut buf))?;
        Ok(buf)
    }

    /// Decodes a Response envelope. Per §4.6, a non-zero `result` marks an
    /// error reply whose payload receivers should not attempt to
    /// interpret; this still decodes it (the union discriminant for an
    /// error payload is typically a void/empty type), leaving the
    /// `result != 0` check to the caller.
    pub fn decode(registry: &TypeRegistry, src: &mut Bytes) -> Result<Self, RegistryError> {
        let cmd = wire::codec::decode_u32(src)?;
        if cmd != RESPONSE_SENTINEL {
            return Err(RegistryError::Malformed {
                expected: registry::TypeId(RESPONSE_SENTINEL),
                reason: "cmd field of a Response envelope must equal RESPONSE_SENTINEL",
            });
        }
        let ipcref = wire::codec::decode_u32(src)?;
        let result = wire::codec::decode_u32(src)?;
        let data = registry::decode_union(registry, src)?;
        Ok(Self { ipcref, result, data })
    }

    pub fn is_error(&self) -> bool {
        self.result != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::{FieldDef, FieldKind, StructDefinition, TypeId, Value};

    fn registry_with_uint32_payload() -> TypeRegistry {
        let mut builder = TypeRegistry::builder();
        builder.register(StructDefinition::new(TypeId(7), vec![FieldDef::new("v", "V", FieldKind::U32)])).unwrap();
        builder.build()
    }

    #[test]
    fn command_round_trips_through_wire() {
        let registry = registry_with_uint32_payload();
        let payload = registry::StructVal::new(TypeId(7)).with_field("v", Value::U32(42));
        let cmd = Command::new(3, 100, UnionVal { type_id: TypeId(7), payload: Value::Struct(payload) });

        let mut buf = cmd.encode(&registry).unwrap().freeze();
        let decoded = Command::decode(&registry, &mut buf).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn response_encodes_sentinel_and_matches_ipcref() {
        let registry = registry_with_uint32_payload();
        let payload = registry::StructVal::new(TypeId(7)).with_field("v", Value::U32(0));
        let resp = Response::new(100, 0, UnionVal { type_id: TypeId(7), payload: Value::Struct(payload) });

        let mut buf = resp.encode(&registry).unwrap();
        assert_eq!(&buf[0..4], &RESPONSE_SENTINEL.to_be_bytes());
        let mut frozen = buf.split().freeze();
        let decoded = Response::decode(&registry, &mut frozen).unwrap();
        assert_eq!(decoded.ipcref, 100);
        assert!(!decoded.is_error());
    }
}
