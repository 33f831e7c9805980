use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::field::FieldDef;
use crate::value::{StructVal, TypeId};
use crate::RegistryError;

/// An application-supplied factory that fills a freshly built struct with
/// live values (e.g. a telemetry snapshot). Optional; most registered
/// types carry none.
pub type Populator = Arc<dyn Fn() -> StructVal + Send + Sync>;

/// For one `type_id`: its field layout and whether it is bit-packed.
///
/// The original's separate encoder/decoder/allocator/printer capabilities
/// collapse into one generic walk over `fields` here, because every field
/// carries enough metadata (`kind`, `name`, `unit`, `conversion`) for the
/// aggregate codec and the renderer to handle it without a type-specific
/// callback. Only the `populator` capability remains genuinely
/// type-specific and is kept as an explicit hook.
pub struct StructDefinition {
    pub type_id: TypeId,
    pub fields: Vec<FieldDef>,
    /// Bit-packed structs occupy exactly one 32-bit wire word; every
    /// field's kind must be `FieldKind::BitPacked` and widths must sum
    /// to at most 32 (checked at registration).
    pub bit_packed: bool,
    pub populator: Option<Populator>,
}

impl std::fmt::Debug for StructDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructDefinition")
            .field("type_id", &self.type_id)
            .field("fields", &self.fields)
            .field("bit_packed", &self.bit_packed)
            .field("populator", &self.populator.is_some())
            .finish()
    }
}

impl StructDefinition {
    pub fn new(type_id: TypeId, fields: Vec<FieldDef>) -> Self {
        Self { type_id, fields, bit_packed: false, populator: None }
    }

    pub fn bit_packed(type_id: TypeId, fields: Vec<FieldDef>) -> Self {
        Self { type_id, fields, bit_packed: true, populator: None }
    }

    pub fn with_populator(mut self, populator: Populator) -> Self {
        self.populator = Some(populator);
        self
    }
}

/// A process-wide, write-once, frozen-after-build map from `type_id` to
/// [`StructDefinition`]. Built once at startup via [`TypeRegistryBuilder`]
/// then shared immutably for the rest of the process's life — there is
/// no unregister and no runtime mutation once built.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    defs: Arc<HashMap<TypeId, Arc<StructDefinition>>>,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    pub fn get(&self, type_id: TypeId) -> Result<&Arc<StructDefinition>, RegistryError> {
        self.defs.get(&type_id).ok_or(RegistryError::UnknownType(type_id))
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.defs.contains_key(&type_id)
    }
}

#[derive(Default)]
pub struct TypeRegistryBuilder {
    defs: HashMap<TypeId, Arc<StructDefinition>>,
}

impl TypeRegistryBuilder {
    /// Registers a struct definition. Write-once per `type_id`: a second
    /// registration for the same id is rejected rather than silently
    /// overwriting the first.
    #[instrument(skip(self, def), fields(type_id = def.type_id.0, bit_packed = def.bit_packed, fields = def.fields.len()))]
    pub fn register(&mut self, def: StructDefinition) -> Result<&mut Self, RegistryError> {
        if self.defs.contains_key(&def.type_id) {
            tracing::warn!(type_id = def.type_id.0, "rejected duplicate registration");
            return Err(RegistryError::AlreadyRegistered(def.type_id));
        }
        if def.bit_packed {
            let total_width: u32 = def
                .fields
                .iter()
                .map(|f| match f.kind {
                    crate::field::FieldKind::BitPacked { width, .. } => width,
                    _ => 0,
                })
                .sum();
            if total_width > 32 {
                return Err(RegistryError::Malformed {
                    expected: def.type_id,
                    reason: "bit-packed field widths sum to more than 32",
                });
            }
        }
        tracing::debug!(type_id = def.type_id.0, "type registered");
        self.defs.insert(def.type_id, Arc::new(def));
        Ok(self)
    }

    /// Freezes the registry. No further registration is possible after
    /// this point.
    pub fn build(self) -> TypeRegistry {
        TypeRegistry { defs: Arc::new(self.defs) }
    }
}
