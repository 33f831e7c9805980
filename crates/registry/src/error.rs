use crate::TypeId;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("type {0:?} is already registered")]
    AlreadyRegistered(TypeId),

    #[error("no struct definition registered for type {0:?}")]
    UnknownType(TypeId),

    #[error("struct value for type {expected:?} does not match its definition: {reason}")]
    Malformed { expected: TypeId, reason: &'static str },

    #[error("field '{0}' is missing from the struct value")]
    MissingField(&'static str),

    #[error("field '{field}' expected a {expected} value")]
    TypeMismatch { field: &'static str, expected: &'static str },

    #[error("array field '{0}' has no companion length field")]
    MissingLenField(&'static str),

    #[error(transparent)]
    Wire(#[from] wire::WireError),
}
