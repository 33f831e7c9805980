#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Registry(#[from] registry::RegistryError),

    #[error("field '{0}' is a struct/union/bit-packed field and cannot be scanned from a single token")]
    NotScannable(&'static str),

    #[error("could not parse '{token}' as {expected}")]
    InvalidToken { token: String, expected: &'static str },

    #[error("byte array token '{0}' does not have an even number of hex characters")]
    OddHexLength(String),

    #[error("invalid hex digit in '{0}'")]
    InvalidHex(String),
}
