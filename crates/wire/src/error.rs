/// Error returned by a primitive codec operating on a wire buffer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("bit-packed field width {width} exceeds 32 bits")]
    BitWidthOverflow { width: u32 },
}
