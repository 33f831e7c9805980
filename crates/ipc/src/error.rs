#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("name '{0}' did not resolve to a port through any lookup tier")]
    NameLookupFailed(String),

    #[error("socket operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("no response within the deadline")]
    Timeout,
}
