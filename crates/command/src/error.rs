//! Error kinds (§7). These name failure *modes*, not wrapped library
//! types, so the command layer's callback surface stays stable even as
//! the crates underneath evolve.

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("encode buffer too small, {required} bytes required")]
    BufferTooSmall { required: usize },

    #[error("decode ran past the available bytes")]
    Truncated(#[from] wire::WireError),

    #[error("union discriminant has no registered definition")]
    UnknownType(#[from] registry::RegistryError),

    #[error("allocation failure while encoding")]
    AllocFailure,

    #[error("socket operation failed: {0}")]
    IoFailure(std::io::Error),

    #[error("name did not resolve to a port")]
    NameLookupFailed(String),

    #[error("no response within the deadline")]
    Timeout,

    #[error("peer returned a non-zero result: {result}")]
    PeerError { result: u32 },
}

impl From<ipc::IpcError> for CommandError {
    fn from(e: ipc::IpcError) -> Self {
        match e {
            ipc::IpcError::NameLookupFailed(name) => CommandError::NameLookupFailed(name),
            ipc::IpcError::Io(io) => CommandError::IoFailure(io),
            ipc::IpcError::Timeout => CommandError::Timeout,
        }
    }
}
