//! Typed configuration surface for the command layer (§10.3).

use std::time::Duration;

/// Tunables for a blocking or async send. Plain, caller-constructed, no
/// global state — matching [`ipc::EndpointConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    /// How long `send_blocking` waits for a single reply before giving up.
    pub default_timeout: Duration,
    /// Initial `BytesMut` capacity hint passed to `Command`/`Response`
    /// encoding (§4.6's 1 KiB scratch buffer).
    pub encode_scratch_size: usize,
    /// Size of the stack buffer `send_blocking` reads a reply into.
    pub reply_buffer_size: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(500),
            encode_scratch_size: 1024,
            reply_buffer_size: 4096,
        }
    }
}
