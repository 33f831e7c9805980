//! The async send mode (§4.6): encode, hand the bytes to the host loop,
//! and register the pending entry the host loop fires on reply or timeout.
//! Unlike `send_blocking`, this never waits — it returns as soon as the
//! datagram is on the wire.

use std::net::SocketAddr;
use std::time::Instant;

use registry::TypeRegistry;
use tracing::debug;

use crate::config::CommandConfig;
use crate::envelope::Command;
use crate::error::CommandError;
use crate::host_loop::{HostLoop, PendingCallback};

/// Encodes `command`, sends it via `host_loop.send_raw`, then registers
/// `callback` against `command.ipcref` so the host loop can fire it on
/// reply (via `HostLoop::deliver`) or on timeout past `deadline` (via
/// whatever periodic sweep the host loop runs, e.g.
/// `InMemoryHostLoop::poll_timeouts`).
pub fn send_async(
    host_loop: &dyn HostLoop,
    registry: &TypeRegistry,
    dst: SocketAddr,
    command: &Command,
    config: &CommandConfig,
    callback: PendingCallback,
    deadline: Instant,
) -> Result<(), CommandError> {
    debug!(cmd = command.cmd, ipcref = command.ipcref, ?dst, "sending async command");
    let encoded = command.encode_with_capacity(registry, config.encode_scratch_size)?;
    host_loop.send_raw(dst, &encoded)?;
    host_loop.register_pending(command.ipcref, dst, deadline, callback);
    Ok(())
}
