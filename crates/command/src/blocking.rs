//! Blocking send mode (§4.6): no host loop, just open-send-wait-close.

use std::net::SocketAddr;

use bytes::Bytes;
use registry::TypeRegistry;
use tracing::debug;

use crate::config::CommandConfig;
use crate::envelope::{Command, Response};
use crate::error::CommandError;

/// Sends `command` to `dst`, blocks up to `config.default_timeout` for a
/// single reply, and decodes it through `registry`. A `Response` with
/// `result != 0` is still returned to the caller (as
/// `Err(CommandError::PeerError)`) rather than silently swallowed, per
/// §4.6's "receivers SHOULD NOT attempt to decode the payload" — the
/// payload is decoded here only to keep the envelope well-formed on the
/// wire; callers that hit `PeerError` must not inspect `Response::data`.
pub fn send_blocking(
    registry: &TypeRegistry,
    dst: SocketAddr,
    command: &Command,
    config: &CommandConfig,
) -> Result<Response, CommandError> {
    debug!(cmd = command.cmd, ipcref = command.ipcref, ?dst, "sending blocking command");
    let encoded = command.encode_with_capacity(registry, config.encode_scratch_size)?;

    let mut reply_buf = vec![0u8; config.reply_buffer_size];
    let (n, _src) = ipc::request_reply(dst, &encoded, &mut reply_buf, config.default_timeout)?;

    let mut bytes = Bytes::copy_from_slice(&reply_buf[..n]);
    let response = Response::decode(registry, &mut bytes)?;

    if response.is_error() {
        return Err(CommandError::PeerError { result: response.result });
    }
    Ok(response)
}
