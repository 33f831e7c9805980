//! The blocking send/wait/receive helper (§4.5, §6). Opens an ephemeral
//! endpoint, sends the payload, and waits for a reply using `polling`
//! rather than a sleep-and-poll loop, recomputing the remaining timeout on
//! every wake so a spurious wakeup can never extend the effective deadline.

use std::net::SocketAddr;
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

use polling::{Event, Events, PollMode, Poller};
use tracing::{instrument, warn};

use crate::error::IpcError;
use crate::socket::Endpoint;

/// Sends `payload` to `dst` from a fresh ephemeral endpoint and blocks for
/// up to `timeout` waiting for a single reply datagram, writing it into
/// `reply_buf`. Returns the number of bytes written and the sender address.
#[instrument(skip(payload, reply_buf), fields(dst = %dst, len = payload.len(), timeout_ms = timeout.as_millis()))]
pub fn request_reply(
    dst: SocketAddr,
    payload: &[u8],
    reply_buf: &mut [u8],
    timeout: Duration,
) -> Result<(usize, SocketAddr), IpcError> {
    let endpoint = Endpoint::ephemeral()?;
    endpoint.send(dst, payload)?;

    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!(?dst, "blocking request timed out");
            return Err(IpcError::Timeout);
        }
        if wait_readable(&endpoint, remaining)? {
            if let Some((n, src)) = endpoint.recv(reply_buf)? {
                return Ok((n, src));
            }
            // Spurious wakeup: loop back and recompute the remaining time.
        }
    }
}

fn wait_readable(endpoint: &Endpoint, timeout: Duration) -> Result<bool, IpcError> {
    let poller = Poller::new()?;
    let fd = endpoint.raw().as_raw_fd();
    // SAFETY: `fd` stays open and registered for the lifetime of this
    // call; it is deregistered below before `poller` (and the borrow of
    // `endpoint` it implies) goes out of scope.
    unsafe {
        poller.add_with_mode(fd, Event::readable(0), PollMode::Oneshot)?;
    }

    let mut events = Events::new();
    let timed_out = poller.wait(&mut events, Some(timeout))?;
    poller.delete(endpoint.raw())?;

    Ok(timed_out > 0)
}
