//! The async send path's host-loop boundary (§4.6, §6). The core only
//! consumes three capabilities — register a pending response, cancel/
//! deliver it by `ipcref`, and send raw bytes — so callers plug in
//! whatever event loop they already run. [`InMemoryHostLoop`] is a
//! reference implementation used by the test crate and the example
//! daemon; it is not meant to be the only one.

use std::net::SocketAddr;
use std::time::Instant;

use dashmap::DashMap;
use registry::{TypeRegistry, UnionVal};
use tracing::trace;

use crate::envelope::Response;
use crate::error::CommandError;

/// Distinguishes why a pending response's callback fired (§5
/// "Cancellation & timeout").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbType {
    Reply,
    Error,
}

pub type PendingCallback = Box<dyn FnOnce(CbType, Option<UnionVal>) + Send>;

struct PendingEntry {
    dst: SocketAddr,
    deadline: Instant,
    callback: PendingCallback,
}

/// Capabilities the command layer needs from a host event loop.
pub trait HostLoop {
    fn register_pending(&self, ipcref: u32, dst: SocketAddr, deadline: Instant, callback: PendingCallback);

    /// Delivers a decoded reply to the pending entry matching `ipcref`,
    /// if any, consuming it. Returns `true` if an entry was found.
    fn deliver(&self, ipcref: u32, payload: UnionVal) -> bool;

    /// Cancels and fires the entry matching `ipcref` with `CbType::Error`
    /// and no payload, if any. Returns `true` if an entry was found.
    fn cancel(&self, ipcref: u32) -> bool;

    fn send_raw(&self, dst: SocketAddr, bytes: &[u8]) -> Result<(), CommandError>;
}

/// A single-threaded, in-process reference host loop. `poll_timeouts`
/// must be driven periodically by the owner (there is no background
/// thread); this matches the single-threaded cooperative model of §5.
pub struct InMemoryHostLoop {
    endpoint: ipc::Endpoint,
    pending: DashMap<u32, PendingEntry>,
}

impl InMemoryHostLoop {
    pub fn new(endpoint: ipc::Endpoint) -> Self {
        Self { endpoint, pending: DashMap::new() }
    }

    pub fn endpoint(&self) -> &ipc::Endpoint {
        &self.endpoint
    }

    /// Fires (and removes) every pending entry whose deadline has passed,
    /// with `CbType::Error`. Call this on every loop tick.
    pub fn poll_timeouts(&self) {
        let now = Instant::now();
        let expired: Vec<u32> = self
            .pending
            .iter()
            .filter_map(|entry| if entry.deadline <= now { Some(*entry.key()) } else { None })
            .collect();
        for ipcref in expired {
            if let Some((_, entry)) = self.pending.remove(&ipcref) {
                trace!(ipcref, "pending response timed out");
                (entry.callback)(CbType::Error, None);
            }
        }
    }

    /// Does one non-blocking read on the underlying endpoint; if a
    /// datagram arrived, decodes it as a `Response` and delivers it to
    /// the matching pending entry. Returns `true` if a datagram was read
    /// (whether or not it matched a pending entry), `false` if the
    /// socket had nothing waiting. Call this on every loop tick alongside
    /// `poll_timeouts`.
    pub fn poll_recv(&self, registry: &TypeRegistry) -> Result<bool, CommandError> {
        let mut buf = [0u8; 4096];
        let Some((n, _src)) = self.endpoint.recv(&mut buf)? else {
            return Ok(false);
        };
        let mut bytes = bytes::Bytes::copy_from_slice(&buf[..n]);
        let response = match Response::decode(registry, &mut bytes) {
            Ok(response) => response,
            Err(e) => {
                trace!(error = %e, "dropping undecodable reply datagram");
                return Ok(true);
            }
        };
        if response.is_error() {
            self.cancel(response.ipcref);
        } else {
            self.deliver(response.ipcref, response.data);
        }
        Ok(true)
    }
}

impl HostLoop for InMemoryHostLoop {
    fn register_pending(&self, ipcref: u32, dst: SocketAddr, deadline: Instant, callback: PendingCallback) {
        self.pending.insert(ipcref, PendingEntry { dst, deadline, callback });
    }

    fn deliver(&self, ipcref: u32, payload: UnionVal) -> bool {
        match self.pending.remove(&ipcref) {
            Some((_, entry)) => {
                (entry.callback)(CbType::Reply, Some(payload));
                true
            }
            None => false,
        }
    }

    fn cancel(&self, ipcref: u32) -> bool {
        match self.pending.remove(&ipcref) {
            Some((_, entry)) => {
                (entry.callback)(CbType::Error, None);
                true
            }
            None => false,
        }
    }

    fn send_raw(&self, dst: SocketAddr, bytes: &[u8]) -> Result<(), CommandError> {
        self.endpoint.send(dst, bytes)?;
        Ok(())
    }
}
