//! Name→port resolution (§4.5): OS service database, then the built-in
//! table, then a decimal-string fallback.

use std::ffi::CString;

use tracing::trace;

use crate::service_table::lookup_builtin;

/// Resolves `name` to a local UDP port, trying each tier in order. The
/// original's "unknown" sentinel becomes `None`.
pub fn resolve_udp_port(name: &str) -> Option<u16> {
    if let Some(port) = getservbyname_udp(name) {
        trace!(name, port, tier = "os-service-db", "resolved service name");
        return Some(port);
    }
    if let Some(entry) = lookup_builtin(name) {
        trace!(name, port = entry.unicast_port, tier = "builtin-table", "resolved service name");
        return Some(entry.unicast_port);
    }
    if let Ok(port) = name.parse::<u16>() {
        trace!(name, port, tier = "decimal-port", "resolved service name");
        return Some(port);
    }
    None
}

/// Consults `getservbyname(name, "udp")`. Not safe to call concurrently
/// from multiple threads (the underlying libc call returns a pointer into
/// a static buffer on most platforms); consistent with the single-
/// threaded cooperative model this crate assumes (§5).
fn getservbyname_udp(name: &str) -> Option<u16> {
    let cname = CString::new(name).ok()?;
    let proto = CString::new("udp").ok()?;
    // SAFETY: both C strings outlive the call; `servent` is only read
    // while still valid (before any other libc call on this thread could
    // overwrite the static buffer it points into).
    unsafe {
        let servent = libc::getservbyname(cname.as_ptr(), proto.as_ptr());
        if servent.is_null() {
            return None;
        }
        // s_port is stored in network byte order by getservbyname.
        Some(u16::from_be((*servent).s_port as u16))
    }
}
