mod async_send;
mod blocking;
mod config;
mod envelope;
mod error;
mod host_loop;
mod ipcref;

pub use async_send::send_async;
pub use blocking::send_blocking;
pub use config::CommandConfig;
pub use envelope::{Command, Response, RESPONSE_SENTINEL};
pub use error::CommandError;
pub use host_loop::{CbType, HostLoop, InMemoryHostLoop, PendingCallback};
pub use ipcref::IpcRefCounter;
