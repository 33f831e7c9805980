mod log;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use command::{Command, CommandConfig, IpcRefCounter, Response};
use ipc::Endpoint;
use log::Logging;
use registry::{FieldDef, FieldKind, StructDefinition, StructVal, TypeId, TypeRegistry, UnionVal, Value};
use render::{Style, render};
use tracing::{info, instrument, warn};

const PING_TYPE: TypeId = TypeId(1);
const PING_CMD: u32 = 1;

fn build_registry() -> TypeRegistry {
    let mut builder = TypeRegistry::builder();
    builder
        .register(StructDefinition::new(PING_TYPE, vec![FieldDef::new("value", "Value", FieldKind::U32)]))
        .expect("PING_TYPE registered exactly once at startup");
    builder.build()
}

/// A minimal echo responder standing in for a real host loop, so the demo
/// below has something to talk to. Loops on one endpoint, decoding each
/// datagram as a Command and replying with its value unchanged.
fn spawn_echo_responder(registry: TypeRegistry) -> anyhow::Result<SocketAddr> {
    let endpoint = Endpoint::ephemeral()?;
    let addr = endpoint.local_addr()?;
    std::thread::spawn(move || {
        let mut buf = vec![0u8; 4096];
        loop {
            let Ok(Some((n, src))) = endpoint.recv(&mut buf) else {
                std::thread::sleep(Duration::from_millis(5));
                continue;
            };
            let mut bytes = bytes::Bytes::copy_from_slice(&buf[..n]);
            let command = match Command::decode(&registry, &mut bytes) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "dropping malformed command");
                    continue;
                }
            };
            let response = Response::new(command.ipcref, 0, command.parameters);
            if let Ok(encoded) = response.encode(&registry) {
                let _ = endpoint.send(src, &encoded);
            }
        }
    });
    Ok(addr)
}

#[instrument(skip_all, name = "trace_start_daemon")]
fn main() -> anyhow::Result<()> {
    let logging = Logging::new();
    logging.early_init();
    info!("daemon starting");

    let registry = build_registry();
    let responder_addr = spawn_echo_responder(registry.clone()).context("starting echo responder")?;

    let ipcref_counter = IpcRefCounter::new();
    let payload = StructVal::new(PING_TYPE).with_field("value", Value::U32(0x2A));
    let command = Command::new(PING_CMD, ipcref_counter.next(), UnionVal { type_id: PING_TYPE, payload: Value::Struct(payload) });

    let command_config = CommandConfig { default_timeout: Duration::from_millis(200), ..CommandConfig::default() };
    let response = command::send_blocking(&registry, responder_addr, &command, &command_config)
        .context("blocking ping failed")?;

    let def = registry.get(PING_TYPE)?;
    let Value::Struct(data) = &response.data.payload else {
        anyhow::bail!("ping response payload was not a struct");
    };
    let rendered = render(&registry, def, data, Style::Human)?;
    info!(ipcref = response.ipcref, "ping succeeded\n{rendered}");

    Ok(())
}
