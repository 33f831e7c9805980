//! End-to-end coverage over real loopback UDP sockets, exercising the
//! wire codec, the type registry, the IPC endpoint, and the command
//! layer together rather than in isolation.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use command::{CbType, Command, CommandConfig, InMemoryHostLoop, IpcRefCounter, Response};
use ipc::Endpoint;
use registry::{FieldDef, FieldKind, StructDefinition, StructVal, TypeId, TypeRegistry, UnionVal, Value};
use render::{Style, render};

const PING: TypeId = TypeId(1);
const COUNTER: TypeId = TypeId(2);
const PING_CMD: u32 = 1;

fn registry_with_ping_and_counter() -> TypeRegistry {
    let mut builder = TypeRegistry::builder();
    builder.register(StructDefinition::new(PING, vec![FieldDef::new("value", "Value", FieldKind::U32)])).unwrap();
    builder
        .register(StructDefinition::new(
            COUNTER,
            vec![FieldDef::new("count", "Count", FieldKind::I64)],
        ))
        .unwrap();
    builder.build()
}

fn spawn_echo_responder(registry: TypeRegistry) -> SocketAddr {
    let endpoint = Endpoint::ephemeral().unwrap();
    let addr = endpoint.local_addr().unwrap();
    std::thread::spawn(move || {
        let mut buf = vec![0u8; 4096];
        loop {
            match endpoint.recv(&mut buf) {
                Ok(Some((n, src))) => {
                    let mut bytes = Bytes::copy_from_slice(&buf[..n]);
                    let Ok(command) = Command::decode(&registry, &mut bytes) else { continue };
                    let response = Response::new(command.ipcref, 0, command.parameters);
                    if let Ok(encoded) = response.encode(&registry) {
                        let _ = endpoint.send(src, &encoded);
                    }
                }
                _ => std::thread::sleep(Duration::from_millis(2)),
            }
        }
    });
    addr
}

// S1 — uint32 round trip, driven through the full struct codec instead of
// the primitive codec directly.
#[test]
fn s1_uint32_round_trips_through_struct_codec() {
    let registry = registry_with_ping_and_counter();
    let def = registry.get(PING).unwrap();
    let value = StructVal::new(PING).with_field("value", Value::U32(0xDEAD_BEEF));

    let mut buf = bytes::BytesMut::new();
    registry::encode_value(&registry, def, &value, Some(&mut buf)).unwrap();
    assert_eq!(&buf[..], &[0xDE, 0xAD, 0xBE, 0xEF]);

    let mut src = buf.freeze();
    assert_eq!(registry::decode_value(&registry, def, &mut src).unwrap(), value);
}

// S2 — byte array padding, via a registered Bytes-field struct.
#[test]
fn s2_byte_array_pads_to_four_byte_alignment() {
    let mut builder = TypeRegistry::builder();
    let blob_type = TypeId(3);
    builder
        .register(StructDefinition::new(blob_type, vec![FieldDef::new("blob", "Blob", FieldKind::Bytes { as_str: false })]))
        .unwrap();
    let registry = builder.build();
    let def = registry.get(blob_type).unwrap();

    let value = StructVal::new(blob_type).with_field("blob", Value::Bytes(vec![1, 2, 3, 4, 5]));
    let mut buf = bytes::BytesMut::new();
    registry::encode_value(&registry, def, &value, Some(&mut buf)).unwrap();
    assert_eq!(buf.len(), 12);
    assert_eq!(&buf[..], &[0, 0, 0, 5, 1, 2, 3, 4, 5, 0, 0, 0]);

    let mut src = buf.freeze();
    assert_eq!(registry::decode_value(&registry, def, &mut src).unwrap(), value);
}

// S3 — int64, via a registered struct whose single field is i64.
#[test]
fn s3_int64_round_trips_through_struct_codec() {
    let registry = registry_with_ping_and_counter();
    let def = registry.get(COUNTER).unwrap();
    let value = StructVal::new(COUNTER).with_field("count", Value::I64(-2));

    let mut buf = bytes::BytesMut::new();
    registry::encode_value(&registry, def, &value, Some(&mut buf)).unwrap();
    assert_eq!(&buf[..], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]);
}

// S4 — bit-packed struct, rendered afterward to confirm the rendering
// layer also understands bit-packed fields' decoded values.
#[test]
fn s4_bit_packed_struct_round_trips_and_renders() {
    let mut builder = TypeRegistry::builder();
    let packed_type = TypeId(4);
    builder
        .register(StructDefinition::bit_packed(
            packed_type,
            vec![
                FieldDef::new("a", "A", FieldKind::BitPacked { shift: 0, width: 4, signed: false }),
                FieldDef::new("b", "B", FieldKind::BitPacked { shift: 4, width: 4, signed: false }),
            ],
        ))
        .unwrap();
    let registry = builder.build();
    let def = registry.get(packed_type).unwrap();

    let value = StructVal::new(packed_type).with_field("a", Value::U32(0xA)).with_field("b", Value::U32(0x3));
    let mut buf = bytes::BytesMut::new();
    registry::encode_value(&registry, def, &value, Some(&mut buf)).unwrap();
    assert_eq!(&buf[..], &[0x00, 0x00, 0x00, 0x3A]);

    let mut src = buf.freeze();
    let decoded = registry::decode_value(&registry, def, &mut src).unwrap();
    let rendered = render(&registry, def, &decoded, Style::CsvData).unwrap();
    assert_eq!(rendered, "10,3");
}

// S5 — union envelope, via the Command codec (discriminant + payload).
#[test]
fn s5_union_envelope_round_trips_over_the_command_codec() {
    let registry = registry_with_ping_and_counter();
    let payload = StructVal::new(PING).with_field("value", Value::U32(0x1122_3344));
    let command = Command::new(PING_CMD, 0, UnionVal { type_id: PING, payload: Value::Struct(payload) });

    let mut encoded = command.encode(&registry).unwrap().freeze();
    // cmd (4) + ipcref (4) + discriminant (4) + payload (4) = 16 bytes.
    assert_eq!(encoded.len(), 16);
    assert_eq!(&encoded[8..], &[0x00, 0x00, 0x00, 0x01, 0x11, 0x22, 0x33, 0x44]);

    let decoded = Command::decode(&registry, &mut encoded).unwrap();
    assert_eq!(decoded, command);
}

// S6 — blocking request timeout: no listener on the destination port, a
// 50ms deadline must produce a timeout error within 50-100ms.
#[test]
fn s6_blocking_request_to_silent_port_times_out_in_window() {
    let registry = registry_with_ping_and_counter();
    let silent: SocketAddr = "127.0.0.1:1".parse().unwrap();
    let ipcref_counter = IpcRefCounter::new();
    let payload = StructVal::new(PING).with_field("value", Value::U32(1));
    let command = Command::new(PING_CMD, ipcref_counter.next(), UnionVal { type_id: PING, payload: Value::Struct(payload) });

    let config = CommandConfig { default_timeout: Duration::from_millis(50), ..CommandConfig::default() };
    let start = Instant::now();
    let result = command::send_blocking(&registry, silent, &command, &config);
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(command::CommandError::Timeout) | Err(command::CommandError::IoFailure(_))));
    assert!(elapsed >= Duration::from_millis(45), "fired too early: {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(150), "fired too late: {elapsed:?}");
}

// Property 5 — two sequentially issued commands have strictly increasing
// ipcref, exercised against a live echo responder.
#[test]
fn property_sequential_commands_have_strictly_increasing_ipcref() {
    let registry = registry_with_ping_and_counter();
    let responder_addr = spawn_echo_responder(registry.clone());
    let ipcref_counter = IpcRefCounter::new();
    let config = CommandConfig::default();

    let mut last = None;
    for i in 0..5u32 {
        let payload = StructVal::new(PING).with_field("value", Value::U32(i));
        let command = Command::new(PING_CMD, ipcref_counter.next(), UnionVal { type_id: PING, payload: Value::Struct(payload) });
        let response = command::send_blocking(&registry, responder_addr, &command, &config).unwrap();
        if let Some(prev) = last {
            assert!(response.ipcref > prev);
        }
        last = Some(response.ipcref);
    }
}

// Property 6 — an async send's callback fires exactly once, driven end to
// end over real loopback UDP: encode, send via a real `InMemoryHostLoop`,
// register the pending entry, then pump `poll_recv` against a live echo
// responder until the reply arrives.
#[test]
fn property_async_send_callback_fires_once_on_reply() {
    let registry = registry_with_ping_and_counter();
    let responder_addr = spawn_echo_responder(registry.clone());
    let ipcref_counter = IpcRefCounter::new();
    let config = CommandConfig::default();

    let host_loop = InMemoryHostLoop::new(Endpoint::ephemeral().unwrap());
    let fired = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let fired_clone = fired.clone();

    let payload = StructVal::new(PING).with_field("value", Value::U32(7));
    let command = Command::new(PING_CMD, ipcref_counter.next(), UnionVal { type_id: PING, payload: Value::Struct(payload) });
    let deadline = Instant::now() + Duration::from_secs(2);

    command::send_async(
        &host_loop,
        &registry,
        responder_addr,
        &command,
        &config,
        Box::new(move |cb_type, payload| {
            fired_clone.lock().unwrap().push((cb_type, payload));
        }),
        deadline,
    )
    .unwrap();

    let start = Instant::now();
    while fired.lock().unwrap().is_empty() && start.elapsed() < Duration::from_millis(500) {
        host_loop.poll_recv(&registry).unwrap();
        host_loop.poll_timeouts();
        std::thread::sleep(Duration::from_millis(2));
    }

    let calls = fired.lock().unwrap();
    assert_eq!(calls.len(), 1, "callback must fire exactly once");
    assert_eq!(calls[0].0, CbType::Reply);
    assert!(calls[0].1.is_some());
}

// Property 6, timeout branch — a destination with nothing listening lets
// the deadline expire, firing the callback exactly once with `CbType::Error`.
#[test]
fn property_async_send_callback_fires_once_on_timeout() {
    let registry = registry_with_ping_and_counter();
    let silent: SocketAddr = "127.0.0.1:1".parse().unwrap();
    let ipcref_counter = IpcRefCounter::new();
    let config = CommandConfig::default();

    let host_loop = InMemoryHostLoop::new(Endpoint::ephemeral().unwrap());
    let fired = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let fired_clone = fired.clone();

    let payload = StructVal::new(PING).with_field("value", Value::U32(9));
    let command = Command::new(PING_CMD, ipcref_counter.next(), UnionVal { type_id: PING, payload: Value::Struct(payload) });
    let deadline = Instant::now() + Duration::from_millis(30);

    command::send_async(
        &host_loop,
        &registry,
        silent,
        &command,
        &config,
        Box::new(move |cb_type, payload| {
            fired_clone.lock().unwrap().push((cb_type, payload));
        }),
        deadline,
    )
    .unwrap();

    let start = Instant::now();
    while fired.lock().unwrap().is_empty() && start.elapsed() < Duration::from_millis(500) {
        host_loop.poll_recv(&registry).unwrap();
        host_loop.poll_timeouts();
        std::thread::sleep(Duration::from_millis(2));
    }

    let calls = fired.lock().unwrap();
    assert_eq!(calls.len(), 1, "callback must fire exactly once");
    assert_eq!(calls[0].0, CbType::Error);
    assert!(calls[0].1.is_none());
}
