//! Links talking to each other over in-memory serial lines.

use parking_lot::Mutex;
use sensornet_codec::api_mode::{Addressing, ApiEncoder};
use sensornet_codec::{FrameEncoder, FrameMode};
use sensornet_link::{LinkConfig, PacketLink, PacketSender};
use sensornet_packet::{DeviceId, OpCode, Packet};
use sensornet_transport::pipe::serial_pair;
use sensornet_transport::{ByteTransport, Result as TransportResult, ThreadBackedTransport};
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Transport that records what is sent and never receives anything.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<Vec<u8>>>,
    guard_delays: AtomicUsize,
}

impl ByteTransport for RecordingTransport {
    fn init(&self) -> TransportResult<()> {
        Ok(())
    }
    fn get_byte(&self) -> TransportResult<u8> {
        Err(sensornet_transport::TransportError::Closed)
    }
    fn send_bytes(&self, bytes: &[u8]) -> TransportResult<()> {
        self.sent.lock().push(bytes.to_vec());
        Ok(())
    }
    fn shutdown(&self) -> TransportResult<()> {
        Ok(())
    }
    fn guard_delay(&self) {
        self.guard_delays.fetch_add(1, Ordering::SeqCst);
    }
}

fn read_exactly(reader: &mut dyn Read, n: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 64];
    let deadline = Instant::now() + Duration::from_secs(2);
    while out.len() < n && Instant::now() < deadline {
        match reader.read(&mut buf[..(n - out.len()).min(64)]) {
            Ok(0) => break,
            Ok(k) => out.extend_from_slice(&buf[..k]),
            Err(e) if e.kind() == ErrorKind::TimedOut => {}
            Err(e) => panic!("read failed: {}", e),
        }
    }
    out
}

#[test]
fn test_at_mode_packets_cross_the_line() {
    let (a, b) = serial_pair();
    let master = PacketLink::new(
        Arc::new(ThreadBackedTransport::new(a, 64)),
        &LinkConfig::master().with_mode(FrameMode::At),
    );
    let sensor = PacketLink::new(
        Arc::new(ThreadBackedTransport::new(b, 64)),
        &LinkConfig::sensor(DeviceId::new(3)).with_mode(FrameMode::At),
    );
    master.init().unwrap();
    sensor.init().unwrap();

    let (tx, rx) = mpsc::channel();
    let receiver = master
        .receiver(move |packet: &Packet| {
            let _ = tx.send(packet.clone());
        })
        .spawn()
        .unwrap();

    sensor.send_packet(OpCode::MeasureResponse, b"01A0").unwrap();
    let packet = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(packet.op(), OpCode::MeasureResponse);
    assert_eq!(packet.from(), DeviceId::new(3));
    assert_eq!(packet.data(), b"01A0");

    master.shutdown().unwrap();
    sensor.shutdown().unwrap();
    let stats = receiver.join().unwrap();
    assert_eq!(stats.valid_packets, 1);
    assert_eq!(stats.invalid_packets, 0);
}

#[test]
fn test_api_mode_init_switches_radio() {
    let (a, b) = serial_pair();
    let link = PacketLink::new(Arc::new(ThreadBackedTransport::new(a, 16)), &LinkConfig::master());
    link.init().unwrap();

    let (mut radio_reader, _radio_writer) = b.open().unwrap();
    let expected = ApiEncoder::new(DeviceId::MASTER, Addressing::Broadcast)
        .encode_command(*b"AP", Some(&[0x02]))
        .unwrap();
    assert_eq!(read_exactly(&mut radio_reader, expected.len()), expected);
    link.shutdown().unwrap();
}

#[test]
fn test_api_mode_transmit_and_receive() {
    let (a, b) = serial_pair();
    let link = PacketLink::new(Arc::new(ThreadBackedTransport::new(a, 128)), &LinkConfig::master());
    link.init().unwrap();
    let (mut radio_reader, mut radio_writer) = b.open().unwrap();

    let (tx, rx) = mpsc::channel();
    let receiver = link
        .receiver(move |packet: &Packet| {
            let _ = tx.send(packet.clone());
        })
        .spawn()
        .unwrap();

    // Skip the AP command, then expect a broadcast transmit request.
    let encoder = ApiEncoder::new(DeviceId::MASTER, Addressing::Broadcast);
    let ap = encoder.encode_command(*b"AP", Some(&[0x02])).unwrap();
    read_exactly(&mut radio_reader, ap.len());
    link.send_packet(OpCode::MeasureRequest, &[]).unwrap();
    let request = encoder.encode_packet(OpCode::MeasureRequest, &[]).unwrap();
    assert_eq!(read_exactly(&mut radio_reader, request.len()), request);

    // The radio delivers a sensor's answer.
    let answer = Packet::new(OpCode::MeasureResponse, DeviceId::new(2), b"7D13").unwrap();
    radio_writer
        .write_all(&ApiEncoder::encode_receive_packet(0x0013A200_40A1B2C3, 0x1234, &answer))
        .unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), answer);

    link.shutdown().unwrap();
    receiver.join().unwrap();
}

#[test]
fn test_command_mode_sequence_and_commands() {
    let transport = Arc::new(RecordingTransport::default());
    let link = PacketLink::new(transport.clone(), &LinkConfig::master().with_mode(FrameMode::At));

    link.enter_command_mode().unwrap();
    link.send_command(*b"NI", None).unwrap();
    link.send_command(*b"ID", Some(b"2001")).unwrap();
    link.exit_command_mode().unwrap();

    assert_eq!(transport.guard_delays.load(Ordering::SeqCst), 2);
    let sent = transport.sent.lock().clone();
    assert_eq!(
        sent,
        vec![
            b"+++".to_vec(),
            b"ATNI\r\n".to_vec(),
            b"ATID 2001\r\n".to_vec(),
            b"ATCN\r\n".to_vec()
        ]
    );
}

#[test]
fn test_identity_and_addressing_changes_apply_to_next_packet() {
    let transport = Arc::new(RecordingTransport::default());
    let link = PacketLink::new(transport.clone(), &LinkConfig::master());
    link.set_device_id(DeviceId::new(4));
    link.set_addressing(Addressing::Coordinator);
    assert_eq!(link.device_id(), DeviceId::new(4));

    link.send_packet(OpCode::Pong, &[]).unwrap();
    let expected = ApiEncoder::new(DeviceId::new(4), Addressing::Coordinator)
        .encode_packet(OpCode::Pong, &[])
        .unwrap();
    assert_eq!(transport.sent.lock()[0], expected);
}

#[test]
fn test_encode_failure_sends_nothing() {
    let transport = Arc::new(RecordingTransport::default());
    let link = PacketLink::new(transport.clone(), &LinkConfig::master().with_mode(FrameMode::At));
    assert!(link.send_packet(OpCode::MeasureResponse, &[0x7E]).is_err());
    assert!(link.send_packet(OpCode::MeasureResponse, &[0u8; 69]).is_err());
    assert!(transport.sent.lock().is_empty());
}

#[test]
fn test_concurrent_senders_send_whole_frames() {
    let transport = Arc::new(RecordingTransport::default());
    let link = Arc::new(PacketLink::new(
        transport.clone(),
        &LinkConfig::master().with_mode(FrameMode::At),
    ));
    let threads: Vec<_> = (0..4)
        .map(|i| {
            let link = link.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    link.send_packet(OpCode::MeasureResponse, &[b'0' + i]).unwrap();
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    let sent = transport.sent.lock();
    assert_eq!(sent.len(), 100);
    assert!(sent.iter().all(|frame| frame.len() == 7 && frame[0] == 0x7E));
}
