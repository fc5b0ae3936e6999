use chrono::{DateTime, TimeZone, Utc};
use dmxp_logrelay::Server::{LogService, ServerRingBuffer, WireMessage};
use dmxp_logrelay::{LogLevel, ServerError};
use std::sync::Arc;
use std::thread;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn wire(secs: i64, text: &str) -> WireMessage {
    WireMessage {
        time: at(secs),
        level: LogLevel::Info,
        process_name: "p".into(),
        method_name: "m".into(),
        text: text.into(),
    }
}

fn texts(messages: &[WireMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.text.as_str()).collect()
}

#[test]
fn capacity_bounds_contents() {
    let ring = ServerRingBuffer::with_capacity(3).unwrap();
    for t in 1..=5 {
        ring.append(wire(t, &format!("t{t}")));
    }
    assert_eq!(ring.len(), 3);
    assert_eq!(texts(&ring.query(None)), vec!["t3", "t4", "t5"]);
}

#[test]
fn query_since_is_strictly_after() {
    let ring = ServerRingBuffer::with_capacity(3).unwrap();
    for t in 1..=5 {
        ring.append(wire(t, &format!("t{t}")));
    }
    assert_eq!(texts(&ring.query(Some(at(3)))), vec!["t4", "t5"]);
    assert!(ring.query(Some(at(5))).is_empty());
    assert_eq!(ring.query(Some(at(-100))).len(), 3);
}

#[test]
fn results_keep_insertion_order() {
    let ring = ServerRingBuffer::new();
    ring.append(wire(10, "late"));
    ring.append(wire(5, "early"));
    ring.append(wire(7, "middle"));
    assert_eq!(texts(&ring.query(None)), vec!["late", "early", "middle"]);
    assert_eq!(texts(&ring.query(Some(at(6)))), vec!["late", "middle"]);
}

#[test]
fn empty_ring_returns_nothing() {
    let ring = ServerRingBuffer::new();
    assert!(ring.is_empty());
    assert!(ring.query(None).is_empty());
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(matches!(
        ServerRingBuffer::with_capacity(0),
        Err(ServerError::InvalidCapacity)
    ));
}

#[test]
fn concurrent_appends_respect_capacity() {
    let ring = Arc::new(ServerRingBuffer::with_capacity(64).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|w| {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..100 {
                    ring.write_message(wire(i, &format!("w{w}-{i}"))).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(ring.len(), 64);
    assert_eq!(ring.get_messages(None).unwrap().len(), 64);
}
