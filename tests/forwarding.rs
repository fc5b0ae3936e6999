// Remote forwarding over the in-process and HTTP transports.
use chrono::{DateTime, TimeZone, Utc};
use dmxp_logrelay::Dispatch::{ChannelSettings, DispatcherBuilder, LogChannel};
use dmxp_logrelay::Server::forwarding::{SERVER_ADDRESS_KEY, SERVER_TIMEOUT_KEY};
use dmxp_logrelay::Server::wire::{GET_MESSAGES_PATH, SERVICE_PATH, WRITE_MESSAGE_PATH};
use dmxp_logrelay::Server::{
    Connector, HttpConnector, HttpLogServer, InProcessConnector, LogClient, LogMonitor, LogService,
    RemoteForwardingChannel, ServerRingBuffer, WireMessage,
};
use dmxp_logrelay::{ChannelError, LogLevel, Message, TransportError};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

fn http_settings(addr: impl ToString, timeout_ms: u64) -> ChannelSettings {
    ChannelSettings::new()
        .with(SERVER_ADDRESS_KEY, addr)
        .with(SERVER_TIMEOUT_KEY, timeout_ms)
}

fn serve() -> (Arc<ServerRingBuffer>, HttpLogServer) {
    let ring = Arc::new(ServerRingBuffer::new());
    let service: Arc<dyn LogService> = ring.clone();
    let server = HttpLogServer::bind("127.0.0.1:0", service).unwrap();
    (ring, server)
}

#[test]
fn in_process_forwarding_reaches_the_ring() {
    let ring = Arc::new(ServerRingBuffer::new());
    let service: Arc<dyn LogService> = ring.clone();
    let channel = RemoteForwardingChannel::with_connector_factory(ChannelSettings::new(), move |_| {
        Box::new(InProcessConnector::new(Arc::clone(&service))) as Box<dyn Connector>
    });

    let dispatcher = DispatcherBuilder::new()
        .with_channel(channel)
        .build_started()
        .unwrap();
    let logger = dispatcher.logger().with_process_name("client");
    logger.success("one");
    logger.error("two");
    dispatcher.stop();

    let stored = ring.query(None);
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].level, LogLevel::Success);
    assert_eq!(stored[1].text, "two");
    assert_eq!(stored[1].process_name, "client");
}

#[test]
fn http_forwarding_and_monitoring() {
    let (ring, mut server) = serve();
    let addr = server.local_addr();

    let dispatcher = DispatcherBuilder::new()
        .with_channel(RemoteForwardingChannel::new(http_settings(addr, 500)))
        .build_started()
        .unwrap();
    let logger = dispatcher.logger();
    for i in 0..3 {
        logger.info(format!("http {i}"));
    }
    dispatcher.stop();
    assert_eq!(dispatcher.stats().failed, 0);
    assert_eq!(ring.len(), 3);

    let client = LogClient::new(Box::new(HttpConnector::new(addr)), Duration::from_millis(500));
    let mut monitor = LogMonitor::new(client);
    assert!(!monitor.is_connected());

    let first: Vec<_> = monitor.poll().unwrap().into_iter().map(|m| m.text).collect();
    assert_eq!(first, vec!["http 0", "http 1", "http 2"]);
    assert!(monitor.is_connected());
    assert!(monitor.poll().unwrap().is_empty());

    let later = Utc::now() + chrono::Duration::seconds(1);
    ring.append(WireMessage::from(&Message::with_time(later, LogLevel::Fatal, "x", "y", "late")));
    let next = monitor.poll().unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(monitor.watermark(), Some(later));

    monitor.reset();
    assert_eq!(monitor.poll().unwrap().len(), 4);

    server.shutdown();
    assert!(monitor.poll().is_err());
    assert!(!monitor.is_connected());
}

#[test]
fn monitor_sorts_out_of_order_arrivals() {
    let ring = Arc::new(ServerRingBuffer::new());
    let base: DateTime<Utc> = Utc::now();
    for offset in [30, 10, 20] {
        let time = base + chrono::Duration::milliseconds(offset);
        ring.append(WireMessage::from(&Message::with_time(time, LogLevel::Info, "p", "m", offset.to_string())));
    }
    let service: Arc<dyn LogService> = ring;
    let client = LogClient::new(Box::new(InProcessConnector::new(service)), Duration::from_millis(10));
    let mut monitor = LogMonitor::new(client);

    let texts: Vec<_> = monitor.poll().unwrap().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["10", "20", "30"]);
    assert_eq!(monitor.watermark(), Some(base + chrono::Duration::milliseconds(30)));
}

#[test]
fn unreachable_server_fails_delivery_only() {
    // Bind then drop to get a port nobody listens on.
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let mut channel = RemoteForwardingChannel::new(http_settings(addr, 100));
    assert!(channel.initialize());

    let err = channel
        .deliver(&Message::new(LogLevel::Info, "p", "m", "lost"))
        .unwrap_err();
    assert!(matches!(err, ChannelError::Transport(_)));
}

#[test]
fn every_field_survives_the_network_hop() {
    let (ring, server) = serve();
    let time = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    let msg = Message::with_time(time, LogLevel::Warning, "svc-a", "Flush", "payload ünïcode");

    let mut channel = RemoteForwardingChannel::new(http_settings(server.local_addr(), 500));
    assert!(channel.initialize());
    channel.deliver(&msg).unwrap();

    let expected = WireMessage::from(&msg);
    assert_eq!(ring.query(None), vec![expected.clone()]);

    let client = LogClient::new(Box::new(HttpConnector::new(server.local_addr())), Duration::from_millis(500));
    let fetched = client.get_messages(None).unwrap();
    assert_eq!(fetched, vec![expected]);
    assert_eq!(Message::from(fetched[0].clone()).time(), time);
    assert!(client.get_messages(Some(time)).unwrap().is_empty());
}

#[test]
fn silent_server_times_out() {
    // Accepted by the kernel backlog but never answered.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let connector = HttpConnector::new(addr).with_request_timeout(Duration::from_millis(50));
    let client = LogClient::new(Box::new(connector), Duration::from_millis(50));

    let msg = WireMessage::from(&Message::new(LogLevel::Info, "p", "m", "waiting"));
    assert!(matches!(client.write_message(&msg), Err(TransportError::TimedOut)));
    drop(listener);
}

struct Rejecting;

impl LogService for Rejecting {
    fn write_message(&self, _: WireMessage) -> Result<(), TransportError> {
        Err(TransportError::Server("read only".into()))
    }
    fn get_messages(&self, _: Option<DateTime<Utc>>) -> Result<Vec<WireMessage>, TransportError> {
        Ok(Vec::new())
    }
}

#[test]
fn server_side_errors_are_reported() {
    let server = HttpLogServer::bind("127.0.0.1:0", Arc::new(Rejecting)).unwrap();
    let client = LogClient::new(Box::new(HttpConnector::new(server.local_addr())), Duration::from_millis(500));

    let msg = WireMessage::from(&Message::new(LogLevel::Info, "p", "m", "t"));
    match client.write_message(&msg) {
        Err(TransportError::Server(reason)) => assert!(reason.contains("read only")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(client.get_messages(None).unwrap().is_empty());
}

#[test]
fn malformed_request_gets_error_response() {
    let (ring, server) = serve();
    let base = format!("http://{}", server.local_addr());
    let http = reqwest::blocking::Client::new();

    let response = http
        .post(format!("{base}{WRITE_MESSAGE_PATH}"))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .unwrap();
    assert!(response.status().is_client_error());

    // Every field is required.
    let response = http
        .post(format!("{base}{WRITE_MESSAGE_PATH}"))
        .json(&serde_json::json!({ "time": Utc::now(), "level": 1, "text": "t" }))
        .send()
        .unwrap();
    assert!(response.status().is_client_error());

    let response = http
        .post(format!("{base}{SERVICE_PATH}/Unknown"))
        .json(&serde_json::json!({}))
        .send()
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let response = http
        .post(format!("{base}{GET_MESSAGES_PATH}"))
        .json(&serde_json::json!({ "since": null }))
        .send()
        .unwrap();
    assert!(response.status().is_success());
    assert!(ring.is_empty());
}
