// Sends messages to a log server and reads them back with a monitor.
//
// Start `dmxp-log-server` first, or pass --embedded to host one in-process.
use dmxp_logrelay::Dispatch::{ChannelSettings, DispatcherBuilder};
use dmxp_logrelay::Server::forwarding::{SERVER_ADDRESS_KEY, SERVER_TIMEOUT_KEY};
use dmxp_logrelay::Server::{
    HttpConnector, HttpLogServer, LogClient, LogMonitor, LogService, RemoteForwardingChannel,
    ServerRingBuffer,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let embedded = args.iter().any(|a| a == "--embedded");

    let server = if embedded {
        let service: Arc<dyn LogService> = Arc::new(ServerRingBuffer::new());
        Some(HttpLogServer::bind("127.0.0.1:0", service)?)
    } else {
        None
    };
    let address = match &server {
        Some(server) => server.local_addr().to_string(),
        None => args
            .iter()
            .skip(1)
            .find(|a| !a.starts_with("--"))
            .cloned()
            .unwrap_or_else(|| "127.0.0.1".to_owned()),
    };

    let settings = ChannelSettings::from_env("DMXP_")
        .with(SERVER_ADDRESS_KEY, &address)
        .with(SERVER_TIMEOUT_KEY, 200);
    let dispatcher = DispatcherBuilder::new()
        .with_channel(RemoteForwardingChannel::new(settings))
        .build_started()?;

    let logger = dispatcher.logger();
    for i in 0..10 {
        logger.info(format!("remote message {i}"));
    }
    dispatcher.stop();
    println!("Sender: {:?}", dispatcher.stats());

    let addr = dmxp_logrelay::Server::forwarding::parse_server_address(&address)?;
    let client = LogClient::new(Box::new(HttpConnector::new(addr)), Duration::from_millis(200));
    let mut monitor = LogMonitor::new(client);
    for message in monitor.poll()? {
        println!(
            "{} [{}] {}::{} {}",
            message.time.format("%Y-%m-%d %H:%M:%S"),
            message.level,
            message.process_name,
            message.method_name,
            message.text
        );
    }
    println!("Monitor: {:?}", monitor);
    Ok(())
}
