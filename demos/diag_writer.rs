// Writes numbered lines into the shared diagnostic ring.
use dmxp_logrelay::SharedLog::{Scope, SharedLogBuilder};
use std::env;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <num_messages> [--global]", args[0]);
        std::process::exit(1);
    }

    let num_messages: usize = args[1].parse()?;
    let scope = if args.iter().any(|a| a == "--global") {
        Scope::Global
    } else {
        Scope::Local
    };

    // Opening installs the Ctrl+C hook that detaches the handle before exiting.
    let log = SharedLogBuilder::new().with_scope(scope).open()?;

    println!(
        "Writer: attached to {} as {} ({} instances)",
        log.segment_name(),
        log.process_name(),
        log.instance_count()?
    );

    for i in 0..num_messages {
        log.write(&format!("message_{i}"))?;
        std::thread::sleep(Duration::from_millis(10));
    }

    println!("Writer: counter now {}", log.total_message_count()?);
    log.close()?;
    Ok(())
}
