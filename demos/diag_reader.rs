// Polls the shared diagnostic ring and prints anything new.
use dmxp_logrelay::SharedLog::{Scope, SharedLogBuilder};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let scope = if env::args().any(|a| a == "--global") {
        Scope::Global
    } else {
        Scope::Local
    };
    // Our own Ctrl+C handler stops the loop; the handle closes on drop.
    let log = SharedLogBuilder::new()
        .with_scope(scope)
        .with_exit_hook(false)
        .open()?;

    let running = Arc::new(AtomicBool::new(true));
    let running_for_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::SeqCst);
    })?;

    println!("Reader: watching {} (Ctrl+C to stop)", log.segment_name());
    while running.load(Ordering::SeqCst) {
        // Newest first; print oldest first.
        for record in log.read_new()?.into_iter().rev() {
            println!(
                "{} #{:<5} {:<16} {}",
                record.time.format("%H:%M:%S%.3f"),
                record.sequence,
                record.process,
                record.text
            );
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    println!("Reader: {} instances attached at exit", log.instance_count()?);
    Ok(())
}
