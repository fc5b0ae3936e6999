// Routes a few messages through the dispatcher to the console.
use dmxp_logrelay::Dispatch::channels::ConsoleChannel;
use dmxp_logrelay::Dispatch::DispatcherBuilder;
use dmxp_logrelay::{function_name, log_at, LogLevel};

fn main() -> std::io::Result<()> {
    let dispatcher = DispatcherBuilder::new()
        .with_channel(ConsoleChannel::stdout())
        .build_started()?;
    let logger = dispatcher.logger();

    logger.info("dispatcher started");
    for level in LogLevel::ALL {
        log_at!(logger, level, "sample at {}", level);
    }
    logger.write(LogLevel::Success, function_name!(), "done");

    dispatcher.stop();
    println!("{:?}", dispatcher);
    Ok(())
}
