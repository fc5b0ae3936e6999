mod console;
mod memory;

pub use console::ConsoleChannel;
pub use memory::MemoryChannel;
