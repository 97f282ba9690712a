//! Device connectivity and control

pub mod manager;
pub mod monitor;
pub mod parse;
#[cfg(test)]
pub mod testing;
pub mod transport;

pub use manager::DeviceManager;
pub use monitor::ConnectionMonitor;
pub use transport::{AdbTransport, CommandTransport};
