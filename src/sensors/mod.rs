//! Sensor-driven control loops

pub mod brightness;
pub mod proximity;

pub use brightness::BrightnessController;
pub use proximity::ProximityMonitor;
