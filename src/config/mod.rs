//! Configuration module

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub proximity: ProximityConfig,
    #[serde(default)]
    pub brightness: BrightnessConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_host")]
    pub host: String,
    #[serde(default = "default_device_port")]
    pub port: u16,
    #[serde(default = "default_adb_path")]
    pub adb_path: String,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
}

impl DeviceConfig {
    /// Initial `host:port` address of the managed device.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_monitor_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_rediscovery_cooldown_secs")]
    pub rediscovery_cooldown_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,
    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    #[serde(default = "default_scan_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProximityConfig {
    #[serde(default = "default_proximity_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrightnessConfig {
    #[serde(default = "default_brightness_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_min_level")]
    pub min_level: u8,
    #[serde(default = "default_max_level")]
    pub max_level: u8,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: default_device_host(),
            port: default_device_port(),
            adb_path: default_adb_path(),
            command_timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_monitor_interval_secs(),
            failure_threshold: default_failure_threshold(),
            rediscovery_cooldown_secs: default_rediscovery_cooldown_secs(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
            probe_timeout_ms: default_probe_timeout_ms(),
            scan_timeout_secs: default_scan_timeout_secs(),
            concurrency: default_scan_concurrency(),
        }
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_proximity_interval_ms(),
        }
    }
}

impl Default for BrightnessConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_brightness_interval_secs(),
            min_level: default_min_level(),
            max_level: default_max_level(),
            enabled: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_device_host() -> String {
    "127.0.0.1".to_string()
}

fn default_device_port() -> u16 {
    5555
}

fn default_adb_path() -> String {
    "adb".to_string()
}

fn default_command_timeout_secs() -> u64 {
    10
}

fn default_monitor_interval_secs() -> u64 {
    10
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_rediscovery_cooldown_secs() -> u64 {
    60
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_port_range_start() -> u16 {
    35000
}

fn default_port_range_end() -> u16 {
    50000
}

fn default_probe_timeout_ms() -> u64 {
    50
}

fn default_scan_timeout_secs() -> u64 {
    60
}

fn default_scan_concurrency() -> usize {
    50
}

fn default_proximity_interval_ms() -> u64 {
    1000
}

fn default_brightness_interval_secs() -> u64 {
    30
}

fn default_min_level() -> u8 {
    20
}

fn default_max_level() -> u8 {
    255
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("KIOSK").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!("Invalid configuration, using defaults: {}", e);
            Config::default()
        });

        Ok(config)
    }
}
