//! Remote-control port discovery
//!
//! The device's control service listens on an ephemeral port inside a fixed
//! range and moves across reboots. An external scanner covers the range
//! quickly when installed; otherwise a bounded pool of short TCP connect
//! probes walks the range, lowest ports first, and the first successful
//! connect wins.

use std::sync::LazyLock;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use regex::Regex;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::ScannerConfig;
use crate::error::ScanError;

/// Scanner output lines reporting an open port: `35421/tcp open ...`
static OPEN_PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\d+)/tcp\s+open").expect("Invalid open-port regex"));

/// Find a listening port on `host` within the configured range.
///
/// Returns `NoOpenPort` when nothing in range answers inside the scan
/// budget, and `Cancelled` when the caller's token fires first; the two are
/// distinct so callers can tell "nothing there" from "told to stop".
pub async fn scan_for_port(
    config: &ScannerConfig,
    host: &str,
    cancel: &CancellationToken,
) -> Result<u16, ScanError> {
    let budget = Duration::from_secs(config.scan_timeout_secs);

    let found = tokio::select! {
        _ = cancel.cancelled() => return Err(ScanError::Cancelled),
        found = tokio::time::timeout(budget, scan_host(config, host)) => found,
    };

    match found {
        Ok(Some(port)) => Ok(port),
        // Budget exhausted or the whole range refused
        Ok(None) | Err(_) => Err(ScanError::NoOpenPort {
            host: host.to_string(),
            start: config.port_range_start,
            end: config.port_range_end,
        }),
    }
}

async fn scan_host(config: &ScannerConfig, host: &str) -> Option<u16> {
    if let Some(port) = nmap_scan(config, host).await {
        return Some(port);
    }
    probe_scan(config, host).await
}

/// Fast path: TCP-connect scan of the range with host detection disabled,
/// first in-range `<port>/tcp open` line wins. Any trouble here (binary
/// missing, bad exit, nothing reported) falls through to manual probing.
async fn nmap_scan(config: &ScannerConfig, host: &str) -> Option<u16> {
    let range = format!("{}-{}", config.port_range_start, config.port_range_end);
    let mut cmd = Command::new(&config.nmap_path);
    cmd.args(["-p", &range, "-sT", "-Pn", host])
        .kill_on_drop(true);

    let output = match cmd.output().await {
        Ok(output) if output.status.success() => output,
        Ok(_) | Err(_) => {
            tracing::debug!("Fast scan unavailable, probing range by hand");
            return None;
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    for caps in OPEN_PORT_RE.captures_iter(&stdout) {
        if let Ok(port) = caps[1].parse::<u16>() {
            if port >= config.port_range_start && port <= config.port_range_end {
                tracing::info!("Fast scan found open port {} on {}", port, host);
                return Some(port);
            }
        }
    }
    None
}

/// Fallback: walk the range with a pool of short connect probes. Candidates
/// go out in ascending order so the lowest open port wins in practice;
/// dropping the stream cancels whatever is still in flight.
async fn probe_scan(config: &ScannerConfig, host: &str) -> Option<u16> {
    let probe_timeout = Duration::from_millis(config.probe_timeout_ms);
    let concurrency = config.concurrency.max(1);

    let mut probes = stream::iter(config.port_range_start..=config.port_range_end)
        .map(|port| {
            let target = format!("{}:{}", host, port);
            async move {
                match tokio::time::timeout(probe_timeout, TcpStream::connect(&target)).await {
                    Ok(Ok(_)) => Some(port),
                    _ => None,
                }
            }
        })
        .buffer_unordered(concurrency);

    while let Some(probed) = probes.next().await {
        if let Some(port) = probed {
            tracing::info!("Probe scan found open port {} on {}", port, host);
            return Some(port);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(start: u16, end: u16) -> ScannerConfig {
        ScannerConfig {
            // Force the fallback path; tests must not depend on nmap
            nmap_path: "nmap-not-installed-here".to_string(),
            port_range_start: start,
            port_range_end: end,
            probe_timeout_ms: 50,
            scan_timeout_secs: 5,
            concurrency: 8,
        }
    }

    #[tokio::test]
    async fn test_scan_finds_listener_in_range() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = test_config(port.saturating_sub(2), port.saturating_add(2));
        let cancel = CancellationToken::new();

        let found = scan_for_port(&config, "127.0.0.1", &cancel).await.unwrap();
        assert_eq!(found, port);
        assert!(found >= config.port_range_start && found <= config.port_range_end);
    }

    #[tokio::test]
    async fn test_scan_reports_no_open_port() {
        // Nothing listens on the low reserved ports in a test environment
        let config = test_config(1, 3);
        let cancel = CancellationToken::new();

        let err = scan_for_port(&config, "127.0.0.1", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::NoOpenPort { start: 1, end: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_scan_cancellation_is_distinguishable() {
        let config = test_config(1, 3);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = scan_for_port(&config, "127.0.0.1", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
    }

    #[test]
    fn test_open_port_line_parsing() {
        let stdout = "Starting Nmap 7.94 ( https://nmap.org )\n\
            Nmap scan report for 192.168.1.50\n\
            Host is up (0.0010s latency).\n\
            Not shown: 14999 closed tcp ports (conn-refused)\n\
            PORT      STATE SERVICE\n\
            35421/tcp open  unknown\n\
            40000/tcp filtered unknown\n\
            \n\
            Nmap done: 1 IP address (1 host up) scanned in 2.05 seconds\n";

        let ports: Vec<u16> = OPEN_PORT_RE
            .captures_iter(stdout)
            .filter_map(|caps| caps[1].parse().ok())
            .collect();
        assert_eq!(ports, vec![35421]);
    }
}
