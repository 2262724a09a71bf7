use std::net::{SocketAddr, TcpListener};

use rand::Rng;
use tracing::{info, warn};

const SCAN_RANGE_START: u16 = 60000;
const SCAN_RANGE_END: u16 = 61000;
const MAX_SCAN_ATTEMPTS: u32 = 200;

/// Pick the port the service should listen on.
/// Asks the OS for a free ephemeral port first, then scans a high range,
/// and finally hands back `fallback` untested
pub fn negotiate_port(fallback: u16) -> u16 {
    if let Some(port) = os_assigned_port() {
        info!("Using OS-assigned port {}", port);
        return port;
    }

    if let Some(port) = find_available_port() {
        return port;
    }

    warn!("No free port found, falling back to {}", fallback);
    fallback
}

/// Let the OS pick a free port by binding port 0 on loopback
fn os_assigned_port() -> Option<u16> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).ok()?;
    let port = listener.local_addr().ok()?.port();
    // Listener is dropped here and the port released for the service
    Some(port)
}

/// Find an available port in the 60000-61000 range, random probes first
pub fn find_available_port() -> Option<u16> {
    let mut rng = rand::rng();
    let start_port = rng.random_range(SCAN_RANGE_START..=SCAN_RANGE_END);

    for _ in 0..MAX_SCAN_ATTEMPTS / 2 {
        let port = rng.random_range(SCAN_RANGE_START..=SCAN_RANGE_END);
        if is_port_available(port) {
            info!("Found available port: {}", port);
            return Some(port);
        }
    }

    // Random probing failed, walk the range sequentially from start_port
    let span = u32::from(SCAN_RANGE_END - SCAN_RANGE_START) + 1;
    for offset in 0..(MAX_SCAN_ATTEMPTS / 2) {
        let index = (u32::from(start_port - SCAN_RANGE_START) + offset) % span;
        let port = SCAN_RANGE_START + index as u16;
        if is_port_available(port) {
            info!("Found available port: {}", port);
            return Some(port);
        }
    }

    warn!(
        "Could not find an available port in range {}-{}",
        SCAN_RANGE_START, SCAN_RANGE_END
    );
    None
}

/// Check if a specific port is free on loopback
pub fn is_port_available(port: u16) -> bool {
    TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).is_ok()
}
