//! Example: Discovering PLCs on the local network
//!
//! Run with: cargo run --example discover
//!
//! Broadcasts a ListIdentity request and prints every device that answers
//! within two seconds, then keeps polling and reports changes.

use eip_client::discovery::{broadcast_target, discover_plcs, DiscoveryEvent, PlcDiscovery};
use std::time::Duration;

fn main() -> eip_client::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // =========================================================================
    // One-shot sweep
    // =========================================================================

    println!("sweeping for devices (2s)...\n");
    let devices = discover_plcs(Duration::from_secs(2), broadcast_target())?;
    if devices.is_empty() {
        println!("no devices answered");
    }
    for device in &devices {
        println!(
            "{:<21} {} (vendor 0x{:04X}, serial 0x{:08X})",
            device.addr,
            device.identity.product_name,
            device.identity.vendor_id,
            device.identity.serial_number
        );
    }

    // =========================================================================
    // Continuous polling
    // =========================================================================

    println!("\npolling every 5s, Ctrl+C to stop\n");
    let poller = PlcDiscovery::start(broadcast_target(), Duration::from_secs(5))?;
    loop {
        match poller.events().recv() {
            Ok(DiscoveryEvent::Device(device)) => {
                println!("new device {}: {}", device.addr, device.identity.product_name);
            }
            Ok(DiscoveryEvent::DeviceUpdate(device)) => {
                println!("identity changed {}: {}", device.addr, device.identity.product_name);
            }
            Err(_) => break,
        }
    }
    Ok(())
}
