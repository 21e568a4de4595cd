//! Example: Reading and writing tags on a PLC
//!
//! Run with: cargo run --example read_tag -- 192.168.1.10
//!
//! This example demonstrates:
//! - Connecting and registering a session
//! - Reading scalar and array tags
//! - Writing with inferred and explicit CIP types
//! - Batch reads with per-tag outcomes
//! - Reading the device identity

use eip_client::{CipDataType, ConnectionConfig, EipDriver};
use std::net::IpAddr;

fn main() -> eip_client::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let ip: IpAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "192.168.1.10".to_string())
        .parse()
        .expect("first argument must be an IP address");

    // =========================================================================
    // Connect
    // =========================================================================

    let mut driver = EipDriver::new(ConnectionConfig::new(ip));
    driver.connect()?;
    println!("connected to {}", ip);

    // =========================================================================
    // Device identity
    // =========================================================================

    let identity = driver.get_device_info()?;
    println!(
        "device: {} (vendor 0x{:04X}, serial 0x{:08X}, rev {}.{})",
        identity.product_name,
        identity.vendor_id,
        identity.serial_number,
        identity.revision_major,
        identity.revision_minor
    );

    // =========================================================================
    // Scalar read and write
    // =========================================================================

    println!("\n=== Scalar Tags ===\n");

    driver.write_tag_as("Counter", 42, CipDataType::Dint)?;
    let value = driver.read_tag("Counter")?;
    println!("Counter = {}", value);

    // =========================================================================
    // Array read
    // =========================================================================

    println!("\n=== Array Tags ===\n");

    match driver.read_tag_array("Samples", 5) {
        Ok(values) => println!("Samples[0..5] = {:?}", values),
        Err(e) => println!("Samples: {}", e),
    }

    // =========================================================================
    // Batch read
    // =========================================================================

    println!("\n=== Batch Read ===\n");

    for (name, result) in driver.read_tags(&["Counter", "Running", "NoSuchTag"]) {
        match result {
            Ok(value) => println!("{} = {}", name, value),
            Err(e) => println!("{}: {}", name, e),
        }
    }

    // =========================================================================
    // Tag browsing (optional on many devices)
    // =========================================================================

    println!("\n=== Tag List ===\n");

    match driver.list_tags()? {
        Some(tags) => {
            for tag in tags {
                println!("#{:<4} {:<8} {}", tag.instance_id, tag.data_type.to_string(), tag.name);
            }
        }
        None => println!("device does not support tag browsing"),
    }

    driver.disconnect()?;
    Ok(())
}
