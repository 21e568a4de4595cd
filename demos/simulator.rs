//! Example: Running the PLC simulator standalone
//!
//! Run with: cargo run --example simulator
//!
//! Starts a simulator on the standard ports with a handful of seeded tags,
//! so the other examples (and any client) have something to talk to:
//!
//!   cargo run --example read_tag -- 127.0.0.1

use eip_client::simulator::{PlcSimulator, SimulatorConfig};
use eip_client::CipValue;
use std::time::Duration;

fn main() -> eip_client::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let config = SimulatorConfig {
        tcp_addr: "0.0.0.0:44818".parse().expect("literal address"),
        udp_addr: Some("0.0.0.0:2222".parse().expect("literal address")),
        ..Default::default()
    };
    let sim = PlcSimulator::start(config)?;

    // seed some tags for clients to play with
    sim.set_tag("Counter", CipValue::Dint(0));
    sim.set_tag("Running", CipValue::Bool(true));
    sim.set_tag("Recipe", CipValue::String("BATCH-1".into()));
    sim.set_tag_array(
        "Samples",
        vec![
            CipValue::Dint(10),
            CipValue::Dint(20),
            CipValue::Dint(30),
            CipValue::Dint(40),
            CipValue::Dint(50),
        ],
    );

    sim.on_tag_change(|name, values| {
        println!("write: {} = {:?}", name, values);
    });

    println!(
        "simulator listening on {} (discovery on {:?})",
        sim.local_addr(),
        sim.discovery_addr()
    );
    println!("Ctrl+C to stop");

    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}
