//! Integration tests for the sensor node firmware.
//!
//! Listens to a serial LoRa sniffer that dumps raw COBS frames exactly as
//! transmitted by the node, decodes them with the firmware's own telemetry
//! codec, and checks the publish-rate properties against live traffic.

mod checks;
mod sniffer;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use checks::{print_results, run_all_checks};
use sniffer::Sniffer;

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Publish-rate checks against a live sensor node")]
struct Args {
    /// Serial port of the LoRa sniffer
    #[arg(short, long)]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// How long to capture traffic, in seconds
    #[arg(short, long, default_value = "120")]
    capture_secs: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("{}", "Sensor Node Integration Tests".bold());
    println!("Port: {}", args.port);
    println!("Baud: {}", args.baud);
    println!("Capture: {}s", args.capture_secs);
    println!();

    let mut sniffer = Sniffer::open(&args.port, args.baud)?;

    println!("Capturing telemetry...");
    let capture = sniffer.capture(Duration::from_secs(args.capture_secs))?;
    println!(
        "Captured {} frames ({} undecodable)\n",
        capture.messages.len(),
        capture.decode_errors
    );

    let results = run_all_checks(&capture);
    print_results(&results);

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
