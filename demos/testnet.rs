//! Runs node and value lookups against an in-process testnet.
//!
//! Run: `cargo run --example testnet -- --size 50 --bootstrap 4`

use std::time::{Duration, Instant};

use clap::Parser;
use kadlookup::{Id, Kademlia, Testnet};
use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of simulated peers
    #[arg(long, default_value_t = 50)]
    size: usize,

    /// Peers known to each client before the first lookup
    #[arg(long, default_value_t = 4)]
    bootstrap: usize,

    /// Peers each simulated peer knows about, all of them if unset
    #[arg(long)]
    neighbours: Option<usize>,

    /// Simulated latency per request, in milliseconds
    #[arg(long, default_value_t = 20)]
    latency: u64,

    /// Round timeout, in milliseconds
    #[arg(long, default_value_t = 200)]
    timeout: u64,

    /// Show lookup rounds
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut testnet = Testnet::builder();
    testnet
        .size(cli.size)
        .latency(Duration::from_millis(cli.latency));
    if let Some(neighbours) = cli.neighbours {
        testnet.neighbours(neighbours);
    }
    let testnet = testnet.build();
    println!("Testnet of {} peers", testnet.size());

    let timeout = Duration::from_millis(cli.timeout);
    let mut builder = Kademlia::builder();
    builder
        .node_round_timeout(timeout)
        .value_round_timeout(timeout);

    let alice = testnet
        .client_with(&builder, cli.bootstrap)
        .expect("invalid settings");
    let bob = testnet
        .client_with(&builder, cli.bootstrap)
        .expect("invalid settings");

    println!("\n=== NODE LOOKUP ===");
    let target = Id::random();
    let start = Instant::now();
    let closest = alice.lookup_contact(target);
    let expected = testnet.closest(&target, alice.config().k);

    println!(
        "Found {} contacts closest to {target} in {:?} seconds",
        closest.len(),
        start.elapsed().as_secs_f32()
    );
    for contact in &closest {
        println!("  {} {}", contact.id, contact.address);
    }
    println!("Matches the actual closest peers: {}", closest == expected);

    println!("\n=== STORE ===");
    let start = Instant::now();
    let key = alice.store(&b"Hello from the testnet"[..]);
    println!(
        "Stored {key} in {:?} seconds",
        start.elapsed().as_secs_f32()
    );

    std::thread::sleep(Duration::from_millis(cli.latency * 2));
    println!("Held by {} peers", testnet.holders(&key).len());

    println!("\n=== VALUE LOOKUP ===");
    let start = Instant::now();
    match bob.lookup_data(key) {
        Some(data) => println!(
            "Found {:?} in {:?} seconds",
            String::from_utf8_lossy(&data),
            start.elapsed().as_secs_f32()
        ),
        None => println!("Not found after {:?} seconds", start.elapsed().as_secs_f32()),
    }

    alice.shutdown();
}
