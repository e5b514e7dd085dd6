//! # Seed Data Generator
//!
//! Populates the database with demo registers and stock for development.
//!
//! ## Usage
//! ```bash
//! # Seed with defaults
//! cargo run -p atlas-db --bin seed
//!
//! # Specify database path
//! cargo run -p atlas-db --bin seed -- --db ./data/atlas.db
//!
//! # More products per location
//! cargo run -p atlas-db --bin seed -- --products 200
//! ```
//!
//! ## Generated Data
//! - 3 locations (`loc-downtown`, `loc-airport`, `loc-warehouse`)
//! - 2 registers per store location
//! - Stock records for N products, with the warehouse holding the bulk so
//!   transfer flows can be exercised immediately

use std::env;

use atlas_core::{Quantity, DEFAULT_TENANT_ID};
use atlas_db::{Database, DbConfig};

/// Store locations (the warehouse has no registers).
const LOCATIONS: &[&str] = &["loc-downtown", "loc-airport", "loc-warehouse"];

const REGISTER_NAMES: &[&str] = &["Front Counter", "Back Counter"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut product_count: usize = 50;
    let mut db_path = String::from("./atlas_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    product_count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Atlas POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N>  Products per location (default: 50)");
                println!("  -d, --db <PATH>     Database file path (default: ./atlas_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("🌱 Atlas POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Products: {} per location", product_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");
    println!();

    // Registers for the two store locations.
    println!("Creating registers...");
    let mut register_count = 0;
    for location_id in LOCATIONS.iter().filter(|l| !l.ends_with("warehouse")) {
        for name in REGISTER_NAMES {
            let register = db
                .registers()
                .create(DEFAULT_TENANT_ID, location_id, name)
                .await?;
            println!("  {} @ {} ({})", name, location_id, register.id);
            register_count += 1;
        }
    }
    println!("✓ Created {} registers", register_count);
    println!();

    // Stock: the warehouse holds the bulk, stores hold a little.
    println!("Seeding stock...");
    let start = std::time::Instant::now();
    let mut stock_count = 0;

    for idx in 0..product_count {
        let product_id = format!("prod-{:04}", idx);

        for location_id in LOCATIONS {
            let hundredths = if location_id.ends_with("warehouse") {
                // 500.00 - 999.00 units
                (500 + (idx * 37) % 500) as i64 * 100
            } else {
                // 0.00 - 49.00 units
                ((idx * 13) % 50) as i64 * 100
            };

            db.stock()
                .upsert_stock(
                    DEFAULT_TENANT_ID,
                    &product_id,
                    location_id,
                    Quantity::from_hundredths(hundredths),
                )
                .await?;
            stock_count += 1;
        }

        if (idx + 1) % 25 == 0 {
            println!("  Seeded {} products...", idx + 1);
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Created {} stock records in {:?}", stock_count, elapsed);

    // Quick sanity check: move a unit and verify the audit trail.
    println!();
    println!("Verifying transfer path...");
    let result = db
        .stock()
        .transfer(
            DEFAULT_TENANT_ID,
            "prod-0000",
            "loc-warehouse",
            "loc-downtown",
            1.0,
            Some("seed smoke test"),
            None,
        )
        .await?;
    println!(
        "  Moved {} of prod-0000: warehouse {} → downtown {}",
        result.quantity, result.from_quantity_after, result.to_quantity_after
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
