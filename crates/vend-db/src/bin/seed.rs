//! # Seed Data Generator
//!
//! Populates the database with a demo seller, a funded buyer, and a few
//! products for local development.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (vend.toml / VEND_DB_PATH / platform default)
//! cargo run -p vend-db --bin seed
//!
//! # Specify database path
//! cargo run -p vend-db --bin seed -- --db ./vend_dev.db
//! ```
//!
//! ## Seeded Data
//! - `seller1` (seller) owning five products
//! - `buyer1` (buyer) with 200 cents deposited as two 100-cent coins

use std::env;
use std::path::PathBuf;
use vend_core::{Caller, CoinInput, NewProduct, Role};
use vend_db::{init_tracing, Database, VendConfig};

/// Demo catalogue: (name, cost in cents, stock).
const PRODUCTS: &[(&str, i64, i64)] = &[
    ("Coca Cola", 100, 10),
    ("Pepsi", 95, 15),
    ("Water", 50, 20),
    ("Snickers", 120, 8),
    ("Chips", 75, 12),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Vend Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: from vend.toml)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = VendConfig::load_or_default(None);
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("Vend Seed Data Generator");
    println!("========================");
    println!("Database: {}", config.database.path.display());
    println!();

    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.accounts().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} accounts", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let engine = db.engine(config.engine.clone());

    let seller = engine.register_account("seller1", Role::Seller).await?;
    let seller_caller = Caller::from_account(&seller);
    println!("✓ Created seller '{}' ({})", seller.username, seller.id);

    for (name, cost_cents, stock) in PRODUCTS {
        let product = engine
            .create_product(
                &seller_caller,
                &NewProduct {
                    name: name.to_string(),
                    cost_cents: *cost_cents,
                    stock: *stock,
                },
            )
            .await?;
        println!(
            "  #{} {} at {} cents, {} in stock",
            product.id, product.name, product.cost_cents, product.stock
        );
    }

    let buyer = engine.register_account("buyer1", Role::Buyer).await?;
    let buyer_caller = Caller::from_account(&buyer);
    let coins = CoinInput::from([(100, 2)]);
    let receipt = engine.deposit(&buyer_caller, &coins).await?;
    println!(
        "✓ Created buyer '{}' with {} cents",
        buyer.username,
        receipt.new_balance.cents()
    );

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
