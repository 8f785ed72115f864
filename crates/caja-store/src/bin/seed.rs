//! # Seed Data Generator
//!
//! Writes a fresh development snapshot: the default accounts, the
//! default settings lists, and one example product.
//!
//! ## Usage
//! ```bash
//! # Seed the default path (data/caja.json), opening cash 0
//! cargo run -p caja-store --bin seed
//!
//! # Custom path and opening cash
//! cargo run -p caja-store --bin seed -- --db ./data/caja.json --cash 500000
//! ```
//!
//! Refuses to overwrite an existing snapshot file.

use std::env;
use std::process::ExitCode;

use caja_core::inventory::{Product, ProductStatus};
use caja_core::money::Money;
use caja_core::snapshot::Snapshot;
use caja_store::{FileStore, DEFAULT_SNAPSHOT_PATH};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut db_path = DEFAULT_SNAPSHOT_PATH.to_string();
    let mut cash: i64 = 0;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db" if i + 1 < args.len() => {
                db_path = args[i + 1].clone();
                i += 2;
            }
            "--cash" if i + 1 < args.len() => {
                cash = match args[i + 1].parse() {
                    Ok(v) => v,
                    Err(_) => {
                        eprintln!("error: --cash expects a whole peso amount");
                        return ExitCode::FAILURE;
                    }
                };
                i += 2;
            }
            other => {
                eprintln!("error: unknown argument '{}'", other);
                eprintln!("usage: seed [--db <path>] [--cash <pesos>]");
                return ExitCode::FAILURE;
            }
        }
    }

    let store = FileStore::new(&db_path);
    if store.path().exists() {
        eprintln!("error: {} already exists, refusing to overwrite", db_path);
        return ExitCode::FAILURE;
    }

    let mut snapshot = Snapshot::default_state(Money::from_pesos(cash));
    snapshot.inventory.products.push(example_product());

    if let Err(e) = store.save(&snapshot) {
        eprintln!("error: could not write snapshot: {}", e);
        return ExitCode::FAILURE;
    }

    println!("Seeded {}:", db_path);
    println!("  accounts : {}", snapshot.settings.accounts.join(", "));
    println!("  cash     : {}", Money::from_pesos(cash));
    println!("  products : {}", snapshot.inventory.products.len());
    ExitCode::SUCCESS
}

/// The example card every fresh install starts with.
fn example_product() -> Product {
    let id = uuid::Uuid::new_v4().to_string();
    Product {
        sku: "PKM-001".to_string(),
        name: "Pikachu VMAX".to_string(),
        description: "Carta ejemplo".to_string(),
        language: "ES".to_string(),
        category: "Pokémon".to_string(),
        kind: "Carta".to_string(),
        stock: 5,
        cost: Money::from_pesos(50_000),
        price: Money::from_pesos(95_000),
        supplier: String::new(),
        tags: vec![],
        images: vec![],
        apply_tax: true,
        status: ProductStatus::Available,
        history: vec![],
        id,
    }
}
