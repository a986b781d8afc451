//! # Seed Data Generator
//!
//! Populates a database with products, opening stock and a handful of
//! sales for development.
//!
//! ## Usage
//! ```bash
//! # 200 products (default) in the platform data directory
//! cargo run -p stockroom-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p stockroom-db --bin seed -- --count 1000 --db ./data/stockroom.db
//!
//! # Products only
//! cargo run -p stockroom-db --bin seed -- --no-sales
//! ```
//!
//! ## Generated Data
//! - Products: SKU `{CATEGORY}-{INDEX:04}`, price Rp 2.000 - Rp 51.000,
//!   opening stock 0 - 120 (booked as an `in` movement)
//! - Sales: one per ten products, two lines each, some paid in full,
//!   some partly, some left unpaid

use std::env;
use std::time::Instant;

use stockroom_core::{Money, NewPayment, NewProduct, NewSale, PaymentMethod, Product, SaleLine};
use stockroom_db::{init_tracing, Database, DbConfig};
use tracing::{info, warn};

/// Product categories: code, display name, unit, item names.
const CATEGORIES: &[(&str, &str, &str, &[&str])] = &[
    (
        "ATK",
        "Stationery",
        "pcs",
        &["Ballpoint Pen", "Pencil 2B", "Eraser", "Ruler 30cm", "Stapler", "Sticky Notes"],
    ),
    (
        "MKN",
        "Food",
        "pack",
        &["Instant Noodles", "Rice Crackers", "Chocolate Wafer", "Peanuts", "Biscuits"],
    ),
    (
        "MNM",
        "Beverages",
        "btl",
        &["Mineral Water", "Iced Tea", "Coffee Milk", "Orange Juice", "Soy Milk"],
    ),
    (
        "RMT",
        "Household",
        "pcs",
        &["Dish Soap", "Laundry Detergent", "Floor Cleaner", "Tissue Roll", "Trash Bags"],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path: Option<String> = None;
    let mut with_sales = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--no-sales" => with_sales = false,
            "--help" | "-h" => {
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: STOCKROOM_DB_PATH or data dir)");
                println!("      --no-sales     Only create products");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => DbConfig::from_env()?,
    };

    println!("Stockroom Seed Data Generator");
    println!("=============================");
    println!("Database: {}", config.database_path.display());
    println!("Products: {}", count);
    println!();

    let db = Database::new(config).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = Instant::now();
    let mut products = Vec::with_capacity(count);

    'outer: for (category_idx, (code, category, unit, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for variant in 0..10 {
                if products.len() >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + name_idx * 10 + variant;
                let input = generate_product(code, category, unit, name, variant, seed);

                match db.products().create(input).await {
                    Ok(product) => products.push(product),
                    Err(e) => eprintln!("Failed to create product: {}", e),
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!("Generated {} products in {:?}", products.len(), elapsed);

    if with_sales {
        let created = seed_sales(&db, &products).await?;
        println!("Generated {} sales", created);
    }

    let drift = db.stock().find_drift().await?;
    if drift.is_empty() {
        println!("Stock ledger reconciles for every product");
    } else {
        println!("{} products do not reconcile", drift.len());
    }

    info!(products = products.len(), "Seed complete");
    println!();
    println!("Seed complete!");

    Ok(())
}

/// Generates one product input with deterministic data.
fn generate_product(
    code: &str,
    category: &str,
    unit: &str,
    name: &str,
    variant: usize,
    seed: usize,
) -> NewProduct {
    // Rp 2.000 - Rp 51.000 in Rp 500 steps
    let selling_price_cents = (2_000 + ((seed * 37) % 99) as i64 * 500) * 100;
    // Cost is 70-89% of the selling price
    let base_price_cents = selling_price_cents * (70 + (seed % 20) as i64) / 100;

    NewProduct {
        sku: format!("{}-{:04}", code, seed),
        name: format!("{} #{}", name, variant + 1),
        description: None,
        category: Some(category.to_string()),
        unit: unit.to_string(),
        base_price_cents,
        selling_price_cents,
        min_stock: 5 + (seed % 10) as i64,
        opening_stock: (seed % 121) as i64,
        user_id: Some("seed".to_string()),
    }
}

/// Creates a sale for every tenth product pair and pays some of them.
async fn seed_sales(db: &Database, products: &[Product]) -> Result<usize, Box<dyn std::error::Error>> {
    let mut created = 0;

    for (n, pair) in products.chunks(2).step_by(5).enumerate() {
        let items: Vec<SaleLine> = pair
            .iter()
            .filter(|p| p.current_stock >= 2)
            .map(|p| SaleLine {
                product_id: p.id.clone(),
                quantity: 1 + (n % 2) as i64,
                unit_price_cents: p.selling_price_cents,
            })
            .collect();

        if items.is_empty() {
            continue;
        }

        let sale = db
            .sales()
            .create_sale(NewSale {
                customer_name: Some(format!("Customer {}", n + 1)),
                user_id: Some("seed".to_string()),
                items,
                ..Default::default()
            })
            .await?;
        created += 1;

        let total = sale.total();
        let payment = match n % 3 {
            0 => Some(total),
            1 => Some(Money::from_cents(total.cents() / 2)),
            _ => None,
        };

        if let Some(amount) = payment.filter(|a| a.is_positive()) {
            db.sales()
                .add_payment(&sale.id, NewPayment::of(amount.cents()).method(PaymentMethod::Cash))
                .await?;
        }
    }

    Ok(created)
}
