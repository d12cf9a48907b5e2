//! # Seed Data Generator
//!
//! Populates a database with a demo izakaya and walks one full night of
//! business: orders placed, a table checked out, daily sales recomputed.
//!
//! ## Usage
//! ```bash
//! # Seed ./kaikei_dev.db (default)
//! cargo run -p kaikei-db --bin seed
//!
//! # Specify database path
//! cargo run -p kaikei-db --bin seed -- --db ./data/kaikei.db
//! ```
//!
//! ## Generated Data
//! - One store (炉ばた 甚八, Asia/Tokyo) open 17:00-26:00, Sundays 17:00-23:00
//! - Six dining tables across counter and tatami seating
//! - A small izakaya menu (beer, small plates, sashimi)
//! - Two seated tables with open orders; one gets checked out
//! - A recomputed daily sales row for the current business date

use std::env;

use kaikei_core::Money;
use kaikei_db::{AggregatorConfig, Database, DbConfig, LineModifier, NewOrderLine};
use tracing_subscriber::EnvFilter;

/// Menu for the demo store: (name, price in yen).
const MENU: &[(&str, i64)] = &[
    ("生ビール", 500),
    ("枝豆", 300),
    ("唐揚げ", 450),
    ("刺し盛り", 1500),
    ("焼きおにぎり", 350),
    ("熱燗", 800),
];

/// Tables for the demo store: (number, capacity, area).
const TABLES: &[(i64, i64, Option<&str>)] = &[
    (1, 2, Some("counter")),
    (2, 2, Some("counter")),
    (3, 4, None),
    (4, 4, None),
    (5, 6, Some("tatami")),
    (6, 8, Some("tatami")),
];

/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=kaikei=trace` - Show trace for kaikei crates only
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kaikei=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./kaikei_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kaikei Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./kaikei_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    println!("🏮 Kaikei Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check for existing data
    let existing = db.stores().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} store(s)", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Store and schedule
    println!();
    println!("Seeding store...");
    let store = db.stores().create("炉ばた 甚八", "Asia/Tokyo").await?;
    db.business_hours()
        .upsert(&store.id, None, "17:00", "26:00")
        .await?;
    db.business_hours()
        .upsert(&store.id, Some(0), "17:00", "23:00")
        .await?;
    println!("✓ Store {} ({})", store.name, store.timezone);
    println!("✓ Hours 17:00-26:00, Sundays 17:00-23:00");

    // Tables
    for (number, capacity, area) in TABLES {
        db.tables().create(&store.id, *number, *capacity, *area).await?;
    }
    println!("✓ {} tables", TABLES.len());

    // Menu
    let mut menu_items = Vec::with_capacity(MENU.len());
    for (name, yen) in MENU {
        let item = db
            .menu()
            .create(&store.id, name, Money::from_yen(*yen))
            .await?;
        menu_items.push(item);
    }
    println!("✓ {} menu items", menu_items.len());

    // Orders: table 1 drinks round (delivered), table 3 a food round (open)
    println!();
    println!("Placing orders...");
    let counter = db.tables().get_by_number(&store.id, 1).await?.unwrap();
    let floor = db.tables().get_by_number(&store.id, 3).await?.unwrap();

    let drinks = db
        .orders()
        .place_order(
            &store.id,
            &counter.id,
            &[
                NewOrderLine::plain(&menu_items[0].id, 2), // 生ビール x2
                NewOrderLine::plain(&menu_items[1].id, 1), // 枝豆
            ],
        )
        .await?;
    db.orders().mark_delivered(&drinks.id).await?;
    println!("✓ Table 1: {} (delivered)", drinks.total_amount);

    let food = db
        .orders()
        .place_order(
            &store.id,
            &floor.id,
            &[
                NewOrderLine {
                    menu_item_id: menu_items[2].id.clone(), // 唐揚げ
                    quantity: 1,
                    options: vec![],
                    toppings: vec![LineModifier::new("チーズ", Money::from_yen(200))],
                },
                NewOrderLine::plain(&menu_items[3].id, 1), // 刺し盛り
            ],
        )
        .await?;
    println!("✓ Table 3: {} (open)", food.total_amount);

    // Checkout table 3
    println!();
    println!("Checking out table 3...");
    db.tables().request_checkout(&store.id, 3).await?;
    let result = db.archiver().checkout(&store.id, 3).await?;
    match &result.sales_cycle {
        Some(cycle) => println!(
            "✓ Archived {} order(s), visit #{} of the night, {}",
            result.archived_orders, cycle.cycle_number, result.total_amount
        ),
        None => println!("⚠ Table had no open orders"),
    }

    // Daily sales for the current business date
    println!();
    println!("Recomputing daily sales...");
    let aggregator = db.aggregator(AggregatorConfig::default());
    let sales = aggregator.recompute_current(&store.id).await?;

    println!("✓ Business date {}", sales.business_date);
    println!("  Orders: {}", sales.total_orders);
    println!("  Items:  {}", sales.total_items);
    println!("  Total:  {}", sales.total_amount);
    println!("  Tax:    {} (included)", sales.tax_amount);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
