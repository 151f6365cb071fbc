//! # Seed Data Generator
//!
//! Populates the database with demo clients and products for development.
//!
//! ## Usage
//! ```bash
//! # Default database path (./botica_dev.db)
//! cargo run -p botica-db --bin seed
//!
//! # Custom path and product count
//! cargo run -p botica-db --bin seed -- --db ./data/botica.db --count 200
//! ```
//!
//! ## Generated Data
//! - A handful of pharmacy clients with fiscal data
//! - Products across the common pharmacy categories, covering all three VAT
//!   regimes (4%, 10%, 21%) so surcharge math shows up in demo orders
//! - Stock levels spread from zero (stock-low) to full shelves

use chrono::Utc;
use rust_decimal::Decimal;
use std::env;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use botica_core::{Client, Money, Product, TaxRate};
use botica_db::repository::{client, product};
use botica_db::{Database, DbConfig};

/// Product families with their VAT regime.
///
/// 4%: essential medicines - 10%: parapharmacy/diet - 21%: general goods
const FAMILIES: &[(&str, u32, &[&str])] = &[
    (
        "MED",
        4,
        &[
            "Paracetamol 1g 40 comp",
            "Ibuprofeno 600mg 40 comp",
            "Amoxicilina 500mg 24 caps",
            "Omeprazol 20mg 28 caps",
            "Simvastatina 20mg 28 comp",
            "Enalapril 10mg 56 comp",
            "Metformina 850mg 50 comp",
            "Lorazepam 1mg 50 comp",
        ],
    ),
    (
        "PARA",
        10,
        &[
            "Suero fisiologico 5ml 30 uds",
            "Leche infantil continuacion 800g",
            "Complemento vitamina D 30 caps",
            "Colirio hidratante 10ml",
            "Probiotico infantil gotas 8ml",
            "Crema pañal 100ml",
        ],
    ),
    (
        "GEN",
        21,
        &[
            "Cepillo dental suave",
            "Pasta dentifrica 75ml",
            "Protector solar SPF50 200ml",
            "Champu anticaspa 300ml",
            "Gel hidroalcoholico 500ml",
            "Mascarilla FFP2 20 uds",
        ],
    ),
];

const CLIENTS: &[(&str, &str, &str)] = &[
    ("FARM-001", "Farmacia Central", "B81234561"),
    ("FARM-002", "Farmacia San Anton", "B81234572"),
    ("FARM-003", "Farmacia del Puerto", "B81234583"),
    ("FARM-004", "Farmacia Plaza Nueva", "B81234594"),
    ("FARM-005", "Farmacia La Rosaleda", "B81234605"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 100;
    let mut db_path = String::from("./botica_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(100);
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
                println!("Botica ERP Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 100)");
                println!("  -d, --db <PATH>    Database file path (default: ./botica_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Botica ERP Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut conn = db.acquire().await?;

    // Skip seeding when data already exists
    let existing = client::list_active(&mut conn, 1).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has clients, skipping seed.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding clients...");
    for (code, name, tax_id) in CLIENTS {
        let now = Utc::now();
        let row = Client {
            id: Uuid::new_v4().to_string(),
            code: (*code).to_string(),
            name: (*name).to_string(),
            fiscal_name: Some(format!("{name} S.L.")),
            tax_id: Some((*tax_id).to_string()),
            contact: None,
            email: Some(format!("{}@example.com", code.to_lowercase())),
            phone: None,
            address: None,
            bank_account: None,
            notes: None,
            last_visit_at: None,
            is_active: true,
            created_at: now,
        };
        client::insert(&mut conn, &row).await?;
    }
    println!("✓ {} clients", CLIENTS.len());

    println!("Seeding products...");
    let mut generated = 0;
    'outer: for (family, vat, names) in FAMILIES {
        for (idx, name) in names.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let row = generate_product(family, *vat, name, idx);
            if let Err(e) = product::insert(&mut conn, &row).await {
                eprintln!("Failed to insert {}: {}", row.code, e);
                continue;
            }
            generated += 1;
        }
    }
    println!("✓ {} products", generated);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a single product with plausible catalog data.
fn generate_product(family: &str, vat: u32, name: &str, idx: usize) -> Product {
    let now = Utc::now();

    let code = format!("{}-{:03}", family, idx + 1);

    // Price in cents spread deterministically between 0.99 and 25.00
    let cents = 99 + ((idx * 173) % 2401) as i64;
    let price = Money::new(Decimal::new(cents, 2));

    // Stock 0..=60; every sixth product starts stock-low
    let stock = ((idx * 7) % 61) as i64;
    let min_stock = if idx % 6 == 0 { stock } else { 3 };

    Product {
        id: Uuid::new_v4().to_string(),
        code,
        name: name.to_string(),
        description: None,
        category: Some(family.to_string()),
        price,
        tax_rate: TaxRate::new(Decimal::from(vat)),
        surcharge_rate: None,
        stock,
        min_stock,
        is_deposit: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
