//! # Seed Data Generator
//!
//! Populates the database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./mercantil.db with 200 products (default)
//! cargo run -p mercantil-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p mercantil-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p mercantil-db --bin seed -- --db ./data/mercantil.db
//! ```
//!
//! ## Generated Data
//! - One company with two branches and one department per branch
//! - Natural and legal clients
//! - Products across hardware categories, each with one or two purchase
//!   lines so that derived stock and sale price are populated
//! - A few assets for the depreciation report

use std::env;

use mercantil_db::{Database, DbConfig};

/// Product families for realistic test data
const CATEGORIES: &[(&str, &[&str])] = &[
    ("TOR", &["Tornillo", "Perno", "Tuerca", "Arandela", "Clavo", "Remache"]),
    ("HER", &["Martillo", "Serrucho", "Alicate", "Destornillador", "Llave inglesa", "Nivel"]),
    ("PIN", &["Pintura látex", "Esmalte", "Barniz", "Brocha", "Rodillo", "Thinner"]),
    ("ELE", &["Cable", "Interruptor", "Tomacorriente", "Foco LED", "Cinta aislante", "Breaker"]),
    ("PLO", &["Tubo PVC", "Codo PVC", "Llave de paso", "Pegamento PVC", "Sifón", "Grifo"]),
];

const SIZES: &[&str] = &["pequeño", "mediano", "grande", "industrial"];

const NATURAL_CLIENTS: &[(&str, &str)] = &[
    ("Ana Lucía", "Rivas"),
    ("Carlos", "Pérez"),
    ("Diana", "Flores"),
    ("Ernesto", "Molina"),
    ("Fátima", "Castillo"),
];

const LEGAL_CLIENTS: &[&str] = &[
    "Constructora Ágil",
    "Beta Servicios",
    "Inversiones del Valle",
    "Talleres Unidos",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count = 200usize;
    let mut db_path = "./mercantil.db".to_string();

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
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: seed [--count N] [--db PATH]");
                println!();
                println!("Options:");
                println!("  -c, --count N    Number of products to generate (default: 200)");
                println!("  -d, --db PATH    Database path (default: ./mercantil.db)");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Mercantil Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let pool = db.pool();

    println!("Seeding organisation...");
    for sql in [
        "INSERT OR IGNORE INTO companies (id, tax_id, name) VALUES ('CO0001', '0614-150190-101-1', 'Ferretería Central')",
        "INSERT OR IGNORE INTO branches (id, company_id, name) VALUES ('SU0001', 'CO0001', 'Centro'), ('SU0002', 'CO0001', 'Norte')",
        "INSERT OR IGNORE INTO departments (id, branch_id, name) VALUES ('DP0001', 'SU0001', 'Ventas'), ('DP0002', 'SU0002', 'Bodega')",
        "INSERT OR IGNORE INTO employees (id, department_id, first_names, last_names) VALUES \
            ('EM0001', 'DP0001', 'Marta', 'Gómez'), ('EM0002', 'DP0002', 'Luis', 'Ortiz')",
    ] {
        sqlx::query(sql).execute(pool).await?;
    }

    println!("Seeding clients...");
    for (index, (first, last)) in NATURAL_CLIENTS.iter().enumerate() {
        sqlx::query("INSERT OR IGNORE INTO natural_clients (id, first_names, last_names) VALUES (?1, ?2, ?3)")
            .bind(format!("CN{:04}", index + 1))
            .bind(*first)
            .bind(*last)
            .execute(pool)
            .await?;
    }
    for (index, name) in LEGAL_CLIENTS.iter().enumerate() {
        sqlx::query("INSERT OR IGNORE INTO legal_clients (id, company_name) VALUES (?1, ?2)")
            .bind(format!("CJ{:04}", index + 1))
            .bind(*name)
            .execute(pool)
            .await?;
    }

    println!("Seeding products...");
    let start = std::time::Instant::now();
    let mut tx = pool.begin().await?;
    let mut generated = 0usize;
    let mut purchase_seq = 0usize;

    'outer: for (category, names) in CATEGORIES {
        for name in names.iter() {
            for size in SIZES {
                if generated >= count {
                    break 'outer;
                }
                generated += 1;

                let id = format!("PR{:04}", generated);
                let product_name = format!("{} {} ({})", name, size, category);
                let purchases = generate_purchases(generated);
                let stock: i64 = purchases.iter().map(|(qty, _)| qty).sum();

                sqlx::query("INSERT OR IGNORE INTO products (id, name, stock) VALUES (?1, ?2, ?3)")
                    .bind(&id)
                    .bind(&product_name)
                    .bind(stock)
                    .execute(&mut *tx)
                    .await?;

                for (quantity, unit_cost_cents) in purchases {
                    purchase_seq += 1;
                    sqlx::query(
                        "INSERT OR IGNORE INTO purchase_lines (id, product_id, quantity, unit_cost_cents) \
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .bind(format!("DC{:04}", purchase_seq))
                    .bind(&id)
                    .bind(quantity)
                    .bind(unit_cost_cents)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }
    }
    tx.commit().await?;

    println!("Seeding assets...");
    sqlx::query(
        "INSERT OR IGNORE INTO assets (id, name, price_cents, acquired_on, useful_life_years, department_id) VALUES \
            ('AC0001', 'Laptop', 120000, '2024-01-15', 5, 'DP0001'), \
            ('AC0002', 'Escritorio', 30000, '2024-06-01', 10, 'DP0002'), \
            ('AC0003', 'Montacargas', 1850000, '2022-09-10', 10, 'DP0002')",
    )
    .execute(pool)
    .await?;

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:.2}s", generated, elapsed.as_secs_f64());

    println!();
    println!("Testing search...");
    let results = db.products().search("Tornillo", 10).await?;
    println!("  Search 'Tornillo': {} results", results.len());
    let results = db.clients().search("", 10).await?;
    println!("  Clients: {} results", results.len());
    println!("  Next sale id: {}", db.sales().next_id().await?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// One or two purchase lines `(quantity, unit cost in cents)` per product.
fn generate_purchases(seed: usize) -> Vec<(i64, i64)> {
    let base_cost = 75 + ((seed * 37) % 2400) as i64; // 0.75 - 24.74
    let first = (5 + (seed % 40) as i64, base_cost);

    if seed % 3 == 0 {
        // Second batch bought at a slightly higher cost
        vec![first, (10, base_cost + base_cost / 10)]
    } else {
        vec![first]
    }
}
