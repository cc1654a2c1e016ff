//! # Seed Data Generator
//!
//! Populates a database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Default database (./venda.db)
//! cargo run -p venda-db --bin seed
//!
//! # Specify database path
//! cargo run -p venda-db --bin seed -- --db ./data/venda.db
//! VENDA_DB=./data/venda.db cargo run -p venda-db --bin seed
//! ```
//!
//! ## What It Creates
//! - A small product catalog with stock
//! - A handful of customers
//! - Two sales through the workflow (one of them cancelled)
//! - Prints today's sales-analysis summary

use std::env;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chrono::Utc;
use venda_core::types::{Customer, PaymentMethod, Product};
use venda_core::validation::{validate_customer, validate_product};
use venda_db::{Database, DbConfig, NewSale, NewSaleItem};

/// Demo catalog: (code, name, price_cents, quantity_stock)
const CATALOG: &[(&str, &str, i64, i64)] = &[
    ("TEC-MEC-01", "Teclado Mecanico ABNT2", 34990, 25),
    ("MOU-SF-01", "Mouse Sem Fio", 8990, 40),
    ("CAB-HDMI-2M", "Cabo HDMI 2m", 2990, 120),
    ("MON-24-01", "Monitor 24 Polegadas", 89900, 12),
    ("WEB-FHD-01", "Webcam Full HD", 19990, 18),
    ("HUB-USB-4P", "Hub USB 4 Portas", 5990, 60),
    ("SSD-480-01", "SSD 480GB", 27990, 30),
    ("FON-BT-01", "Fone Bluetooth", 15990, 22),
];

/// Demo customers: (name, email, cpf, phone, address)
const CUSTOMERS: &[(&str, &str, &str, &str, &str)] = &[
    (
        "Joana Almeida",
        "joana.almeida@example.com",
        "529.982.247-25",
        "+55 11 91234-5678",
        "Rua das Laranjeiras 120, Sao Paulo - SP",
    ),
    (
        "Carlos Pereira",
        "carlos.pereira@example.com",
        "390.533.447-05",
        "+55 21 99876-5432",
        "Av. Atlantica 1702, Rio de Janeiro - RJ",
    ),
    (
        "Marina Souza",
        "marina.souza@example.com",
        "168.995.350-09",
        "+55 31 98765-4321",
        "Rua da Bahia 45, Belo Horizonte - MG",
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = database_path();
    info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;

    seed_products(&db).await?;
    seed_customers(&db).await?;
    seed_sales(&db).await?;

    let today = Utc::now().date_naive();
    let analysis = db.sale_workflow().sales_analysis(today, today).await?;
    println!("Today's analysis: {}", serde_json::to_string_pretty(&analysis)?);

    let product_count = db.products().count().await?;
    println!("Seed complete: {product_count} products in {db_path}");
    Ok(())
}

/// Resolves the database path from `--db <path>`, `VENDA_DB`, or the
/// default.
fn database_path() -> String {
    let args: Vec<String> = env::args().collect();
    if let Some(index) = args.iter().position(|arg| arg == "--db") {
        if let Some(path) = args.get(index + 1) {
            return path.clone();
        }
    }
    env::var("VENDA_DB").unwrap_or_else(|_| "./venda.db".to_string())
}

async fn seed_products(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let products = db.products();
    for (code, name, price_cents, quantity_stock) in CATALOG {
        if products.get_by_code(code).await?.is_some() {
            continue;
        }
        let product = Product {
            id: String::new(),
            name: (*name).to_string(),
            description: format!("{name} (demo item)"),
            price_cents: *price_cents,
            quantity_stock: *quantity_stock,
            code: (*code).to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            item_sales: Vec::new(),
        };
        validate_product(&product)?;
        let created = products.create(product).await?;
        info!(code = %created.code, id = %created.id, "Product seeded");
    }
    Ok(())
}

async fn seed_customers(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let customers = db.customers();
    for (name, email, cpf, phone, address) in CUSTOMERS {
        if customers.get_by_email(email).await?.is_some() {
            continue;
        }
        let customer = Customer {
            id: String::new(),
            name: (*name).to_string(),
            email: (*email).to_string(),
            cpf: (*cpf).to_string(),
            phone: (*phone).to_string(),
            address: (*address).to_string(),
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        validate_customer(&customer)?;
        let created = customers.create(customer).await?;
        info!(email = %created.email, id = %created.id, "Customer seeded");
    }
    Ok(())
}

async fn seed_sales(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let workflow = db.sale_workflow();

    let Some(customer) = db.customers().get_by_email(CUSTOMERS[0].1).await? else {
        warn!("Demo customer missing, skipping sales");
        return Ok(());
    };
    let Some(keyboard) = db.products().get_by_code("TEC-MEC-01").await? else {
        warn!("Demo product missing, skipping sales");
        return Ok(());
    };
    let Some(cable) = db.products().get_by_code("CAB-HDMI-2M").await? else {
        warn!("Demo product missing, skipping sales");
        return Ok(());
    };

    let sale = workflow
        .create_sale(NewSale {
            customer_id: customer.id.clone(),
            items: vec![
                NewSaleItem {
                    product_id: keyboard.id.clone(),
                    quantity: 1,
                },
                NewSaleItem {
                    product_id: cable.id.clone(),
                    quantity: 2,
                },
            ],
            payment_method: PaymentMethod::Pix,
            observations: "Pedido de demonstracao".to_string(),
        })
        .await?;
    info!(sale_id = %sale.id, total_cents = sale.total_cents(), "Demo sale created");

    // A second sale that gets cancelled, to exercise stock restoration.
    let cancelled = workflow
        .create_sale(NewSale {
            customer_id: customer.id,
            items: vec![NewSaleItem {
                product_id: cable.id,
                quantity: 1,
            }],
            payment_method: PaymentMethod::Boleto,
            observations: "Sera cancelado".to_string(),
        })
        .await?;
    workflow.cancel_sale(&cancelled.id).await?;
    info!(sale_id = %cancelled.id, "Demo sale cancelled");

    Ok(())
}
