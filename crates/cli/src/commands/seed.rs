//! Database seeding command.
//!
//! Inserts a handful of sample products for local development. Safe to run
//! repeatedly: products are matched by name and skipped if already present.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli seed
//! ```

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

struct SampleProduct {
    name: &'static str,
    brand: &'static str,
    category: &'static str,
    description: &'static str,
    price: Decimal,
    count_in_stock: i32,
    image: &'static str,
}

fn sample_products() -> Vec<SampleProduct> {
    vec![
        SampleProduct {
            name: "Wireless Bluetooth Headphones",
            brand: "Aural",
            category: "Electronics",
            description: "Over-ear headphones with active noise cancellation and 30-hour battery life.",
            price: Decimal::new(8999, 2),
            count_in_stock: 10,
            image: "/images/headphones.jpg",
        },
        SampleProduct {
            name: "Mechanical Keyboard",
            brand: "Keystone",
            category: "Electronics",
            description: "Tenkeyless mechanical keyboard with hot-swappable switches.",
            price: Decimal::new(12900, 2),
            count_in_stock: 7,
            image: "/images/keyboard.jpg",
        },
        SampleProduct {
            name: "Stainless Steel Water Bottle",
            brand: "Everflow",
            category: "Outdoors",
            description: "Vacuum-insulated 750ml bottle, keeps drinks cold for 24 hours.",
            price: Decimal::new(2450, 2),
            count_in_stock: 25,
            image: "/images/bottle.jpg",
        },
        SampleProduct {
            name: "Trail Running Shoes",
            brand: "Ridgeline",
            category: "Footwear",
            description: "Lightweight trail shoes with aggressive grip and rock plate.",
            price: Decimal::new(11000, 2),
            count_in_stock: 4,
            image: "/images/shoes.jpg",
        },
        SampleProduct {
            name: "Pour-Over Coffee Kit",
            brand: "Morningstate",
            category: "Kitchen",
            description: "Ceramic dripper, glass carafe, and 100 paper filters.",
            price: Decimal::new(3999, 2),
            count_in_stock: 12,
            image: "/images/coffee.jpg",
        },
        SampleProduct {
            name: "Canvas Weekender Bag",
            brand: "Harbor & Co",
            category: "Travel",
            description: "Waxed canvas duffel with leather trim and a shoe compartment.",
            price: Decimal::new(7500, 2),
            count_in_stock: 0,
            image: "/images/bag.jpg",
        },
    ]
}

/// Seed the database with sample products.
///
/// # Errors
///
/// Returns `SeedError` if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BAZAAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| SeedError::MissingEnvVar("BAZAAR_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    let mut inserted = 0_u32;
    for product in sample_products() {
        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM products WHERE name = $1")
            .bind(product.name)
            .fetch_optional(&pool)
            .await?;

        if exists.is_some() {
            tracing::info!("Skipping existing product: {}", product.name);
            continue;
        }

        sqlx::query(
            "INSERT INTO products (name, brand, category, description, price, count_in_stock, images)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(product.name)
        .bind(product.brand)
        .bind(product.category)
        .bind(product.description)
        .bind(product.price)
        .bind(product.count_in_stock)
        .bind(vec![product.image.to_owned()])
        .execute(&pool)
        .await?;

        inserted += 1;
    }

    tracing::info!("Seeding complete: {} products inserted", inserted);
    Ok(())
}
