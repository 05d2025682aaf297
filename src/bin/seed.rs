use anyhow::Context;
use serde_json::json;
use sst_storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    models::{Category, Specifications, Unit},
    services::{auth_service::hash_password, product_service::DEFAULT_BRAND},
};
use uuid::Uuid;

const ADMIN_USERNAME: &str = "sst_admin";

struct SampleProduct {
    name: &'static str,
    price: i64,
    original_price: i64,
    category: Category,
    description: &'static str,
    material: &'static str,
    width: &'static str,
    color: &'static str,
    features: &'static [&'static str],
    images: &'static [&'static str],
    stock: i32,
    rating: f64,
}

const SAMPLE_PRODUCTS: &[SampleProduct] = &[
    SampleProduct {
        name: "Cotton Binding Tape 25mm - White",
        price: 180,
        original_price: 220,
        category: Category::BindingTapes,
        description: "Premium quality cotton binding tape suitable for garment finishing, bag making, and craft projects. Soft texture with excellent durability.",
        material: "100% Cotton",
        width: "25mm",
        color: "White",
        features: &["Soft and durable", "Eco-friendly cotton material", "Ideal for garment finishing"],
        images: &[
            "https://images.unsplash.com/photo-1586281010691-3d33ac5e7f4c?w=400&h=400&fit=crop",
            "https://images.unsplash.com/photo-1559532173-d402e50b5fac?w=400&h=400&fit=crop",
        ],
        stock: 45,
        rating: 4.7,
    },
    SampleProduct {
        name: "Cotton Wicks Round 3mm - Natural",
        price: 320,
        original_price: 380,
        category: Category::CottonWicks,
        description: "Pure cotton wicks for oil lamps, diyas, and spiritual purposes. Made from finest cotton fibers for consistent burning.",
        material: "100% Pure Cotton",
        width: "3mm",
        color: "Natural White",
        features: &["Consistent burning", "Low smoke", "Traditional quality"],
        images: &[
            "https://images.unsplash.com/photo-1578662996442-48f60103fc96?w=400&h=400&fit=crop",
            "https://images.unsplash.com/photo-1551845041-63ad1e87d46d?w=400&h=400&fit=crop",
        ],
        stock: 28,
        rating: 4.9,
    },
    SampleProduct {
        name: "Elastic Tape 12mm - Black",
        price: 240,
        original_price: 280,
        category: Category::ElasticTapes,
        description: "High-quality elastic tape perfect for waistbands, cuffs, and stretchable garment applications. Excellent stretch recovery.",
        material: "Cotton Polyester Blend with Rubber Core",
        width: "12mm",
        color: "Black",
        features: &["Excellent stretch recovery", "Wash resistant", "Suited to waistbands and cuffs"],
        images: &[
            "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=400&h=400&fit=crop",
            "https://images.unsplash.com/photo-1571019613454-1cb2f99b2d8b?w=400&h=400&fit=crop",
        ],
        stock: 52,
        rating: 4.6,
    },
    SampleProduct {
        name: "Twill Tape 20mm - Khaki",
        price: 195,
        original_price: 235,
        category: Category::TwillTapes,
        description: "Strong twill weave tape ideal for reinforcement, straps, and heavy-duty applications. Military-grade quality.",
        material: "100% Cotton Twill",
        width: "20mm",
        color: "Khaki",
        features: &["High tensile strength", "Twill weave", "Heavy-duty use"],
        images: &[
            "https://images.unsplash.com/photo-1582735689369-4fe89db0853c?w=400&h=400&fit=crop",
            "https://images.unsplash.com/photo-1566479179817-78fc5a4b2b4f?w=400&h=400&fit=crop",
        ],
        stock: 38,
        rating: 4.8,
    },
    SampleProduct {
        name: "Herringbone Tape 15mm - Navy Blue",
        price: 210,
        original_price: 250,
        category: Category::HerringboneTapes,
        description: "Premium herringbone pattern tape for decorative and functional applications. Classic design with modern durability.",
        material: "Cotton Polyester Blend",
        width: "15mm",
        color: "Navy Blue",
        features: &["Classic herringbone pattern", "Decorative and functional", "Colorfast"],
        images: &[
            "https://images.unsplash.com/photo-1544966503-7cc5ac882d5e?w=400&h=400&fit=crop",
            "https://images.unsplash.com/photo-1558618047-61c5f888334d?w=400&h=400&fit=crop",
        ],
        stock: 35,
        rating: 4.7,
    },
    SampleProduct {
        name: "Fabric Tape 30mm - Red",
        price: 165,
        original_price: 200,
        category: Category::FabricTapes,
        description: "Versatile fabric tape suitable for binding, trimming, and decorative purposes. Vibrant red color for eye-catching applications.",
        material: "100% Cotton Fabric",
        width: "30mm",
        color: "Red",
        features: &["Vibrant colorfast dyes", "Iron-friendly material"],
        images: &[
            "https://images.unsplash.com/photo-1517707209946-5ff15023c749?w=400&h=400&fit=crop",
            "https://images.unsplash.com/photo-1578662996442-48f60103fc96?w=400&h=400&fit=crop",
        ],
        stock: 42,
        rating: 4.5,
    },
    SampleProduct {
        name: "Cotton Wicks Flat 5mm - Natural",
        price: 280,
        original_price: 330,
        category: Category::CottonWicks,
        description: "Premium flat cotton wicks for oil lamps and traditional lighting. Provides steady, smokeless flame.",
        material: "100% Pure Cotton",
        width: "5mm",
        color: "Natural White",
        features: &["Steady smokeless flame", "Eco-friendly material"],
        images: &[
            "https://images.unsplash.com/photo-1578662996442-48f60103fc96?w=400&h=400&fit=crop",
            "https://images.unsplash.com/photo-1551845041-63ad1e87d46d?w=400&h=400&fit=crop",
        ],
        stock: 31,
        rating: 4.8,
    },
    SampleProduct {
        name: "Elastic Tape 20mm - White",
        price: 285,
        original_price: 340,
        category: Category::ElasticTapes,
        description: "Wide elastic tape perfect for waistbands and wide applications. Superior stretch and recovery properties.",
        material: "Cotton Spandex Blend",
        width: "20mm",
        color: "White",
        features: &["Superior stretch and recovery", "Wide format"],
        images: &[
            "https://images.unsplash.com/photo-1558618666-fcd25c85cd64?w=400&h=400&fit=crop",
            "https://images.unsplash.com/photo-1571019613454-1cb2f99b2d8b?w=400&h=400&fit=crop",
        ],
        stock: 29,
        rating: 4.9,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let admin_password =
        std::env::var("SEED_ADMIN_PASSWORD").context("SEED_ADMIN_PASSWORD is not set")?;

    let orm = create_orm_conn(&config.database_url, config.db_connect_timeout).await?;
    run_migrations(&orm).await?;
    let pool = orm.get_postgres_connection_pool();

    ensure_admin(pool, &admin_password).await?;
    seed_products(pool).await?;

    println!("Seed completed");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, password: &str) -> anyhow::Result<()> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO admins (id, username, password_hash, role, shop_name)
        VALUES ($1, $2, $3, 'admin', $4)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ADMIN_USERNAME)
    .bind(password_hash)
    .bind(DEFAULT_BRAND)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        println!("Created admin {ADMIN_USERNAME}");
    } else {
        println!("Admin {ADMIN_USERNAME} already exists");
    }
    Ok(())
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        println!("Catalog already has {existing} products");
        return Ok(());
    }

    for sample in SAMPLE_PRODUCTS {
        let specifications = Specifications {
            material: Some(sample.material.to_string()),
            width: Some(sample.width.to_string()),
            color: Some(sample.color.to_string()),
            origin: Some("Tamil Nadu, India".to_string()),
            ..Specifications::default()
        };

        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, brand, price, original_price, images, category, description,
                 specifications, features, stock, unit, minimum_order, rating)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1, $13)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sample.name)
        .bind(DEFAULT_BRAND)
        .bind(sample.price)
        .bind(sample.original_price)
        .bind(json!(sample.images))
        .bind(sample.category.as_str())
        .bind(sample.description)
        .bind(serde_json::to_value(&specifications)?)
        .bind(json!(sample.features))
        .bind(sample.stock)
        .bind(Unit::Kg.as_str())
        .bind(sample.rating)
        .execute(pool)
        .await?;
    }

    println!("Seeded {} products", SAMPLE_PRODUCTS.len());
    Ok(())
}
